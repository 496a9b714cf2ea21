use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::BVH_LEAF_SIZE;

/// Axis-aligned bounding box used for mesh bounds, BVH nodes and broad-phase proxies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::empty();
        for &p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn radius(&self) -> f32 {
        self.extent().length()
    }

    pub fn inflated(&self, margin: f32) -> Aabb {
        Aabb::new(self.min - Vec3::splat(margin), self.max + Vec3::splat(margin))
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Slab test against the segment `origin + t * direction`, `t` in `[0, max_t]`.
    /// Returns the entry parameter (0 when the origin is inside).
    pub fn ray_intersect(&self, origin: Vec3, direction: Vec3, max_t: f32) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = max_t;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < 1e-8 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (self.min[axis] - o) * inv;
            let mut t2 = (self.max[axis] - o) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

/// Node of a triangle BVH. Leaves have no children and own `count` triangles
/// starting at `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshBvhNode {
    pub bounds: Aabb,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub start: usize,
    pub count: usize,
}

impl MeshBvhNode {
    pub fn is_leaf(&self) -> bool {
        self.left.is_none()
    }
}

/// Median-split bounding volume hierarchy over mesh triangles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshBvh {
    pub nodes: Vec<MeshBvhNode>,
}

impl MeshBvh {
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[MeshBvhNode], index: usize) -> usize {
            let node = &nodes[index];
            match (node.left, node.right) {
                (Some(l), Some(r)) => 1 + walk(nodes, l).max(walk(nodes, r)),
                _ => 1,
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

/// Closest hit of a ray against a triangle mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub triangle: usize,
    pub normal: Vec3,
}

/// Static triangle mesh with a BVH, stored in the coordinate space it was baked in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
    bounds: Aabb,
    bvh: MeshBvh,
}

impl TriangleMesh {
    pub fn builder(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> MeshBuilder {
        MeshBuilder::new(vertices, indices)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn bvh(&self) -> &MeshBvh {
        &self.bvh
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.indices[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    pub fn bounding_radius(&self) -> f32 {
        self.bounds.radius()
    }

    /// Calls `visit` for every triangle whose bounds overlap `query`.
    pub fn query_aabb(&self, query: &Aabb, mut visit: impl FnMut(usize, [Vec3; 3])) {
        if self.bvh.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.bvh.nodes[index];
            if !node.bounds.intersects(query) {
                continue;
            }
            match (node.left, node.right) {
                (Some(left), Some(right)) => {
                    stack.push(left);
                    stack.push(right);
                }
                _ => {
                    for tri in node.start..node.start + node.count {
                        let corners = self.triangle(tri);
                        if Aabb::from_points(&corners).intersects(query) {
                            visit(tri, corners);
                        }
                    }
                }
            }
        }
    }

    /// Closest triangle hit along `origin + t * direction`, `t` in `[0, max_t]`.
    /// The returned normal faces against the ray.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_t: f32) -> Option<TriangleHit> {
        if self.bvh.nodes.is_empty() {
            return None;
        }
        let mut best: Option<TriangleHit> = None;
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.bvh.nodes[index];
            let limit = best.map(|hit| hit.t).unwrap_or(max_t);
            if node.bounds.ray_intersect(origin, direction, limit).is_none() {
                continue;
            }
            match (node.left, node.right) {
                (Some(left), Some(right)) => {
                    stack.push(left);
                    stack.push(right);
                }
                _ => {
                    for tri in node.start..node.start + node.count {
                        let limit = best.map(|hit| hit.t).unwrap_or(max_t);
                        if let Some((t, normal)) =
                            ray_triangle(origin, direction, self.triangle(tri), limit)
                        {
                            best = Some(TriangleHit {
                                t,
                                triangle: tri,
                                normal,
                            });
                        }
                    }
                }
            }
        }
        best
    }
}

/// Möller–Trumbore intersection, two-sided.
pub fn ray_triangle(
    origin: Vec3,
    direction: Vec3,
    [a, b, c]: [Vec3; 3],
    max_t: f32,
) -> Option<(f32, Vec3)> {
    const EPSILON: f32 = 1e-8;
    let edge1 = b - a;
    let edge2 = c - a;
    let p = direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    if t < 0.0 || t > max_t {
        return None;
    }
    let mut normal = edge1.cross(edge2).normalize_or_zero();
    if normal.dot(direction) > 0.0 {
        normal = -normal;
    }
    Some((t, normal))
}

/// Cooks triangle meshes from raw vertex/index buffers.
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
    leaf_size: usize,
}

impl MeshBuilder {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            indices,
            leaf_size: BVH_LEAF_SIZE,
        }
    }

    pub fn leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size.max(1);
        self
    }

    pub fn build(self) -> TriangleMesh {
        let vertex_count = self.vertices.len();
        let indices: Vec<[u32; 3]> = self
            .indices
            .into_iter()
            .filter(|tri| tri.iter().all(|&i| (i as usize) < vertex_count))
            .collect();

        let tri_bounds: Vec<Aabb> = indices
            .iter()
            .map(|tri| {
                Aabb::from_points(&[
                    self.vertices[tri[0] as usize],
                    self.vertices[tri[1] as usize],
                    self.vertices[tri[2] as usize],
                ])
            })
            .collect();
        let centroids: Vec<Vec3> = tri_bounds.iter().map(Aabb::center).collect();

        let mut order: Vec<usize> = (0..indices.len()).collect();
        let mut nodes = Vec::new();
        if !order.is_empty() {
            let mut state = BuildState {
                tri_bounds: &tri_bounds,
                centroids: &centroids,
                leaf_size: self.leaf_size,
                nodes: &mut nodes,
            };
            let count = order.len();
            state.build(&mut order, 0, count);
        }

        let indices = order.iter().map(|&i| indices[i]).collect();
        let bounds = nodes
            .first()
            .map(|root: &MeshBvhNode| root.bounds)
            .unwrap_or_else(|| Aabb::from_points(&self.vertices));

        TriangleMesh {
            vertices: self.vertices,
            indices,
            bounds,
            bvh: MeshBvh { nodes },
        }
    }
}

struct BuildState<'a> {
    tri_bounds: &'a [Aabb],
    centroids: &'a [Vec3],
    leaf_size: usize,
    nodes: &'a mut Vec<MeshBvhNode>,
}

impl BuildState<'_> {
    fn build(&mut self, order: &mut [usize], start: usize, end: usize) -> usize {
        let bounds = order[start..end]
            .iter()
            .fold(Aabb::empty(), |acc, &tri| acc.merge(&self.tri_bounds[tri]));
        let node_index = self.nodes.len();
        self.nodes.push(MeshBvhNode {
            bounds,
            left: None,
            right: None,
            start,
            count: end - start,
        });

        if end - start <= self.leaf_size {
            return node_index;
        }

        let centroid_bounds = order[start..end]
            .iter()
            .fold(Aabb::empty(), |mut acc, &tri| {
                acc.extend(self.centroids[tri]);
                acc
            });
        let spread = centroid_bounds.max - centroid_bounds.min;
        let axis = if spread.x >= spread.y && spread.x >= spread.z {
            0
        } else if spread.y >= spread.z {
            1
        } else {
            2
        };
        if spread[axis] <= f32::EPSILON {
            return node_index;
        }

        let centroids = self.centroids;
        order[start..end].sort_by(|a, b| centroids[*a][axis].total_cmp(&centroids[*b][axis]));
        let mid = start + (end - start) / 2;

        let left = self.build(order, start, mid);
        let right = self.build(order, mid, end);
        let node = &mut self.nodes[node_index];
        node.left = Some(left);
        node.right = Some(right);
        node.count = 0;
        node_index
    }
}
