use glam::Vec3;

use super::contact::Contact;
use crate::core::{mesh::Aabb, shape::CollisionShape, types::Transform};

/// Convex geometry queried through its support function.
pub trait SupportMap {
    fn support(&self, direction: Vec3) -> Vec3;
    fn center(&self) -> Vec3;
}

/// A convex collision shape placed in the world.
pub struct ShapeProxy<'a> {
    pub shape: &'a CollisionShape,
    pub transform: &'a Transform,
}

impl SupportMap for ShapeProxy<'_> {
    fn support(&self, direction: Vec3) -> Vec3 {
        self.shape.support(self.transform, direction)
    }

    fn center(&self) -> Vec3 {
        self.transform
            .transform_point(self.shape.local_aabb().center())
    }
}

/// A single world-space triangle.
pub struct TriangleProxy(pub [Vec3; 3]);

impl SupportMap for TriangleProxy {
    fn support(&self, direction: Vec3) -> Vec3 {
        let [a, b, c] = self.0;
        let (da, db, dc) = (a.dot(direction), b.dot(direction), c.dot(direction));
        if da >= db && da >= dc {
            a
        } else if db >= dc {
            b
        } else {
            c
        }
    }

    fn center(&self) -> Vec3 {
        (self.0[0] + self.0[1] + self.0[2]) / 3.0
    }
}

fn minkowski_support(a: &dyn SupportMap, b: &dyn SupportMap, direction: Vec3) -> Vec3 {
    a.support(direction) - b.support(-direction)
}

fn any_perpendicular(v: Vec3) -> Vec3 {
    let axis = if v.x.abs() < 0.57 { Vec3::X } else { Vec3::Y };
    v.cross(axis)
}

/// Simplex with the newest point first.
struct Simplex {
    points: [Vec3; 4],
    len: usize,
}

impl Simplex {
    fn new(first: Vec3) -> Self {
        Self {
            points: [first, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO],
            len: 1,
        }
    }

    fn push_front(&mut self, point: Vec3) {
        self.points = [point, self.points[0], self.points[1], self.points[2]];
        self.len = (self.len + 1).min(4);
    }

    fn set(&mut self, points: &[Vec3]) {
        self.points[..points.len()].copy_from_slice(points);
        self.len = points.len();
    }
}

/// Gilbert-Johnson-Keerthi intersection test with EPA penetration depth.
pub struct GjkAlgorithm;

impl GjkAlgorithm {
    const MAX_ITERATIONS: usize = 32;
    const EPSILON: f32 = 1e-6;

    /// Penetration contact between two convex shapes; the normal points from A to B.
    pub fn penetration(a: &dyn SupportMap, b: &dyn SupportMap) -> Option<Contact> {
        let mut direction = b.center() - a.center();
        if direction.length_squared() < Self::EPSILON {
            direction = Vec3::X;
        }

        let mut simplex = Simplex::new(minkowski_support(a, b, direction));
        direction = -simplex.points[0];

        for _ in 0..Self::MAX_ITERATIONS {
            if direction.length_squared() < Self::EPSILON * Self::EPSILON {
                // Origin on the simplex boundary: touching, nothing to resolve.
                return None;
            }
            let point = minkowski_support(a, b, direction);
            if point.dot(direction) <= 0.0 {
                return None;
            }
            simplex.push_front(point);
            if Self::next_simplex(&mut simplex, &mut direction) {
                let (depth, normal) =
                    EpaAlgorithm::compute_penetration(&simplex.points, a, b)?;
                let point = a.support(normal) - normal * depth * 0.5;
                return Some(Contact::new(point, normal, depth));
            }
        }

        None
    }

    fn next_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
        match simplex.len {
            2 => {
                let [a, b, ..] = simplex.points;
                Self::line(simplex, a, b, direction);
                false
            }
            3 => {
                let [a, b, c, _] = simplex.points;
                Self::triangle(simplex, a, b, c, direction);
                false
            }
            4 => Self::tetrahedron(simplex, direction),
            _ => false,
        }
    }

    fn line(simplex: &mut Simplex, a: Vec3, b: Vec3, direction: &mut Vec3) {
        let ab = b - a;
        let ao = -a;
        if ab.dot(ao) > 0.0 {
            simplex.set(&[a, b]);
            let dir = ab.cross(ao).cross(ab);
            *direction = if dir.length_squared() < Self::EPSILON {
                any_perpendicular(ab)
            } else {
                dir
            };
        } else {
            simplex.set(&[a]);
            *direction = ao;
        }
    }

    fn triangle(simplex: &mut Simplex, a: Vec3, b: Vec3, c: Vec3, direction: &mut Vec3) {
        let ab = b - a;
        let ac = c - a;
        let ao = -a;
        let abc = ab.cross(ac);

        if abc.length_squared() < Self::EPSILON {
            Self::line(simplex, a, b, direction);
            return;
        }

        if abc.cross(ac).dot(ao) > 0.0 {
            if ac.dot(ao) > 0.0 {
                simplex.set(&[a, c]);
                let dir = ac.cross(ao).cross(ac);
                *direction = if dir.length_squared() < Self::EPSILON {
                    any_perpendicular(ac)
                } else {
                    dir
                };
            } else {
                Self::line(simplex, a, b, direction);
            }
        } else if ab.cross(abc).dot(ao) > 0.0 {
            Self::line(simplex, a, b, direction);
        } else if abc.dot(ao) > 0.0 {
            simplex.set(&[a, b, c]);
            *direction = abc;
        } else {
            simplex.set(&[a, c, b]);
            *direction = -abc;
        }
    }

    fn tetrahedron(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
        let [a, b, c, d] = simplex.points;
        let ab = b - a;
        let ac = c - a;
        let ad = d - a;
        let ao = -a;

        if ab.cross(ac).dot(ao) > 0.0 {
            Self::triangle(simplex, a, b, c, direction);
            return false;
        }
        if ac.cross(ad).dot(ao) > 0.0 {
            Self::triangle(simplex, a, c, d, direction);
            return false;
        }
        if ad.cross(ab).dot(ao) > 0.0 {
            Self::triangle(simplex, a, d, b, direction);
            return false;
        }
        true
    }
}

/// Expanding Polytope Algorithm for penetration depth calculation.
struct EpaAlgorithm;

impl EpaAlgorithm {
    const MAX_ITERATIONS: usize = 64;
    const TOLERANCE: f32 = 1e-4;

    fn compute_penetration(
        simplex: &[Vec3; 4],
        a: &dyn SupportMap,
        b: &dyn SupportMap,
    ) -> Option<(f32, Vec3)> {
        let mut polytope = simplex.to_vec();
        let mut faces = Self::build_initial_faces(&polytope);

        for _ in 0..Self::MAX_ITERATIONS {
            let (min_dist, normal) = Self::find_closest_face(&polytope, &faces)?;
            let support = minkowski_support(a, b, normal);
            let distance = support.dot(normal);

            if distance - min_dist < Self::TOLERANCE {
                return Some((min_dist.max(0.0), normal));
            }

            Self::expand_polytope(&mut polytope, &mut faces, support);
        }

        Self::find_closest_face(&polytope, &faces).map(|(d, n)| (d.max(0.0), n))
    }

    fn build_initial_faces(polytope: &[Vec3]) -> Vec<(usize, usize, usize)> {
        let mut faces = vec![(0, 1, 2), (0, 2, 3), (0, 3, 1), (1, 3, 2)];

        // Origin is inside, so outward normals face away from it.
        for face in &mut faces {
            let ab = polytope[face.1] - polytope[face.0];
            let ac = polytope[face.2] - polytope[face.0];
            let normal = ab.cross(ac);
            if polytope[face.0].dot(normal) < 0.0 {
                std::mem::swap(&mut face.1, &mut face.2);
            }
        }
        faces
    }

    fn find_closest_face(polytope: &[Vec3], faces: &[(usize, usize, usize)]) -> Option<(f32, Vec3)> {
        let mut best: Option<(f32, Vec3)> = None;

        for &(a, b, c) in faces {
            let ab = polytope[b] - polytope[a];
            let ac = polytope[c] - polytope[a];
            let normal = ab.cross(ac).normalize_or_zero();
            if normal == Vec3::ZERO {
                continue;
            }
            let dist = polytope[a].dot(normal);
            if best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, normal));
            }
        }

        best
    }

    fn expand_polytope(
        polytope: &mut Vec<Vec3>,
        faces: &mut Vec<(usize, usize, usize)>,
        support: Vec3,
    ) {
        let new_idx = polytope.len();
        polytope.push(support);

        let mut edges: Vec<(usize, usize)> = Vec::new();
        let mut i = 0;
        while i < faces.len() {
            let (a, b, c) = faces[i];
            let ab = polytope[b] - polytope[a];
            let ac = polytope[c] - polytope[a];
            let normal = ab.cross(ac).normalize_or_zero();

            if normal.dot(support - polytope[a]) > 0.0 {
                for edge in [(a, b), (b, c), (c, a)] {
                    if let Some(pos) = edges.iter().position(|&e| e == (edge.1, edge.0)) {
                        edges.swap_remove(pos);
                    } else {
                        edges.push(edge);
                    }
                }
                faces.swap_remove(i);
            } else {
                i += 1;
            }
        }

        for (u, v) in edges {
            faces.push((u, v, new_idx));
        }
    }
}

/// Closed-form routines for the common primitive pairs.
pub struct PrimitiveAlgorithms;

impl PrimitiveAlgorithms {
    pub fn sphere_sphere(center_a: Vec3, radius_a: f32, center_b: Vec3, radius_b: f32) -> Option<Contact> {
        let delta = center_b - center_a;
        let distance = delta.length();
        let radii = radius_a + radius_b;
        if distance >= radii {
            return None;
        }
        let normal = if distance > 1e-6 { delta / distance } else { Vec3::Y };
        let depth = radii - distance;
        Some(Contact::new(
            center_a + normal * (radius_a - depth * 0.5),
            normal,
            depth,
        ))
    }

    /// Sphere (A) against an oriented box (B).
    pub fn sphere_box(
        center: Vec3,
        radius: f32,
        half_extents: Vec3,
        box_transform: &Transform,
    ) -> Option<Contact> {
        let local = box_transform.inverse_transform_point(center);
        let clamped = local.clamp(-half_extents, half_extents);

        if local != clamped {
            let diff = local - clamped;
            let distance = diff.length();
            if distance >= radius {
                return None;
            }
            let outward = box_transform.transform_vector(diff / distance);
            return Some(Contact::new(
                box_transform.transform_point(clamped),
                -outward,
                radius - distance,
            ));
        }

        // Center inside the box: push out through the nearest face.
        let gaps = half_extents - local.abs();
        let axis = if gaps.x <= gaps.y && gaps.x <= gaps.z {
            0
        } else if gaps.y <= gaps.z {
            1
        } else {
            2
        };
        let mut local_normal = Vec3::ZERO;
        local_normal[axis] = 1f32.copysign(local[axis]);
        let mut face_point = local;
        face_point[axis] = half_extents[axis].copysign(local[axis]);
        let outward = box_transform.transform_vector(local_normal);
        Some(Contact::new(
            box_transform.transform_point(face_point),
            -outward,
            radius + gaps[axis],
        ))
    }

    /// Separating-axis test between two oriented boxes, with corner contacts.
    pub fn box_box(
        half_extents_a: Vec3,
        transform_a: &Transform,
        half_extents_b: Vec3,
        transform_b: &Transform,
    ) -> Vec<Contact> {
        let relative_pos = transform_b.position - transform_a.position;
        let axes_a = box_axes(transform_a);
        let axes_b = box_axes(transform_b);

        let mut test_axes = Vec::with_capacity(15);
        test_axes.extend_from_slice(&axes_a);
        test_axes.extend_from_slice(&axes_b);
        for axis_a in &axes_a {
            for axis_b in &axes_b {
                let axis = axis_a.cross(*axis_b);
                if axis.length_squared() > 1e-6 {
                    test_axes.push(axis.normalize());
                }
            }
        }

        let mut min_overlap = f32::MAX;
        let mut normal = Vec3::ZERO;
        for axis in test_axes {
            let extent_a = project_box(&axes_a, half_extents_a, axis);
            let extent_b = project_box(&axes_b, half_extents_b, axis);
            let projection = relative_pos.dot(axis);
            let overlap = extent_a + extent_b - projection.abs();
            if overlap <= 0.0 {
                return Vec::new();
            }
            if overlap < min_overlap {
                min_overlap = overlap;
                normal = if projection < 0.0 { -axis } else { axis };
            }
        }

        let shape_a = CollisionShape::Box {
            half_extents: half_extents_a,
        };
        let shape_b = CollisionShape::Box {
            half_extents: half_extents_b,
        };
        let face_a = shape_a.support(transform_a, normal).dot(normal);
        let face_b = shape_b.support(transform_b, -normal).dot(normal);

        let mut contacts = Vec::new();
        for corner in box_corners(half_extents_b, transform_b) {
            if point_in_box(corner, half_extents_a, transform_a) {
                let pen = (face_a - corner.dot(normal)).min(min_overlap);
                if pen > 0.0 {
                    contacts.push(Contact::new(corner + normal * pen * 0.5, normal, pen));
                }
            }
        }
        for corner in box_corners(half_extents_a, transform_a) {
            if point_in_box(corner, half_extents_b, transform_b) {
                let pen = (corner.dot(normal) - face_b).min(min_overlap);
                if pen > 0.0 {
                    contacts.push(Contact::new(corner - normal * pen * 0.5, normal, pen));
                }
            }
        }

        if contacts.is_empty() {
            // Edge-edge: a single contact between the two supports.
            let point = (shape_a.support(transform_a, normal)
                + shape_b.support(transform_b, -normal))
                * 0.5;
            contacts.push(Contact::new(point, normal, min_overlap));
        }
        contacts
    }

    /// Sphere (A) against a world-space triangle (B).
    pub fn sphere_triangle(center: Vec3, radius: f32, triangle: [Vec3; 3]) -> Option<Contact> {
        let closest = closest_point_on_triangle(center, triangle);
        let delta = closest - center;
        let distance = delta.length();
        if distance >= radius {
            return None;
        }
        let normal = if distance > 1e-6 {
            delta / distance
        } else {
            let [a, b, c] = triangle;
            let mut face = (b - a).cross(c - a).normalize_or_zero();
            if (center - a).dot(face) > 0.0 {
                face = -face;
            }
            face
        };
        Some(Contact::new(closest, normal, radius - distance))
    }

    /// Separating-axis test between an oriented box (A) and a triangle (B).
    pub fn box_triangle(
        half_extents: Vec3,
        transform: &Transform,
        triangle: [Vec3; 3],
    ) -> Vec<Contact> {
        let axes = box_axes(transform);
        let [a, b, c] = triangle;
        let edges = [b - a, c - b, a - c];
        let face = (b - a).cross(c - a);
        if face.length_squared() < 1e-12 {
            return Vec::new();
        }
        let face = face.normalize();

        let mut test_axes = Vec::with_capacity(13);
        test_axes.push(face);
        test_axes.extend_from_slice(&axes);
        for axis in &axes {
            for edge in &edges {
                let cross = axis.cross(*edge);
                if cross.length_squared() > 1e-6 {
                    test_axes.push(cross.normalize());
                }
            }
        }

        let mut min_overlap = f32::MAX;
        let mut normal = Vec3::ZERO;
        for axis in test_axes {
            let center = transform.position.dot(axis);
            let radius = project_box(&axes, half_extents, axis);
            let (box_min, box_max) = (center - radius, center + radius);
            let projections = [a.dot(axis), b.dot(axis), c.dot(axis)];
            let tri_min = projections.iter().copied().fold(f32::INFINITY, f32::min);
            let tri_max = projections.iter().copied().fold(f32::NEG_INFINITY, f32::max);

            let overlap = box_max.min(tri_max) - box_min.max(tri_min);
            if overlap <= 0.0 {
                return Vec::new();
            }
            // Depth along this axis is the smaller push-out in either direction.
            let push_forward = box_max - tri_min;
            let push_backward = tri_max - box_min;
            let (depth, oriented) = if push_forward < push_backward {
                (push_forward, axis)
            } else {
                (push_backward, -axis)
            };
            if depth < min_overlap {
                min_overlap = depth;
                normal = oriented;
            }
        }


        let shape = CollisionShape::Box { half_extents };
        let plane = a.dot(normal);
        let mut contacts = Vec::new();
        if normal.dot(face).abs() > 0.999 {
            for corner in box_corners(half_extents, transform) {
                let pen = corner.dot(normal) - plane;
                if pen > 0.0 && point_in_triangle(corner - normal * pen, triangle) {
                    let pen = pen.min(min_overlap);
                    contacts.push(Contact::new(corner - normal * pen * 0.5, normal, pen));
                }
            }
        }
        if contacts.is_empty() {
            let deepest = shape.support(transform, normal);
            contacts.push(Contact::new(
                deepest - normal * min_overlap * 0.5,
                normal,
                min_overlap,
            ));
        }
        contacts
    }
}

fn box_axes(transform: &Transform) -> [Vec3; 3] {
    [
        transform.rotation * Vec3::X,
        transform.rotation * Vec3::Y,
        transform.rotation * Vec3::Z,
    ]
}

fn project_box(axes: &[Vec3; 3], half_extents: Vec3, axis: Vec3) -> f32 {
    axes[0].dot(axis).abs() * half_extents.x
        + axes[1].dot(axis).abs() * half_extents.y
        + axes[2].dot(axis).abs() * half_extents.z
}

fn box_corners(half_extents: Vec3, transform: &Transform) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let sign = Vec3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        );
        *corner = transform.transform_point(sign * half_extents);
    }
    corners
}

fn point_in_box(point: Vec3, half_extents: Vec3, transform: &Transform) -> bool {
    let local = transform.inverse_transform_point(point);
    local.abs().cmple(half_extents + Vec3::splat(1e-4)).all()
}

fn point_in_triangle(point: Vec3, [a, b, c]: [Vec3; 3]) -> bool {
    let closest = closest_point_on_triangle(point, [a, b, c]);
    closest.distance_squared(point) < 1e-6
}

/// Closest point on triangle `abc` to `p` (Voronoi region walk).
pub fn closest_point_on_triangle(p: Vec3, [a, b, c]: [Vec3; 3]) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Picks the contact algorithm for a shape pair.
#[derive(Debug, Clone, Default)]
pub struct CollisionDispatcher;

impl CollisionDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Contacts between two placed shapes, normals pointing from A to B.
    pub fn collide(
        &self,
        shape_a: &CollisionShape,
        transform_a: &Transform,
        shape_b: &CollisionShape,
        transform_b: &Transform,
    ) -> Vec<Contact> {
        if shape_a.is_degenerate() || shape_b.is_degenerate() {
            return Vec::new();
        }

        match (shape_a, shape_b) {
            (CollisionShape::TriangleMesh(_), CollisionShape::TriangleMesh(_)) => Vec::new(),
            (CollisionShape::TriangleMesh(_), _) => {
                let mut contacts = self.convex_mesh(shape_b, transform_b, shape_a, transform_a);
                for contact in &mut contacts {
                    contact.normal = -contact.normal;
                }
                contacts
            }
            (_, CollisionShape::TriangleMesh(_)) => {
                self.convex_mesh(shape_a, transform_a, shape_b, transform_b)
            }
            (CollisionShape::Sphere { radius: ra }, CollisionShape::Sphere { radius: rb }) => {
                PrimitiveAlgorithms::sphere_sphere(transform_a.position, *ra, transform_b.position, *rb)
                    .into_iter()
                    .collect()
            }
            (CollisionShape::Sphere { radius }, CollisionShape::Box { half_extents }) => {
                PrimitiveAlgorithms::sphere_box(transform_a.position, *radius, *half_extents, transform_b)
                    .into_iter()
                    .collect()
            }
            (CollisionShape::Box { half_extents }, CollisionShape::Sphere { radius }) => {
                PrimitiveAlgorithms::sphere_box(transform_b.position, *radius, *half_extents, transform_a)
                    .map(|mut contact| {
                        contact.normal = -contact.normal;
                        contact
                    })
                    .into_iter()
                    .collect()
            }
            (CollisionShape::Box { half_extents: ha }, CollisionShape::Box { half_extents: hb }) => {
                PrimitiveAlgorithms::box_box(*ha, transform_a, *hb, transform_b)
            }
            _ => GjkAlgorithm::penetration(
                &ShapeProxy {
                    shape: shape_a,
                    transform: transform_a,
                },
                &ShapeProxy {
                    shape: shape_b,
                    transform: transform_b,
                },
            )
            .into_iter()
            .collect(),
        }
    }

    /// Convex shape (A) against the triangles of a mesh (B) near it.
    fn convex_mesh(
        &self,
        convex: &CollisionShape,
        convex_transform: &Transform,
        mesh_shape: &CollisionShape,
        mesh_transform: &Transform,
    ) -> Vec<Contact> {
        let CollisionShape::TriangleMesh(mesh) = mesh_shape else {
            return Vec::new();
        };

        let world_bounds = convex.aabb(convex_transform);
        let local_bounds = bounds_in_space(&world_bounds, mesh_transform);

        let mut contacts = Vec::new();
        mesh.query_aabb(&local_bounds, |_, corners| {
            let triangle = corners.map(|v| mesh_transform.transform_point(v));
            match convex {
                CollisionShape::Sphere { radius } => {
                    contacts.extend(PrimitiveAlgorithms::sphere_triangle(
                        convex_transform.position,
                        *radius,
                        triangle,
                    ));
                }
                CollisionShape::Box { half_extents } => {
                    contacts.extend(PrimitiveAlgorithms::box_triangle(
                        *half_extents,
                        convex_transform,
                        triangle,
                    ));
                }
                _ => {
                    contacts.extend(GjkAlgorithm::penetration(
                        &ShapeProxy {
                            shape: convex,
                            transform: convex_transform,
                        },
                        &TriangleProxy(triangle),
                    ));
                }
            }
        });
        contacts
    }
}

/// Bounds of a world AABB expressed in the local space of `transform`.
fn bounds_in_space(world: &Aabb, transform: &Transform) -> Aabb {
    let mut local = Aabb::empty();
    for i in 0..8 {
        let corner = Vec3::new(
            if i & 1 == 0 { world.min.x } else { world.max.x },
            if i & 2 == 0 { world.min.y } else { world.max.y },
            if i & 4 == 0 { world.min.z } else { world.max.z },
        );
        local.extend(transform.inverse_transform_point(corner));
    }
    local
}
