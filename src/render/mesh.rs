use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec2, Vec3};

use super::backend::MeshId;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Vertex layout shared by every mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub color: [u8; 4],
    pub tex_coord: Vec2,
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, tex_coord: Vec2, normal: Vec3) -> Self {
        Self {
            position,
            color: [255; 4],
            tex_coord,
            normal,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Vec2::ZERO, Vec3::ZERO)
    }
}

/// Contiguous index range drawn with one named material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submesh {
    /// First index in the mesh index buffer.
    pub offset: u32,
    pub count: u32,
    pub material_name: String,
}

impl Submesh {
    pub fn new(offset: u32, count: u32, material_name: impl Into<String>) -> Self {
        Self {
            offset,
            count,
            material_name: material_name.into(),
        }
    }
}

/// CPU copy of an indexed triangle mesh, kept for both drawing and collision.
#[derive(Debug)]
pub struct Mesh {
    id: MeshId,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<Submesh>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            id: MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)),
            vertices,
            indices,
            submeshes: Vec::new(),
        }
    }

    pub fn with_submeshes(mut self, submeshes: Vec<Submesh>) -> Self {
        self.submeshes = submeshes;
        self
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn element_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn has_submeshes(&self) -> bool {
        !self.submeshes.is_empty()
    }

    /// Index triples to use for collision.
    ///
    /// The whole index buffer when there are no submeshes, otherwise the union
    /// of the submesh ranges clipped to the buffer, so indices shared by
    /// overlapping ranges are read once. Trailing partial triangles are dropped.
    pub fn triangle_indices(&self) -> Vec<[u32; 3]> {
        if self.submeshes.is_empty() {
            return self
                .indices
                .chunks_exact(3)
                .map(|tri| [tri[0], tri[1], tri[2]])
                .collect();
        }

        let len = self.indices.len();
        let mut ranges: Vec<(usize, usize)> = self
            .submeshes
            .iter()
            .map(|submesh| {
                let start = (submesh.offset as usize).min(len);
                (start, (start + submesh.count as usize).min(len))
            })
            .filter(|(start, end)| start < end)
            .collect();
        ranges.sort_unstable();

        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start < last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        let indices = self.indices.as_slice();
        merged
            .into_iter()
            .flat_map(move |(start, end)| {
                indices[start..end]
                    .chunks_exact(3)
                    .map(|tri| [tri[0], tri[1], tri[2]])
            })
            .collect()
    }

    /// Unit UV sphere, counter-clockwise when seen from outside.
    ///
    /// `segments` is (longitude, latitude).
    pub fn sphere(segments: (u32, u32)) -> Self {
        let (lng_segments, lat_segments) = (segments.0.max(3), segments.1.max(2));
        let mut vertices = Vec::with_capacity(((lng_segments + 1) * (lat_segments + 1)) as usize);

        for lat in 0..=lat_segments {
            let v = lat as f32 / lat_segments as f32;
            let pitch = v * PI - FRAC_PI_2;
            let (sin, cos) = pitch.sin_cos();
            for lng in 0..=lng_segments {
                let u = lng as f32 / lng_segments as f32;
                let yaw = u * TAU;
                let normal = Vec3::new(cos * yaw.cos(), sin, cos * yaw.sin());
                vertices.push(Vertex::new(normal, Vec2::new(u, v), normal));
            }
        }

        let mut indices = Vec::with_capacity((lng_segments * lat_segments * 6) as usize);
        let stride = lng_segments + 1;
        for lat in 1..=lat_segments {
            let start = lat * stride;
            for lng in 1..=lng_segments {
                let prev = lng - 1;
                indices.extend_from_slice(&[
                    lng + start,
                    lng + start - stride,
                    prev + start - stride,
                    prev + start - stride,
                    prev + start,
                    lng + start,
                ]);
            }
        }

        Self::new(vertices, indices)
    }
}
