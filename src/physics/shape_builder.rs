use glam::{Mat4, Vec3};
use log::{info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    config::{BVH_LEAF_SIZE, CONVEX_FALLBACK_HALF_EXTENTS, MESH_FALLBACK_HALF_EXTENTS},
    core::{
        collider::{ColliderDesc, ShapeKind},
        mesh::TriangleMesh,
        shape::CollisionShape,
    },
    render::mesh::Mesh,
};

/// Result of turning a collider descriptor into a shape.
#[derive(Debug, Clone)]
pub struct ShapeBuild {
    pub shape: CollisionShape,
    /// Triangles baked into a mesh shape; 0 for everything else.
    pub triangle_count: usize,
    /// The requested shape could not be built and a box stands in for it.
    pub fallback: bool,
}

impl ShapeBuild {
    fn primitive(shape: CollisionShape) -> Self {
        Self {
            shape,
            triangle_count: 0,
            fallback: false,
        }
    }

    fn fallback_box(half_extent: f32) -> Self {
        Self {
            shape: CollisionShape::Box {
                half_extents: Vec3::splat(half_extent),
            },
            triangle_count: 0,
            fallback: true,
        }
    }
}

/// Synthesizes collision shapes from collider descriptors.
pub struct ColliderShapeBuilder;

impl ColliderShapeBuilder {
    /// Builds the shape for `desc`. Never fails; unusable input yields a fallback box.
    ///
    /// Mesh colliders bake `owner_world` into their vertices, so the resulting
    /// body must sit at the identity transform.
    pub fn build(desc: &ColliderDesc, mesh: Option<&Mesh>, owner_world: &Mat4) -> ShapeBuild {
        let size = desc.size;
        match desc.shape {
            ShapeKind::Box => ShapeBuild::primitive(CollisionShape::Box {
                half_extents: size * 0.5,
            }),
            ShapeKind::Sphere => ShapeBuild::primitive(CollisionShape::Sphere { radius: size.x }),
            ShapeKind::Capsule => ShapeBuild::primitive(CollisionShape::Capsule {
                radius: size.x,
                height: size.y,
            }),
            ShapeKind::Cylinder => ShapeBuild::primitive(CollisionShape::Cylinder {
                half_extents: Vec3::new(size.x, size.y * 0.5, size.z),
            }),
            ShapeKind::Mesh => Self::build_mesh(desc, mesh, owner_world),
            ShapeKind::ConvexHull => match mesh {
                Some(_) => {
                    warn!(
                        "Convex collider '{}' is not populated from mesh points; it will never collide",
                        desc.mesh
                    );
                    ShapeBuild {
                        shape: CollisionShape::ConvexHull { points: Vec::new() },
                        triangle_count: 0,
                        fallback: false,
                    }
                }
                None => ShapeBuild::fallback_box(CONVEX_FALLBACK_HALF_EXTENTS),
            },
        }
    }

    fn build_mesh(desc: &ColliderDesc, mesh: Option<&Mesh>, owner_world: &Mat4) -> ShapeBuild {
        let Some(mesh) = mesh.filter(|mesh| !mesh.vertices.is_empty()) else {
            warn!(
                "Mesh collider fallback: mesh '{}' is {}",
                desc.mesh,
                if mesh.is_some() { "empty" } else { "missing" }
            );
            return ShapeBuild::fallback_box(MESH_FALLBACK_HALF_EXTENTS);
        };

        let vertices = Self::bake_vertices(mesh, owner_world);
        let triangles = TriangleMesh::builder(vertices, mesh.triangle_indices())
            .leaf_size(BVH_LEAF_SIZE)
            .build();
        let triangle_count = triangles.triangle_count();

        info!(
            "Created mesh collider with {} triangles from {} vertices ({} submeshes)",
            triangle_count,
            mesh.vertices.len(),
            mesh.submeshes.len()
        );

        if triangle_count == 0 {
            warn!("Mesh collider '{}' has no valid triangles, using fallback box", desc.mesh);
            return ShapeBuild::fallback_box(MESH_FALLBACK_HALF_EXTENTS);
        }

        ShapeBuild {
            shape: CollisionShape::TriangleMesh(triangles),
            triangle_count,
            fallback: false,
        }
    }

    #[cfg(feature = "parallel")]
    fn bake_vertices(mesh: &Mesh, world: &Mat4) -> Vec<Vec3> {
        mesh.vertices
            .par_iter()
            .map(|vertex| world.transform_point3(vertex.position))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn bake_vertices(mesh: &Mesh, world: &Mat4) -> Vec<Vec3> {
        mesh.vertices
            .iter()
            .map(|vertex| world.transform_point3(vertex.position))
            .collect()
    }
}
