use glam::Vec3;

use super::{
    mesh::{Aabb, TriangleMesh},
    types::Transform,
};

/// Collision geometry owned by a rigid body.
///
/// Capsules and cylinders are aligned with the local Y axis. Triangle meshes
/// are static and stored in the space they were baked in.
#[derive(Debug, Clone)]
pub enum CollisionShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// `height` is the distance between the two cap centers.
    Capsule { radius: f32, height: f32 },
    /// Radius is `half_extents.x`, half height is `half_extents.y`.
    Cylinder { half_extents: Vec3 },
    TriangleMesh(TriangleMesh),
    ConvexHull { points: Vec<Vec3> },
}

impl CollisionShape {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::Sphere { .. } => "sphere",
            Self::Capsule { .. } => "capsule",
            Self::Cylinder { .. } => "cylinder",
            Self::TriangleMesh(_) => "triangle mesh",
            Self::ConvexHull { .. } => "convex hull",
        }
    }

    /// Shapes that can never produce contacts or ray hits.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::ConvexHull { points } if points.is_empty())
    }

    pub fn local_aabb(&self) -> Aabb {
        match self {
            Self::Box { half_extents } => Aabb::from_center_half_extents(Vec3::ZERO, *half_extents),
            Self::Sphere { radius } => Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(*radius)),
            Self::Capsule { radius, height } => Aabb::from_center_half_extents(
                Vec3::ZERO,
                Vec3::new(*radius, radius + height * 0.5, *radius),
            ),
            Self::Cylinder { half_extents } => Aabb::from_center_half_extents(
                Vec3::ZERO,
                Vec3::new(half_extents.x, half_extents.y, half_extents.x),
            ),
            Self::TriangleMesh(mesh) => mesh.bounds(),
            Self::ConvexHull { points } => {
                if points.is_empty() {
                    Aabb::new(Vec3::ZERO, Vec3::ZERO)
                } else {
                    Aabb::from_points(points)
                }
            }
        }
    }

    /// World-space bounds under `transform`.
    pub fn aabb(&self, transform: &Transform) -> Aabb {
        match self {
            Self::Sphere { radius } => {
                Aabb::from_center_half_extents(transform.position, Vec3::splat(*radius))
            }
            _ => {
                let local = self.local_aabb();
                let center = transform.transform_point(local.center());
                let extent = local.extent();
                let basis = glam::Mat3::from_quat(transform.rotation);
                let world_extent = Vec3::new(
                    basis.row(0).abs().dot(extent),
                    basis.row(1).abs().dot(extent),
                    basis.row(2).abs().dot(extent),
                );
                Aabb::from_center_half_extents(center, world_extent)
            }
        }
    }

    /// Diagonal of the local inertia tensor for the given mass.
    pub fn local_inertia(&self, mass: f32) -> Vec3 {
        if mass <= 0.0 {
            return Vec3::ZERO;
        }
        match self {
            Self::Box { half_extents } => box_inertia(*half_extents, mass),
            Self::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            Self::Capsule { radius, height } => {
                box_inertia(Vec3::new(*radius, radius + height * 0.5, *radius), mass)
            }
            Self::Cylinder { half_extents } => {
                let radius2 = half_extents.x * half_extents.x;
                let height2 = 4.0 * half_extents.y * half_extents.y;
                let side = mass * (height2 / 12.0 + radius2 / 4.0);
                Vec3::new(side, mass * radius2 * 0.5, side)
            }
            Self::TriangleMesh(_) => Vec3::ZERO,
            Self::ConvexHull { points } => {
                if points.is_empty() {
                    Vec3::ZERO
                } else {
                    box_inertia(self.local_aabb().extent(), mass)
                }
            }
        }
    }

    /// Farthest point of a convex shape along `direction`, in local space.
    pub fn local_support(&self, direction: Vec3) -> Vec3 {
        match self {
            Self::Box { half_extents } => Vec3::new(
                half_extents.x.copysign(direction.x),
                half_extents.y.copysign(direction.y),
                half_extents.z.copysign(direction.z),
            ),
            Self::Sphere { radius } => direction.normalize_or(Vec3::X) * *radius,
            Self::Capsule { radius, height } => {
                let cap = Vec3::Y * (height * 0.5).copysign(direction.y);
                cap + direction.normalize_or(Vec3::X) * *radius
            }
            Self::Cylinder { half_extents } => {
                let radial = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
                radial * half_extents.x + Vec3::Y * half_extents.y.copysign(direction.y)
            }
            Self::ConvexHull { points } => points
                .iter()
                .copied()
                .max_by(|a, b| a.dot(direction).total_cmp(&b.dot(direction)))
                .unwrap_or(Vec3::ZERO),
            Self::TriangleMesh(mesh) => mesh
                .vertices()
                .iter()
                .copied()
                .max_by(|a, b| a.dot(direction).total_cmp(&b.dot(direction)))
                .unwrap_or(Vec3::ZERO),
        }
    }

    /// World-space support point under `transform`.
    pub fn support(&self, transform: &Transform, direction: Vec3) -> Vec3 {
        let local_dir = transform.inverse_transform_vector(direction);
        transform.transform_point(self.local_support(local_dir))
    }
}

fn box_inertia(half_extents: Vec3, mass: f32) -> Vec3 {
    let size = half_extents * 2.0;
    let factor = mass / 12.0;
    Vec3::new(
        factor * (size.y * size.y + size.z * size.z),
        factor * (size.x * size.x + size.z * size.z),
        factor * (size.x * size.x + size.y * size.y),
    )
}
