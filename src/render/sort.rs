use glam::{Mat4, Vec3};

use super::{camera::Camera, command::RenderCommand};

/// Back-to-front ordering for blended draws.
pub struct TransparencySorter;

impl TransparencySorter {
    /// Sorts farthest first along the view direction of a camera with world matrix `camera_world`.
    pub fn sort(commands: &mut [RenderCommand], camera_world: &Mat4) {
        Self::sort_along(commands, Camera::forward(camera_world));
    }

    /// Stable sort by `dot(forward, center)`, descending.
    pub fn sort_along(commands: &mut [RenderCommand], forward: Vec3) {
        commands.sort_by(|a, b| forward.dot(b.center).total_cmp(&forward.dot(a.center)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mesh::{Mesh, Vertex};
    use std::sync::Arc;

    fn command_at(center: Vec3, mesh: &Arc<Mesh>) -> RenderCommand {
        RenderCommand {
            local_to_world: Mat4::from_translation(center),
            center,
            mesh: Arc::clone(mesh),
            material: None,
        }
    }

    #[test]
    fn sorted_projection_is_non_increasing() {
        let mesh = Arc::new(Mesh::new(vec![Vertex::from_position(Vec3::ZERO); 3], vec![0, 1, 2]));
        let mut commands: Vec<_> = [-2.0, -9.0, 4.0, -5.0, 0.0]
            .into_iter()
            .map(|z| command_at(Vec3::new(1.0, 0.0, z), &mesh))
            .collect();

        TransparencySorter::sort(&mut commands, &Mat4::IDENTITY);

        let depths: Vec<f32> = commands.iter().map(|c| Vec3::NEG_Z.dot(c.center)).collect();
        assert!(depths.windows(2).all(|pair| pair[0] >= pair[1]), "{depths:?}");
        assert_eq!(commands[0].center.z, -9.0);
    }

    #[test]
    fn equal_depths_keep_submission_order() {
        let mesh = Arc::new(Mesh::new(vec![Vertex::from_position(Vec3::ZERO); 3], vec![0, 1, 2]));
        let mut commands = vec![
            command_at(Vec3::new(-1.0, 0.0, -3.0), &mesh),
            command_at(Vec3::new(1.0, 0.0, -3.0), &mesh),
        ];
        TransparencySorter::sort_along(&mut commands, Vec3::NEG_Z);
        assert_eq!(commands[0].center.x, -1.0);
    }
}
