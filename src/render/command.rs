use std::sync::Arc;

use glam::{Mat4, UVec2, Vec3};

use super::{camera::Camera, light::Light, material::Material, mesh::Mesh};
use crate::scene::{EntityId, SceneGraph};

/// One mesh to draw this frame.
#[derive(Debug, Clone)]
pub struct RenderCommand {
    pub local_to_world: Mat4,
    /// World-space origin of the owner, used for depth sorting.
    pub center: Vec3,
    pub mesh: Arc<Mesh>,
    pub material: Option<Arc<Material>>,
}

/// The camera a frame is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct ActiveCamera {
    pub entity: EntityId,
    pub camera: Camera,
    pub world: Mat4,
}

impl ActiveCamera {
    pub fn forward(&self) -> Vec3 {
        Camera::forward(&self.world)
    }

    pub fn position(&self) -> Vec3 {
        Camera::position(&self.world)
    }

    pub fn view_projection(&self, viewport: UVec2) -> Mat4 {
        self.camera.projection_matrix(viewport) * Camera::view_matrix(&self.world)
    }
}

/// A light resolved to world space.
#[derive(Debug, Clone, Copy)]
pub struct FrameLight {
    pub entity: EntityId,
    pub light: Light,
    pub position: Vec3,
    pub direction: Vec3,
}

/// Everything extracted from the scene for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameCommands {
    pub camera: Option<ActiveCamera>,
    pub lights: Vec<FrameLight>,
    pub opaque: Vec<RenderCommand>,
    pub transparent: Vec<RenderCommand>,
}

impl FrameCommands {
    pub fn clear(&mut self) {
        self.camera = None;
        self.lights.clear();
        self.opaque.clear();
        self.transparent.clear();
    }

    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RenderCommandExtractor;

impl RenderCommandExtractor {
    pub fn extract(scene: &dyn SceneGraph) -> FrameCommands {
        let mut commands = FrameCommands::default();
        Self::extract_into(scene, &mut commands);
        commands
    }

    /// Refills `commands` in one pass over the scene.
    ///
    /// The first entity carrying a camera wins; every light is collected.
    /// Entities without a mesh are skipped; a missing material counts as opaque.
    pub fn extract_into(scene: &dyn SceneGraph, commands: &mut FrameCommands) {
        commands.clear();

        for entity in scene.entity_ids() {
            if commands.camera.is_none() {
                if let Some(camera) = scene.camera(entity) {
                    commands.camera = scene.local_to_world(entity).map(|world| ActiveCamera {
                        entity,
                        camera: *camera,
                        world,
                    });
                }
            }

            if let Some(light) = scene.light(entity) {
                if let Some(world) = scene.local_to_world(entity) {
                    commands.lights.push(FrameLight {
                        entity,
                        light: *light,
                        position: Light::position(&world),
                        direction: Light::direction(&world),
                    });
                }
            }

            let Some(renderer) = scene.mesh_renderer(entity) else {
                continue;
            };
            let Some(mesh) = renderer.mesh.clone() else {
                continue;
            };
            let Some(local_to_world) = scene.local_to_world(entity) else {
                continue;
            };

            let command = RenderCommand {
                local_to_world,
                center: local_to_world.transform_point3(Vec3::ZERO),
                mesh,
                material: renderer.material.clone(),
            };
            let transparent = command
                .material
                .as_deref()
                .is_some_and(Material::is_transparent);
            if transparent {
                commands.transparent.push(command);
            } else {
                commands.opaque.push(command);
            }
        }
    }
}
