//! Entity storage consumed by the physics bridge and the renderer.
//!
//! Both sides only see the [`SceneGraph`] trait. [`Scene`] is a small
//! arena-backed implementation with parent links, enough to drive a frame
//! without an external ECS.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    core::collider::ColliderDesc,
    render::{camera::Camera, light::Light, material::Material, mesh::Mesh},
    utils::{
        allocator::{Arena, Handle},
        math::euler_to_quat,
    },
};

pub type EntityId = Handle<Entity>;

/// Transform relative to the parent entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalTransform {
    pub position: Vec3,
    /// Euler angles in radians (degrees in JSON), applied yaw, pitch, roll.
    #[serde(deserialize_with = "euler_degrees")]
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

fn euler_degrees<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
    let degrees = Vec3::deserialize(deserializer)?;
    Ok(Vec3::new(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    ))
}

impl LocalTransform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, euler_to_quat(self.rotation), self.position)
    }
}

/// Mesh and material drawn for an entity. Either may be missing.
#[derive(Debug, Clone, Default)]
pub struct MeshRenderer {
    pub mesh: Option<Arc<Mesh>>,
    pub material: Option<Arc<Material>>,
}

impl MeshRenderer {
    pub fn new(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self {
            mesh: Some(mesh),
            material: Some(material),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Entity {
    pub name: String,
    pub parent: Option<EntityId>,
    pub local_transform: LocalTransform,
    pub camera: Option<Camera>,
    pub light: Option<Light>,
    pub mesh_renderer: Option<MeshRenderer>,
    pub collider: Option<ColliderDesc>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.local_transform.position = position;
        self
    }

    pub fn with_transform(mut self, transform: LocalTransform) -> Self {
        self.local_transform = transform;
        self
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    pub fn with_mesh_renderer(mut self, renderer: MeshRenderer) -> Self {
        self.mesh_renderer = Some(renderer);
        self
    }

    pub fn with_collider(mut self, collider: ColliderDesc) -> Self {
        self.collider = Some(collider);
        self
    }
}

/// Read/write view of the scene used by physics and rendering.
pub trait SceneGraph {
    /// Live entities in iteration order.
    fn entity_ids(&self) -> Vec<EntityId>;
    fn local_to_world(&self, entity: EntityId) -> Option<Mat4>;
    /// Returns false when the entity does not exist.
    fn set_local_position(&mut self, entity: EntityId, position: Vec3) -> bool;
    fn camera(&self, entity: EntityId) -> Option<&Camera>;
    fn light(&self, entity: EntityId) -> Option<&Light>;
    fn mesh_renderer(&self, entity: EntityId) -> Option<&MeshRenderer>;
    fn collider(&self, entity: EntityId) -> Option<&ColliderDesc>;
}

#[derive(Debug, Default)]
pub struct Scene {
    entities: Arena<Entity>,
    order: Vec<EntityId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = self.entities.insert(entity);
        self.order.push(id);
        id
    }

    /// Removes the entity; children are re-parented to the root.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        self.order.retain(|&other| other != id);
        for (_, child) in self.entities.iter_mut() {
            if child.parent == Some(id) {
                child.parent = None;
            }
        }
        Some(entity)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl SceneGraph for Scene {
    fn entity_ids(&self) -> Vec<EntityId> {
        self.order.clone()
    }

    fn local_to_world(&self, entity: EntityId) -> Option<Mat4> {
        let mut current = self.entities.get(entity)?;
        let mut matrix = current.local_transform.to_matrix();
        // Bounded walk; a parent cycle stops at the entity count.
        for _ in 0..self.order.len() {
            let Some(parent) = current.parent.and_then(|p| self.entities.get(p)) else {
                break;
            };
            matrix = parent.local_transform.to_matrix() * matrix;
            current = parent;
        }
        Some(matrix)
    }

    fn set_local_position(&mut self, entity: EntityId, position: Vec3) -> bool {
        match self.entities.get_mut(entity) {
            Some(entity) => {
                entity.local_transform.position = position;
                true
            }
            None => false,
        }
    }

    fn camera(&self, entity: EntityId) -> Option<&Camera> {
        self.entities.get(entity)?.camera.as_ref()
    }

    fn light(&self, entity: EntityId) -> Option<&Light> {
        self.entities.get(entity)?.light.as_ref()
    }

    fn mesh_renderer(&self, entity: EntityId) -> Option<&MeshRenderer> {
        self.entities.get(entity)?.mesh_renderer.as_ref()
    }

    fn collider(&self, entity: EntityId) -> Option<&ColliderDesc> {
        self.entities.get(entity)?.collider.as_ref()
    }
}
