use std::collections::HashMap;

use glam::Vec3;
use log::{debug, info};

use super::{shape_builder::ColliderShapeBuilder, sync::TransformSyncBridge};
use crate::{
    assets::AssetResolver,
    config::{CHARACTER_FRICTION, FIXED_TIME_STEP, MAX_SUB_STEPS},
    core::{
        collider::ColliderDesc,
        rigidbody::{ActivationState, BodyFlags, BodyHandle, CollisionFlags, RigidBodyTriad},
    },
    scene::{EntityId, SceneGraph},
    utils::allocator::{Arena, Handle},
    world::{CollisionConfiguration, DynamicsWorld},
};

pub type ColliderHandle = Handle<ColliderAttachment>;

/// A registered collider: the descriptor, its owner and the body built for it.
#[derive(Debug, Clone)]
pub struct ColliderAttachment {
    pub owner: EntityId,
    pub desc: ColliderDesc,
    pub body: BodyHandle,
    /// Triangles baked into a mesh collider; 0 otherwise.
    pub triangle_count: usize,
}

/// Closest hit returned by [`PhysicsSystem::raycast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub point: Vec3,
    pub normal: Vec3,
    /// Position along the ray segment, in `[0, 1]`.
    pub fraction: f32,
    pub collider: ColliderHandle,
}

/// Two colliders found touching during the last step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderContact {
    pub collider_a: ColliderHandle,
    pub collider_b: ColliderHandle,
    pub point: Vec3,
    pub normal: Vec3,
    /// At least one side is a trigger; the overlap was not resolved.
    pub trigger: bool,
}

/// Owns the dynamics world and the bodies built for scene colliders.
///
/// Every call made before [`initialize`](Self::initialize) is a no-op.
#[derive(Default)]
pub struct PhysicsSystem {
    colliders: Arena<ColliderAttachment>,
    tracked: Vec<ColliderHandle>,
    body_owners: HashMap<BodyHandle, ColliderHandle>,
    entity_colliders: HashMap<EntityId, ColliderHandle>,
    world: Option<DynamicsWorld>,
}

impl PhysicsSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, gravity: Vec3) {
        self.initialize_with(CollisionConfiguration::default(), gravity);
    }

    /// Builds the world from `configuration`. Calling it again starts a fresh world.
    pub fn initialize_with(&mut self, configuration: CollisionConfiguration, gravity: Vec3) {
        self.clear();
        let mut world = DynamicsWorld::new(configuration);
        world.set_gravity(gravity);
        self.world = Some(world);
        info!("Physics world initialized (gravity {gravity})");
    }

    pub fn is_initialized(&self) -> bool {
        self.world.is_some()
    }

    /// Registers the collider of `entity`, building its shape and body.
    ///
    /// Returns `None` when the world is not initialized or the entity has no collider.
    /// An entity that is already registered keeps its body and gets its existing handle back.
    pub fn register_collider(
        &mut self,
        entity: EntityId,
        scene: &dyn SceneGraph,
        assets: &dyn AssetResolver,
    ) -> Option<ColliderHandle> {
        if self.world.is_none() {
            debug!("Ignoring collider registration before initialize");
            return None;
        }
        if let Some(&existing) = self.entity_colliders.get(&entity) {
            debug!("Entity {entity:?} already has collider {existing:?}");
            return Some(existing);
        }
        let desc = scene.collider(entity)?.clone();
        let owner_world = scene.local_to_world(entity)?;
        let mesh = desc.mesh_name().and_then(|name| assets.mesh(name));

        let build = ColliderShapeBuilder::build(&desc, mesh.as_deref(), &owner_world);
        let start = TransformSyncBridge::body_transform_for(&desc, &owner_world);
        let compute_inertia = desc.mass > 0.0 && !desc.is_trigger;
        let mut triad = RigidBodyTriad::from_shape(build.shape, desc.mass, start, compute_inertia);
        Self::apply_body_policy(&mut triad, &desc);

        let world = self.world.as_mut()?;
        let body = world.add_rigid_body(triad);
        let handle = self.colliders.insert(ColliderAttachment {
            owner: entity,
            desc,
            body,
            triangle_count: build.triangle_count,
        });
        self.body_owners.insert(body, handle);
        self.entity_colliders.insert(entity, handle);
        self.tracked.push(handle);
        Some(handle)
    }

    fn apply_body_policy(triad: &mut RigidBodyTriad, desc: &ColliderDesc) {
        let body = triad.body_mut();
        body.friction = desc.friction;
        body.restitution = desc.restitution;

        if desc.is_trigger {
            let flags = body.collision_flags() | CollisionFlags::NO_CONTACT_RESPONSE;
            body.set_collision_flags(flags);
        }

        // Upright character: no spin, no gravity, never sleeps.
        if desc.is_character() {
            body.angular_factor = Vec3::ZERO;
            body.linear_factor = Vec3::ONE;
            body.set_gravity(Vec3::ZERO);
            body.set_body_flags(body.body_flags() | BodyFlags::DISABLE_WORLD_GRAVITY);
            body.set_activation_state(ActivationState::DisableDeactivation);
            body.friction = CHARACTER_FRICTION;
        }
    }

    /// Registers every entity that carries a collider; returns how many new ones were registered.
    pub fn register_world_colliders(
        &mut self,
        scene: &dyn SceneGraph,
        assets: &dyn AssetResolver,
    ) -> usize {
        if self.world.is_none() {
            return 0;
        }
        let mut count = 0;
        for entity in scene.entity_ids() {
            if scene.collider(entity).is_none() || self.entity_colliders.contains_key(&entity) {
                continue;
            }
            if self.register_collider(entity, scene, assets).is_some() {
                count += 1;
            }
        }
        info!("Registered {count} colliders");
        count
    }

    /// Detaches the collider's body and drops it. Returns false for unknown handles.
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> bool {
        let Some(world) = self.world.as_mut() else {
            return false;
        };
        let Some(attachment) = self.colliders.remove(handle) else {
            return false;
        };
        self.tracked.retain(|&tracked| tracked != handle);
        self.body_owners.remove(&attachment.body);
        self.entity_colliders.remove(&attachment.owner);
        world.remove_rigid_body(attachment.body).is_some()
    }

    /// Steps the world with the fixed 1/60 s step, then writes dynamic body positions back.
    ///
    /// Returns the number of internal steps taken.
    pub fn update(&mut self, dt: f32, scene: &mut dyn SceneGraph) -> u32 {
        let Some(world) = self.world.as_mut() else {
            return 0;
        };
        let steps = world.step_simulation(dt, MAX_SUB_STEPS, FIXED_TIME_STEP);

        for &handle in &self.tracked {
            let Some(attachment) = self.colliders.get(handle) else {
                continue;
            };
            if attachment.desc.is_static() {
                continue;
            }
            if let Some(triad) = world.body(attachment.body) {
                TransformSyncBridge::sync_to_entity(triad, &attachment.desc, attachment.owner, scene);
            }
        }
        steps
    }

    /// Moves every tracked body to its owner's current transform.
    pub fn sync_from_entities(&mut self, scene: &dyn SceneGraph) {
        let Some(world) = self.world.as_mut() else {
            return;
        };
        for &handle in &self.tracked {
            let Some(attachment) = self.colliders.get(handle) else {
                continue;
            };
            let Some(owner_world) = scene.local_to_world(attachment.owner) else {
                continue;
            };
            if let Some(triad) = world.body_mut(attachment.body) {
                TransformSyncBridge::sync_from_entity(triad, &attachment.desc, &owner_world);
            }
        }
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        if let Some(world) = self.world.as_mut() {
            world.set_gravity(gravity);
        }
    }

    pub fn gravity(&self) -> Option<Vec3> {
        self.world.as_ref().map(DynamicsWorld::gravity)
    }

    pub fn world(&self) -> Option<&DynamicsWorld> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut DynamicsWorld> {
        self.world.as_mut()
    }

    /// Closest collider hit by the segment `start -> end`.
    pub fn raycast(&self, start: Vec3, end: Vec3) -> Option<RaycastHit> {
        let world = self.world.as_ref()?;
        let (body, hit) = world.ray_test(start, end)?;
        let collider = *self.body_owners.get(&body)?;
        Some(RaycastHit {
            point: hit.point,
            normal: hit.normal,
            fraction: hit.fraction,
            collider,
        })
    }

    /// Contacts and trigger overlaps from the last update that ran a step.
    pub fn collision_events(&self) -> Vec<ColliderContact> {
        let Some(world) = self.world.as_ref() else {
            return Vec::new();
        };
        world
            .collision_events()
            .iter()
            .filter_map(|event| {
                Some(ColliderContact {
                    collider_a: *self.body_owners.get(&event.body_a)?,
                    collider_b: *self.body_owners.get(&event.body_b)?,
                    point: event.point,
                    normal: event.normal,
                    trigger: event.trigger,
                })
            })
            .collect()
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&ColliderAttachment> {
        self.colliders.get(handle)
    }

    /// Body built for a collider.
    pub fn body(&self, handle: ColliderHandle) -> Option<&RigidBodyTriad> {
        let attachment = self.colliders.get(handle)?;
        self.world.as_ref()?.body(attachment.body)
    }

    pub fn body_mut(&mut self, handle: ColliderHandle) -> Option<&mut RigidBodyTriad> {
        let attachment = self.colliders.get(handle)?;
        self.world.as_mut()?.body_mut(attachment.body)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn tracked(&self) -> &[ColliderHandle] {
        &self.tracked
    }

    /// Releases every body, then the world.
    pub fn clear(&mut self) {
        if let Some(world) = self.world.as_mut() {
            for &handle in &self.tracked {
                if let Some(attachment) = self.colliders.get(handle) {
                    world.remove_rigid_body(attachment.body);
                }
            }
        }
        self.tracked.clear();
        self.body_owners.clear();
        self.entity_colliders.clear();
        self.colliders.clear();
        self.world = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::AssetRegistry,
        core::{collider::ShapeKind, shape::CollisionShape},
        scene::{Entity, Scene},
    };
    use approx::assert_relative_eq;

    const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

    fn system() -> PhysicsSystem {
        let mut physics = PhysicsSystem::new();
        physics.initialize(GRAVITY);
        physics
    }

    #[test]
    fn calls_before_initialize_are_ignored() {
        let mut scene = Scene::new();
        let entity = scene.spawn(Entity::new("box").with_collider(ColliderDesc::default()));
        let mut physics = PhysicsSystem::new();

        assert!(physics
            .register_collider(entity, &scene, &AssetRegistry::new())
            .is_none());
        assert_eq!(physics.update(1.0, &mut scene), 0);
        assert!(physics.raycast(Vec3::ZERO, Vec3::X).is_none());
        assert_eq!(physics.tracked_count(), 0);
    }

    #[test]
    fn static_box_has_half_extents_and_no_inertia() {
        let mut scene = Scene::new();
        let entity = scene.spawn(Entity::new("crate").with_collider(ColliderDesc::new(
            ShapeKind::Box,
            Vec3::splat(2.0),
        )));
        let mut physics = system();
        let handle = physics
            .register_collider(entity, &scene, &AssetRegistry::new())
            .unwrap();

        let triad = physics.body(handle).unwrap();
        assert!(triad.body().is_static());
        assert_eq!(triad.body().local_inertia(), Vec3::ZERO);
        assert!(matches!(triad.shape(), CollisionShape::Box { half_extents } if *half_extents == Vec3::ONE));
    }

    #[test]
    fn character_policy_is_applied() {
        let mut scene = Scene::new();
        let entity = scene.spawn(
            Entity::new("player").with_collider(ColliderDesc::new(ShapeKind::Box, Vec3::ONE).with_mass(70.0)),
        );
        let mut physics = system();
        let handle = physics
            .register_collider(entity, &scene, &AssetRegistry::new())
            .unwrap();

        physics.set_gravity(Vec3::new(0.0, -20.0, 0.0));
        let body = physics.body(handle).unwrap().body();
        assert_eq!(body.angular_factor, Vec3::ZERO);
        assert_eq!(body.linear_factor, Vec3::ONE);
        assert_eq!(body.gravity(), Vec3::ZERO);
        assert_eq!(body.activation_state(), ActivationState::DisableDeactivation);
        assert_relative_eq!(body.friction, 1.0);
    }

    #[test]
    fn trigger_gets_no_contact_response_and_no_inertia() {
        let mut scene = Scene::new();
        let entity = scene.spawn(
            Entity::new("zone").with_collider(ColliderDesc::new(ShapeKind::Sphere, Vec3::ONE).with_mass(2.0).trigger()),
        );
        let mut physics = system();
        let handle = physics
            .register_collider(entity, &scene, &AssetRegistry::new())
            .unwrap();

        let body = physics.body(handle).unwrap().body();
        assert!(!body.has_contact_response());
        assert_eq!(body.local_inertia(), Vec3::ZERO);
        assert_eq!(body.gravity(), GRAVITY);
    }

    #[test]
    fn register_then_remove_restores_counts() {
        let mut scene = Scene::new();
        let entity = scene.spawn(Entity::new("box").with_collider(ColliderDesc::default()));
        let mut physics = system();
        let before = physics.tracked_count();

        let handle = physics
            .register_collider(entity, &scene, &AssetRegistry::new())
            .unwrap();
        let body = physics.collider(handle).unwrap().body;
        assert!(physics.remove_collider(handle));

        assert_eq!(physics.tracked_count(), before);
        assert!(!physics.world().unwrap().contains(body));
        assert!(!physics.remove_collider(handle));
    }

    #[test]
    fn entity_is_registered_once() {
        let mut scene = Scene::new();
        let entity = scene.spawn(
            Entity::new("crate").with_collider(ColliderDesc::new(ShapeKind::Box, Vec3::ONE).with_mass(1.0)),
        );
        let assets = AssetRegistry::new();
        let mut physics = system();

        let first = physics.register_collider(entity, &scene, &assets).unwrap();
        let second = physics.register_collider(entity, &scene, &assets).unwrap();
        assert_eq!(first, second);
        assert_eq!(physics.register_world_colliders(&scene, &assets), 0);
        assert_eq!(physics.tracked_count(), 1);
        assert_eq!(physics.world().unwrap().num_bodies(), 1);

        // Once removed, the entity can be registered again.
        assert!(physics.remove_collider(first));
        assert_eq!(physics.register_world_colliders(&scene, &assets), 1);
        assert_eq!(physics.world().unwrap().num_bodies(), 1);
    }

    #[test]
    fn non_finite_update_leaves_entities_untouched() {
        let mut scene = Scene::new();
        let ball = scene.spawn(
            Entity::new("ball")
                .with_position(Vec3::new(0.0, 10.0, 0.0))
                .with_collider(ColliderDesc::new(ShapeKind::Sphere, Vec3::splat(0.5)).with_mass(1.0).trigger()),
        );
        let mut physics = system();
        physics.register_world_colliders(&scene, &AssetRegistry::new());

        assert_eq!(physics.update(f32::NAN, &mut scene), 0);
        assert!(scene.entity(ball).unwrap().local_transform.position.is_finite());

        assert!(physics.update(0.1, &mut scene) > 0);
        let y = scene.entity(ball).unwrap().local_transform.position.y;
        assert!(y.is_finite() && y < 10.0, "ball at y = {y}");
    }

    #[test]
    fn update_moves_dynamic_owner_only() {
        let mut scene = Scene::new();
        let wall = scene.spawn(
            Entity::new("wall")
                .with_position(Vec3::new(5.0, 0.0, 0.0))
                .with_collider(ColliderDesc::default()),
        );
        let ball = scene.spawn(
            Entity::new("ball")
                .with_position(Vec3::new(0.0, 10.0, 0.0))
                .with_collider(ColliderDesc::new(ShapeKind::Sphere, Vec3::splat(0.5)).with_mass(1.0).trigger()),
        );
        let mut physics = system();
        assert_eq!(physics.register_world_colliders(&scene, &AssetRegistry::new()), 2);

        let steps = physics.update(0.5, &mut scene);
        assert_eq!(steps, 10);
        assert!(scene.entity(ball).unwrap().local_transform.position.y < 10.0);
        assert_eq!(scene.entity(wall).unwrap().local_transform.position, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn raycast_maps_body_to_collider() {
        let mut scene = Scene::new();
        let target = scene.spawn(
            Entity::new("target")
                .with_position(Vec3::new(0.0, 0.0, -5.0))
                .with_collider(ColliderDesc::new(ShapeKind::Box, Vec3::splat(2.0))),
        );
        let mut physics = system();
        let handle = physics
            .register_collider(target, &scene, &AssetRegistry::new())
            .unwrap();

        let hit = physics.raycast(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0)).unwrap();
        assert_eq!(hit.collider, handle);
        assert_relative_eq!(hit.point.z, -4.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.z, 1.0, epsilon = 1e-5);
        assert!(physics.raycast(Vec3::Y * 5.0, Vec3::new(0.0, 5.0, -10.0)).is_none());
    }

    #[test]
    fn sync_from_entities_teleports_bodies() {
        let mut scene = Scene::new();
        let entity = scene.spawn(
            Entity::new("box").with_collider(ColliderDesc::new(ShapeKind::Box, Vec3::ONE).with_offset(Vec3::Y)),
        );
        let mut physics = system();
        let handle = physics
            .register_collider(entity, &scene, &AssetRegistry::new())
            .unwrap();

        scene.set_local_position(entity, Vec3::new(3.0, 0.0, 0.0));
        physics.sync_from_entities(&scene);
        assert_eq!(
            physics.body(handle).unwrap().body().transform.position,
            Vec3::new(3.0, 1.0, 0.0)
        );
    }
}
