//! Forward Physics – rigid-body synchronization and forward rendering for Rust engines.
//!
//! The crate drives a compact discrete dynamics world from scene colliders,
//! writes simulated positions back to the scene, and draws the scene through
//! an ordered forward pipeline (opaque, sky, transparent, post-process).
//! Scenes and assets are reached through the [`SceneGraph`] and
//! [`AssetResolver`] traits, the GPU through [`RenderBackend`].

pub mod assets;
pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod physics;
pub mod render;
pub mod scene;
pub mod utils;
pub mod world;

use std::time::Instant;

pub use glam::{Mat3, Mat4, Quat, UVec2, Vec3, Vec4};

pub use assets::{AssetRegistry, AssetResolver};
pub use self::core::{
    collider::{ColliderDesc, ShapeKind},
    rigidbody::{ActivationState, BodyHandle, CollisionFlags, RigidBody, RigidBodyTriad},
    shape::CollisionShape,
    types::Transform,
};
pub use error::{EngineError, Result};
pub use physics::{ColliderHandle, ColliderShapeBuilder, PhysicsSystem, RaycastHit, TransformSyncBridge};
pub use render::{
    ForwardRenderer, FrameStats, Material, Mesh, RecordingBackend, RenderBackend, RendererConfig,
};
pub use scene::{Entity, EntityId, Scene, SceneGraph};
pub use utils::allocator::{Arena, Handle};
pub use world::{CollisionConfiguration, DynamicsWorld};

use config::FRAME_BUDGET_MS;
use utils::logging::{warn_if_frame_budget_exceeded, ScopedTimer};

/// High-level wrapper that owns a [`PhysicsSystem`] and a [`ForwardRenderer`]
/// and runs them in frame order.
#[derive(Default)]
pub struct FrameDriver {
    physics: PhysicsSystem,
    renderer: ForwardRenderer,
    sync_from_scene: bool,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Teleports every body to its entity before each step. Off by default,
    /// since it clears the velocity of dynamic bodies every frame.
    pub fn with_scene_sync(mut self, enabled: bool) -> Self {
        self.sync_from_scene = enabled;
        self
    }

    /// Initializes physics, registers every scene collider and prepares the renderer.
    ///
    /// Returns the number of registered colliders.
    pub fn initialize(
        &mut self,
        gravity: Vec3,
        viewport: UVec2,
        config: &RendererConfig,
        scene: &dyn SceneGraph,
        assets: &dyn AssetResolver,
        backend: &mut dyn RenderBackend,
    ) -> Result<usize> {
        self.physics.initialize(gravity);
        let registered = self.physics.register_world_colliders(scene, assets);
        self.renderer.initialize(viewport, config, backend)?;
        Ok(registered)
    }

    /// Steps physics by `dt`, writes positions back to the scene and draws it.
    pub fn frame(
        &mut self,
        dt: f32,
        scene: &mut dyn SceneGraph,
        assets: &dyn AssetResolver,
        backend: &mut dyn RenderBackend,
    ) -> Option<FrameStats> {
        let start = Instant::now();
        let _timer = ScopedTimer::new("frame");

        if self.sync_from_scene {
            self.physics.sync_from_entities(scene);
        }
        self.physics.update(dt, scene);
        let stats = self.renderer.render(scene, assets, backend);

        warn_if_frame_budget_exceeded(start.elapsed(), FRAME_BUDGET_MS);
        stats
    }

    pub fn physics(&self) -> &PhysicsSystem {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsSystem {
        &mut self.physics
    }

    pub fn renderer(&self) -> &ForwardRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut ForwardRenderer {
        &mut self.renderer
    }

    /// Releases renderer resources, then every body, then the world.
    pub fn shutdown(&mut self, backend: &mut dyn RenderBackend) {
        self.renderer.destroy(backend);
        self.physics.clear();
    }
}
