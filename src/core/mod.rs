//! Core types describing physics bodies, shapes, and shared data.

pub mod collider;
pub mod mesh;
pub mod motion_state;
pub mod rigidbody;
pub mod shape;
pub mod types;

pub use collider::{ColliderDesc, ShapeKind};
pub use mesh::{Aabb, MeshBuilder, MeshBvh, TriangleMesh};
pub use motion_state::MotionState;
pub use rigidbody::{
    ActivationState, BodyFlags, BodyHandle, CollisionFlags, RigidBody, RigidBodyConstruction,
    RigidBodyTriad,
};
pub use shape::CollisionShape;
pub use types::{Transform, Velocity};
