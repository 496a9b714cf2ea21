//! Collision detection modules: broad-phase, narrow-phase, contacts and ray queries.

pub mod broadphase;
pub mod contact;
pub mod narrowphase;
pub mod queries;

pub use broadphase::{BroadPhase, BroadPhaseProxy, SpatialGrid};
pub use contact::{CollisionEvent, Contact, ContactManifold};
pub use narrowphase::{CollisionDispatcher, GjkAlgorithm, PrimitiveAlgorithms};
pub use queries::{RayHit, Raycast};
