//! Bridge between scene colliders and the dynamics world.

pub mod shape_builder;
pub mod sync;
pub mod system;

pub use shape_builder::{ColliderShapeBuilder, ShapeBuild};
pub use sync::TransformSyncBridge;
pub use system::{ColliderAttachment, ColliderContact, ColliderHandle, PhysicsSystem, RaycastHit};
