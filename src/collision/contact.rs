use glam::Vec3;

use crate::core::rigidbody::BodyHandle;

/// Single contact point between two bodies. `normal` points from A towards B.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub point: Vec3,
    pub normal: Vec3,
    pub depth: f32,
    pub accumulated_normal_impulse: f32,
    pub accumulated_tangent_impulse: [f32; 2],
}

impl Contact {
    pub fn new(point: Vec3, normal: Vec3, depth: f32) -> Self {
        Self {
            point,
            normal,
            depth,
            accumulated_normal_impulse: 0.0,
            accumulated_tangent_impulse: [0.0; 2],
        }
    }
}

/// Contacts generated for one overlapping body pair during a step.
#[derive(Debug, Clone)]
pub struct ContactManifold {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub contacts: Vec<Contact>,
    /// False when either body has no contact response; such pairs are reported only.
    pub responding: bool,
}

impl ContactManifold {
    pub fn deepest(&self) -> Option<&Contact> {
        self.contacts
            .iter()
            .max_by(|a, b| a.depth.total_cmp(&b.depth))
    }
}

/// Overlap reported after a step, resolved or not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub point: Vec3,
    pub normal: Vec3,
    pub depth: f32,
    /// At least one side is a trigger.
    pub trigger: bool,
}

impl CollisionEvent {
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }

    pub fn from_manifold(manifold: &ContactManifold) -> Option<Self> {
        let contact = manifold.deepest()?;
        Some(Self {
            body_a: manifold.body_a,
            body_b: manifold.body_b,
            point: contact.point,
            normal: contact.normal,
            depth: contact.depth,
            trigger: !manifold.responding,
        })
    }
}
