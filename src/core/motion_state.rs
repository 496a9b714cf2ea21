use super::types::Transform;

/// Interpolated transform the world hands back to the game side.
///
/// The dynamics world writes it after every `step_simulation`; readers take the
/// pose from here rather than from the body so they see the interpolated value.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionState {
    graphics_world_transform: Transform,
    start_world_transform: Transform,
}

impl MotionState {
    pub fn new(start: Transform) -> Self {
        Self {
            graphics_world_transform: start,
            start_world_transform: start,
        }
    }

    pub fn world_transform(&self) -> Transform {
        self.graphics_world_transform
    }

    pub fn set_world_transform(&mut self, transform: Transform) {
        self.graphics_world_transform = transform;
    }

    /// Transform the body was created with.
    pub fn start_world_transform(&self) -> Transform {
        self.start_world_transform
    }
}
