//! Global configuration constants for the Forward Physics engine.

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Fixed internal simulation step (in seconds).
pub const FIXED_TIME_STEP: f32 = 1.0 / 60.0;

/// Upper bound on internal sub-steps per `update`; excess accumulated time is dropped.
pub const MAX_SUB_STEPS: u32 = 10;

/// Number of sequential-impulse iterations performed per internal step.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 10;

/// Fraction of penetration corrected per step by the velocity bias.
pub const DEFAULT_BAUMGARTE: f32 = 0.2;

/// Penetration tolerated before positional correction kicks in.
pub const DEFAULT_ALLOWED_PENETRATION: f32 = 0.01;

/// Approach speed below which restitution is ignored.
pub const DEFAULT_RESTITUTION_THRESHOLD: f32 = 0.5;

/// Default damping applied to linear velocity.
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.0;

/// Default damping applied to angular velocity.
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.0;

/// Default cell size for the broad-phase uniform grid.
pub const DEFAULT_BROADPHASE_CELL_SIZE: f32 = 5.0;

/// Proxies spanning more cells than this skip the grid and are tested against everything.
pub const BROADPHASE_MAX_PROXY_CELLS: usize = 512;

/// Linear speed under which a body starts counting towards sleep.
pub const SLEEP_LINEAR_THRESHOLD: f32 = 0.8;

/// Angular speed under which a body starts counting towards sleep.
pub const SLEEP_ANGULAR_THRESHOLD: f32 = 1.0;

/// Seconds a body must stay below the sleep thresholds before it is deactivated.
pub const TIME_TO_SLEEP: f32 = 2.0;

/// Friction forced on character bodies.
pub const CHARACTER_FRICTION: f32 = 1.0;

/// Half extents of the box used when a mesh collider yields no triangles.
pub const MESH_FALLBACK_HALF_EXTENTS: f32 = 10.0;

/// Half extents of the box used for convex colliders without a mesh.
pub const CONVEX_FALLBACK_HALF_EXTENTS: f32 = 0.5;

/// Maximum triangles stored in a single BVH leaf.
pub const BVH_LEAF_SIZE: usize = 4;

/// Uniform scale applied to the sky sphere around the camera.
pub const SKY_SCALE: f32 = 100.0;

/// Longitude and latitude segment count of the generated sky sphere.
pub const SKY_SEGMENTS: u32 = 16;

/// Default shader pair used for the sky material.
pub const SKY_VERTEX_SHADER: &str = "assets/shaders/textured.vert";
pub const SKY_FRAGMENT_SHADER: &str = "assets/shaders/textured.frag";

/// Vertex shader of the full-screen composite pass.
pub const FULLSCREEN_VERTEX_SHADER: &str = "assets/shaders/fullscreen.vert";

/// Frame time above which the frame driver logs a warning, in milliseconds.
pub const FRAME_BUDGET_MS: f32 = 1000.0 / 60.0;
