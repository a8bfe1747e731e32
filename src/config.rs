//! Global configuration for the simulation kernel.

use serde::{Deserialize, Serialize};

/// Default hard cap on entity speed, in units per second.
pub const DEFAULT_MAX_SPEED: f32 = 300.0;

/// Default gravitational constant used by the pairwise gravity pass.
pub const DEFAULT_GRAVITY_CONSTANT: f32 = 6.674e-2;

/// Default subdivision depth of both spatial indices.
pub const DEFAULT_TREE_DEPTH: u32 = 5;

/// Tunable knobs passed to [`PhysicsWorld`](crate::world::PhysicsWorld) at
/// construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity_constant: f32,
    pub max_speed: f32,
    pub tree_depth: u32,
    /// When true the interpenetration pass walks the collision index; when
    /// false it runs the all-pairs reference path. Both produce equivalent
    /// event sets up to floating-point ordering.
    pub use_spatial_index: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity_constant: DEFAULT_GRAVITY_CONSTANT,
            max_speed: DEFAULT_MAX_SPEED,
            tree_depth: DEFAULT_TREE_DEPTH,
            use_spatial_index: true,
        }
    }
}
