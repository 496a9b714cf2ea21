use serde::{Deserialize, Serialize};

use crate::{
    collision::broadphase::BroadPhase,
    config::{
        DEFAULT_ALLOWED_PENETRATION, DEFAULT_BAUMGARTE, DEFAULT_BROADPHASE_CELL_SIZE,
        DEFAULT_RESTITUTION_THRESHOLD, DEFAULT_SOLVER_ITERATIONS, SLEEP_ANGULAR_THRESHOLD,
        SLEEP_LINEAR_THRESHOLD, TIME_TO_SLEEP,
    },
    dynamics::solver::SequentialImpulseSolver,
    error::Result,
};

/// Tunables of the collision pipeline and solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollisionConfiguration {
    pub broadphase_cell_size: f32,
    pub solver_iterations: u32,
    pub baumgarte: f32,
    pub allowed_penetration: f32,
    pub restitution_threshold: f32,
    pub sleep_linear_threshold: f32,
    pub sleep_angular_threshold: f32,
    pub time_to_sleep: f32,
}

impl Default for CollisionConfiguration {
    fn default() -> Self {
        Self {
            broadphase_cell_size: DEFAULT_BROADPHASE_CELL_SIZE,
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            baumgarte: DEFAULT_BAUMGARTE,
            allowed_penetration: DEFAULT_ALLOWED_PENETRATION,
            restitution_threshold: DEFAULT_RESTITUTION_THRESHOLD,
            sleep_linear_threshold: SLEEP_LINEAR_THRESHOLD,
            sleep_angular_threshold: SLEEP_ANGULAR_THRESHOLD,
            time_to_sleep: TIME_TO_SLEEP,
        }
    }
}

impl CollisionConfiguration {
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn solver(&self) -> SequentialImpulseSolver {
        SequentialImpulseSolver {
            iterations: self.solver_iterations,
            baumgarte: self.baumgarte,
            allowed_penetration: self.allowed_penetration,
            restitution_threshold: self.restitution_threshold,
        }
    }

    pub fn broadphase(&self) -> BroadPhase {
        BroadPhase::new(self.broadphase_cell_size)
    }
}
