//! Swarm Engine
//!
//! Boids that steer by weighted force rules, looking up neighbours, water and
//! fire through rebuilt spatial indexes.

pub mod boid;
pub mod flock;
pub mod rule;
pub mod spatial;

use crate::core::config::ConfigError;
use serde::{Deserialize, Serialize};

pub use boid::Boid;
pub use flock::{Flock, FlockSnapshot};
pub use rule::{Behaviour, Perception, Rule, RuleKind, RuleSet};
pub use spatial::SpatialIndex;

/// Configuration for a single flock
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub n_boids: usize,
    /// Radius within which a boid sees neighbours, water and fire.
    pub vision_range: f32,
    pub max_speed: f32,
    /// Integration step applied to velocity every tick.
    pub dt: f32,
    /// Chance per tick that an empty-handed boid checks its tile for water.
    pub pickup_chance: f32,
    /// Display-only.
    pub boid_size: f32,
}

impl Default for FlockConfig {
    fn default() -> Self {
        FlockConfig {
            n_boids: 20,
            vision_range: 10.0,
            max_speed: 4.0,
            dt: 0.1,
            pickup_chance: 0.5,
            boid_size: 1.0,
        }
    }
}

impl FlockConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("vision_range", self.vision_range),
            ("max_speed", self.max_speed),
            ("dt", self.dt),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(field, "must be a finite, positive number"));
            }
        }
        if !(0.0..=1.0).contains(&self.pickup_chance) {
            return Err(ConfigError::invalid("pickup_chance", "must lie in [0, 1]"));
        }
        if !self.boid_size.is_finite() || self.boid_size < 0.0 {
            return Err(ConfigError::invalid("boid_size", "must be a finite, non-negative number"));
        }
        Ok(())
    }
}
