use crate::evolution::EvolutionConfig;
use crate::swarm::FlockConfig;
use crate::world::GridConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration rejected before any simulation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("{requested} fire and water tiles requested but the grid only has {available}")]
    TooManyTiles { requested: usize, available: usize },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Main hyperparameters for an evolution experiment
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Root seed; every random stream of the experiment derives from it.
    pub seed: u64,
    pub grid: GridConfig,
    pub flock: FlockConfig,
    pub evolution: EvolutionConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            seed: 42,
            grid: GridConfig::default(),
            flock: FlockConfig::default(),
            evolution: EvolutionConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.flock.validate()?;
        self.evolution.validate()
    }
}
