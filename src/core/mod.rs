//! Core plumbing: configuration, errors and the experiment runner.

pub mod config;
pub mod runner;

use crate::world::ScenarioError;
use thiserror::Error;

pub use config::{ConfigError, SimConfig};
pub use runner::{ExperimentRunner, RunSummary};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
