//! EmberSwarm Core v0.3.0 - Evolved Fire-Fighting Swarms
//!
//! Boid flocks steer with weighted force rules, fetch water and drop it on a
//! forest fire that spreads as a stochastic cellular automaton.  A genetic
//! algorithm tunes the rule weights by simulating whole populations of flocks
//! in parallel.

pub mod core;
pub mod evolution;
pub mod swarm;
pub mod world;

// Re-export key types
pub use crate::core::config::{ConfigError, SimConfig};
pub use crate::core::runner::{ExperimentRunner, RunSummary};
pub use crate::core::SimError;
pub use evolution::{
    EvolutionConfig, Evolver, GenerationRecord, GenerationReport, RecordFormat, RecordWriter,
};
pub use swarm::{Boid, Flock, FlockConfig, FlockSnapshot, Rule, RuleKind, RuleSet, SpatialIndex};
pub use world::{CellKind, GridConfig, GridWorld, ScenarioError};

/// Initialize tracing for the library.
///
/// `level` is an `EnvFilter` directive such as `"debug"` or
/// `"emberswarm_core=trace"`; defaults to `info`.
pub fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
