//! Evolution Layer
//!
//! Breeds flock rule weights with a generational genetic algorithm:
//! evaluate every flock by simulation, pick parents in proportion to
//! transformed fitness, cross over their rule sets and mutate the children.

pub mod population;
pub mod record;


use crate::core::config::ConfigError;
use crate::swarm::rule::{RuleKind, DEFAULT_MUTATION_STD};
use serde::{Deserialize, Serialize};

pub use population::{Evolver, GenerationReport};
pub use record::{GenerationRecord, RecordFormat, RecordWriter};

/// Configuration for rule-weight evolution
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    /// Per-rule probability of mutating a child's weight.
    pub mutation_rate: f32,
    pub mutation_std: f32,
    /// Generation-0 weights are drawn uniformly from `[lo, hi)`.
    pub initial_weight_range: (f32, f32),
    /// Ticks per fitness simulation.
    pub n_iters: usize,
    /// Simulations averaged per flock and generation.
    pub reps: usize,
    /// Generations run by the experiment runner.
    pub generations: u32,
    /// Stop the experiment runner once the best fitness reaches this value.
    pub fitness_target: Option<f64>,
    pub rules: Vec<RuleKind>,
    /// Run identifier written into every analysis record.
    pub observation: u32,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            population_size: 10,
            mutation_rate: 0.1,
            mutation_std: DEFAULT_MUTATION_STD,
            initial_weight_range: (-1.0, 3.0),
            n_iters: 100,
            reps: 1,
            generations: 10,
            fitness_target: None,
            rules: RuleKind::ALL.to_vec(),
            observation: 0,
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::invalid("population_size", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::invalid("mutation_rate", "must lie in [0, 1]"));
        }
        if !self.mutation_std.is_finite() || self.mutation_std < 0.0 {
            return Err(ConfigError::invalid(
                "mutation_std",
                "must be a finite, non-negative number",
            ));
        }
        let (lo, hi) = self.initial_weight_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(ConfigError::invalid(
                "initial_weight_range",
                "must be a finite range with lo < hi",
            ));
        }
        if self.reps == 0 {
            return Err(ConfigError::invalid("reps", "must be positive"));
        }
        if self.rules.is_empty() {
            return Err(ConfigError::invalid("rules", "at least one rule is required"));
        }
        let mut kinds = self.rules.clone();
        kinds.sort();
        kinds.dedup();
        if kinds.len() != self.rules.len() {
            return Err(ConfigError::invalid("rules", "each rule kind may appear only once"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_catches_bad_values() {
        assert!(EvolutionConfig::default().validate().is_ok());

        let cases = [
            EvolutionConfig { population_size: 0, ..Default::default() },
            EvolutionConfig { mutation_rate: -0.1, ..Default::default() },
            EvolutionConfig { mutation_std: f32::NAN, ..Default::default() },
            EvolutionConfig { initial_weight_range: (3.0, -1.0), ..Default::default() },
            EvolutionConfig { reps: 0, ..Default::default() },
            EvolutionConfig { rules: Vec::new(), ..Default::default() },
            EvolutionConfig {
                rules: vec![RuleKind::Cohesion, RuleKind::Cohesion],
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "accepted {:?}", config);
        }
    }
}
