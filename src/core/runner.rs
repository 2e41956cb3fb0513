//! Experiment Runner
//!
//! Wires a `SimConfig` into a template world and an evolver, then drives
//! generations until the budget runs out or the fitness target is met.
//! Every generation's analysis records go to the supplied writer.

use super::config::SimConfig;
use super::SimError;
use crate::evolution::{Evolver, RecordWriter};
use crate::swarm::rule::RuleSet;
use crate::world::GridWorld;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::io::Write;
use tracing::info;

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    /// Generations actually evolved.
    pub generations: u32,
    pub best_fitness: f64,
    pub best_rules: RuleSet,
}

pub struct ExperimentRunner {
    config: SimConfig,
    evolver: Evolver,
}

impl ExperimentRunner {
    pub fn from_config(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let world = match &config.grid.scenario {
            Some(path) => GridWorld::load(path)?.with_ignition_scale(config.grid.ignition_scale),
            None => GridWorld::generate(&config.grid, &mut rng)?,
        };
        info!(
            "🚀 [Runner] Template world {}x{} with {} fires (seed={})",
            world.width(),
            world.height(),
            world.fire_count(),
            config.seed
        );

        let evolver = Evolver::new(
            world,
            config.evolution.clone(),
            config.flock.clone(),
            rng.gen(),
        )?;
        Ok(ExperimentRunner { config, evolver })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn evolver(&self) -> &Evolver {
        &self.evolver
    }

    /// Evolve until `generations` are done or the best fitness of a
    /// generation reaches `fitness_target`.
    pub fn run<W: Write>(&mut self, writer: &mut RecordWriter<W>) -> Result<RunSummary, SimError> {
        let budget = self.config.evolution.generations;
        let target = self.config.evolution.fitness_target;

        let mut summary = RunSummary {
            generations: 0,
            best_fitness: f64::NEG_INFINITY,
            best_rules: RuleSet::new(),
        };

        for _ in 0..budget {
            let report = self.evolver.evolve();
            writer.write_all(&report.records)?;
            summary.generations += 1;

            if report.best_fitness > summary.best_fitness {
                summary.best_fitness = report.best_fitness;
                summary.best_rules = report.best_rules;
            }
            if target.is_some_and(|t| report.best_fitness >= t) {
                info!(
                    "🎯 [Runner] Fitness target reached in generation {} ({:.2})",
                    report.generation, report.best_fitness
                );
                break;
            }
        }

        info!(
            "✅ [Runner] Finished after {} generations, best fitness {:.2}",
            summary.generations, summary.best_fitness
        );
        Ok(summary)
    }
}
