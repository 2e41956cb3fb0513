//! Population Engine
//!
//! Holds a fixed-size population of flocks, each with its own copy of the
//! template world.  One `evolve()` call is one generation: evaluate, select,
//! cross over, mutate, replace.

use super::record::GenerationRecord;
use super::EvolutionConfig;
use crate::core::config::ConfigError;
use crate::swarm::rule::RuleSet;
use crate::swarm::{Flock, FlockConfig};
use crate::world::GridWorld;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{info, warn};

/// Outcome of one completed generation.
#[derive(Clone, Debug)]
pub struct GenerationReport {
    /// Index of the generation that was evaluated.
    pub generation: u32,
    pub fitness: Vec<f64>,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub best_rules: RuleSet,
    pub records: Vec<GenerationRecord>,
}

/// Genetic search over flock rule weights
pub struct Evolver {
    config: EvolutionConfig,
    flock_config: FlockConfig,
    template: GridWorld,
    population: Vec<Flock>,
    fitness: Option<Vec<f64>>,
    best: Option<(RuleSet, f64)>,
    generation: u32,
    rng: ChaCha8Rng,
}

/// Selection probabilities from raw fitness.
///
/// Each score becomes `(f - min + 1)^2`, then the vector is normalised.
/// Falls back to uniform when any score is not finite.
pub fn selection_weights(fitness: &[f64]) -> Vec<f64> {
    if fitness.is_empty() {
        return Vec::new();
    }
    let uniform = vec![1.0 / fitness.len() as f64; fitness.len()];
    if fitness.iter().any(|f| !f.is_finite()) {
        warn!("⚠️ [Evolver] Non-finite fitness, selecting parents uniformly");
        return uniform;
    }

    let min = fitness.iter().copied().fold(f64::INFINITY, f64::min);
    let raw: Vec<f64> = fitness.iter().map(|f| (f - min + 1.0).powi(2)).collect();
    let total: f64 = raw.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return uniform;
    }
    raw.into_iter().map(|w| w / total).collect()
}

impl Evolver {
    /// Build generation 0: random weights in the configured range, one fresh
    /// copy of `template` per flock.
    pub fn new(
        template: GridWorld,
        config: EvolutionConfig,
        flock_config: FlockConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        flock_config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let population = (0..config.population_size)
            .map(|_| {
                let rules = RuleSet::random(
                    &config.rules,
                    config.initial_weight_range,
                    config.mutation_std,
                    &mut rng,
                );
                Flock::spawn(template.clone(), rules, flock_config.clone(), rng.gen())
            })
            .collect();

        info!(
            "🧬 [Evolver] Initialized (pop_size={}, mutation={:.2}, rules={}, grid={}x{})",
            config.population_size,
            config.mutation_rate,
            config.rules.len(),
            template.width(),
            template.height()
        );

        Ok(Evolver {
            config,
            flock_config,
            template,
            population,
            fitness: None,
            best: None,
            generation: 0,
            rng,
        })
    }

    pub fn population(&self) -> &[Flock] {
        &self.population
    }

    /// Completed generations.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn template(&self) -> &GridWorld {
        &self.template
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Fitness of the current population, if it has been evaluated.
    pub fn fitness(&self) -> Option<&[f64]> {
        self.fitness.as_deref()
    }

    /// Highest-fitness rule set of the most recent evaluation.
    pub fn best(&self) -> Option<(&RuleSet, f64)> {
        self.best.as_ref().map(|(rules, f)| (rules, *f))
    }

    /// Score every flock of the current generation.
    ///
    /// Flocks run in parallel; each owns its world and random stream, so the
    /// scores do not depend on scheduling.  Repeated calls within one
    /// generation return the cached scores.
    pub fn evaluate(&mut self) -> Vec<f64> {
        if let Some(fitness) = &self.fitness {
            return fitness.clone();
        }

        let template = &self.template;
        let (n_iters, reps) = (self.config.n_iters, self.config.reps);
        let fitness: Vec<f64> = self
            .population
            .par_iter_mut()
            .map(|flock| flock.evaluate(template, n_iters, reps))
            .collect();

        self.best = fitness
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, &f)| (self.population[i].rules().clone(), f));
        self.fitness = Some(fitness.clone());
        fitness
    }

    /// Analysis rows for the current population.  Evaluates first if needed.
    pub fn records(&mut self) -> Vec<GenerationRecord> {
        let fitness = self.evaluate();
        self.population
            .iter()
            .zip(&fitness)
            .enumerate()
            .map(|(member, (flock, &f))| {
                GenerationRecord::from_rules(
                    self.config.observation,
                    self.generation,
                    member,
                    flock.rules(),
                    f,
                )
            })
            .collect()
    }

    /// Run one full generation and replace the population with its children.
    pub fn evolve(&mut self) -> GenerationReport {
        let records = self.records();
        let fitness = self.evaluate();
        let probabilities = selection_weights(&fitness);

        let size = self.config.population_size;
        let picker = WeightedIndex::new(&probabilities).ok();
        let pick = |rng: &mut ChaCha8Rng| match &picker {
            Some(dist) => dist.sample(rng),
            None => rng.gen_range(0..size),
        };

        let mut children = Vec::with_capacity(size);
        for _ in 0..size {
            let a = pick(&mut self.rng);
            let b = pick(&mut self.rng);
            let mut rules = self.population[a]
                .rules()
                .crossover(self.population[b].rules(), &mut self.rng);
            rules.mutate(self.config.mutation_rate, &mut self.rng);
            let seed = self.rng.gen();
            children.push(Flock::spawn(
                self.template.clone(),
                rules,
                self.flock_config.clone(),
                seed,
            ));
        }

        let (best_rules, best_fitness) = match &self.best {
            Some((rules, f)) => (rules.clone(), *f),
            None => (RuleSet::new(), f64::NEG_INFINITY),
        };
        let mean_fitness = fitness.iter().sum::<f64>() / fitness.len() as f64;

        info!(
            "🏆 [Evolver] Generation {} best={:.2} mean={:.2}",
            self.generation, best_fitness, mean_fitness
        );

        let report = GenerationReport {
            generation: self.generation,
            fitness,
            best_fitness,
            mean_fitness,
            best_rules,
            records,
        };

        self.population = children;
        self.fitness = None;
        self.generation += 1;
        report
    }
}
