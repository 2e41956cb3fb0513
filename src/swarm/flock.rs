use super::boid::Boid;
use super::rule::{Perception, RuleSet};
use super::spatial::SpatialIndex;
use super::FlockConfig;
use crate::core::config::ConfigError;
use crate::world::{CellKind, GridWorld};
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::debug;

/// A group of boids sharing one rule set and one exclusively owned world.
///
/// Each flock carries its own random stream, so flocks can be simulated on
/// separate threads and still replay identically from their seed.
#[derive(Clone, Debug)]
pub struct Flock {
    config: FlockConfig,
    boids: Vec<Boid>,
    rules: RuleSet,
    agent_index: SpatialIndex,
    world: GridWorld,
    rng: ChaCha8Rng,
    tick: u64,
}

/// Read-only picture of a flock between ticks, for display collaborators.
#[derive(Clone, Debug, Serialize)]
pub struct FlockSnapshot {
    pub tick: u64,
    pub width: usize,
    pub height: usize,
    pub fire_count: usize,
    pub cells: Vec<CellKind>,
    pub boids: Vec<Boid>,
}

impl Flock {
    /// Spawn `config.n_boids` boids at random on `world`.
    pub fn new(
        world: GridWorld,
        rules: RuleSet,
        config: FlockConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::spawn(world, rules, config, seed))
    }

    /// Use the given boids instead of spawning random ones.
    pub fn with_boids(
        world: GridWorld,
        rules: RuleSet,
        config: FlockConfig,
        boids: Vec<Boid>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut flock = Self::spawn(world, rules, config, seed);
        flock.boids = boids;
        Ok(flock)
    }

    /// Construction from an already validated config.
    pub(crate) fn spawn(world: GridWorld, rules: RuleSet, config: FlockConfig, seed: u64) -> Self {
        let mut flock = Flock {
            config,
            boids: Vec::new(),
            rules,
            agent_index: SpatialIndex::default(),
            world,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
        };
        flock.respawn_boids();
        flock
    }

    fn respawn_boids(&mut self) {
        let (width, height) = (self.world.width() as f32, self.world.height() as f32);
        let size = self.config.boid_size;
        let rng = &mut self.rng;
        self.boids = (0..self.config.n_boids)
            .map(|_| Boid::random(width, height, size, rng))
            .collect();
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn into_rules(self) -> RuleSet {
        self.rules
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn agent_index(&self) -> &SpatialIndex {
        &self.agent_index
    }

    /// Ticks since construction or the last reset.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance boids and world by one tick.
    pub fn update(&mut self) {
        // 1. Snapshot
        let positions: Vec<Vec2> = self.boids.iter().map(|b| b.position).collect();
        let velocities: Vec<Vec2> = self.boids.iter().map(|b| b.velocity).collect();
        let carrying: Vec<bool> = self.boids.iter().map(|b| b.carrying_water).collect();

        // 2. Rebuild the neighbour index on this tick's positions
        self.agent_index.rebuild(positions.iter().copied());
        let vision = self.config.vision_range;
        let neighbours: Vec<Vec<usize>> = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| self.agent_index.query_neighbors(i, p, vision))
            .collect();

        // 3. Weighted rule forces
        let forces = self.rules.forces(&Perception {
            positions: &positions,
            velocities: &velocities,
            carrying: &carrying,
            neighbours: &neighbours,
            world: &self.world,
            vision_range: vision,
        });

        // 4. Steer, move, interact
        let max_speed = self.config.max_speed;
        for (boid, force) in self.boids.iter_mut().zip(forces) {
            boid.velocity = (boid.velocity + force).clamp_length_max(max_speed);
            if let Some((col, row)) = boid.update(&self.world, &self.config, &mut self.rng) {
                self.world.extinguish(col, row);
            }
        }

        // 5. Fire spreads
        self.world.step(&mut self.rng);
        self.tick += 1;
    }

    /// Run up to `n_iters` ticks and score the result.
    ///
    /// Stops as soon as no fire is left and adds the unused ticks as a bonus,
    /// otherwise returns the world's fitness after the last tick.
    pub fn simulate(&mut self, n_iters: usize) -> f64 {
        for used in 0..n_iters {
            if !self.world.contains_fire() {
                return (n_iters - used) as f64 + self.world.fitness();
            }
            self.update();
        }
        self.world.fitness()
    }

    /// Mean fitness over `reps` simulations.  Every repeat after the first
    /// starts from a fresh copy of `template` with respawned boids.
    pub fn evaluate(&mut self, template: &GridWorld, n_iters: usize, reps: usize) -> f64 {
        let reps = reps.max(1);
        let mut total = 0.0;
        for rep in 0..reps {
            if rep > 0 {
                self.reset(template);
            }
            total += self.simulate(n_iters);
        }
        let fitness = total / reps as f64;
        debug!(
            "🐦 [Flock] Evaluated {} boids over {} reps: fitness={:.2}",
            self.boids.len(),
            reps,
            fitness
        );
        fitness
    }

    /// Restore the world from `template` and respawn every boid.
    pub fn reset(&mut self, template: &GridWorld) {
        self.world.reset_from(template);
        self.respawn_boids();
        self.tick = 0;
    }

    pub fn snapshot(&self) -> FlockSnapshot {
        FlockSnapshot {
            tick: self.tick,
            width: self.world.width(),
            height: self.world.height(),
            fire_count: self.world.fire_count(),
            cells: self.world.cells().to_vec(),
            boids: self.boids.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
