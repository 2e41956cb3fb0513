use super::FlockConfig;
use crate::world::{CellKind, GridWorld};
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// After a bounce the boid takes an extra step of this many `dt`s.
const BOUNCE_STEP_FACTOR: f32 = 2.0;

/// A single fire-fighting boid.
///
/// The flock writes the velocity; the boid only integrates it and reacts to
/// the tile it lands on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Boid {
    pub position: Vec2,
    pub velocity: Vec2,
    pub carrying_water: bool,
    pub size: f32,
}

/// Largest float strictly below a positive, finite `limit`.
fn just_below(limit: f32) -> f32 {
    f32::from_bits(limit.to_bits() - 1)
}

impl Boid {
    pub fn new(position: Vec2, velocity: Vec2, size: f32) -> Self {
        Boid {
            position,
            velocity,
            carrying_water: false,
            size,
        }
    }

    /// Uniform position on the grid, velocity uniform in `[-1, 1]²`.
    pub fn random<R: Rng + ?Sized>(width: f32, height: f32, size: f32, rng: &mut R) -> Self {
        let position = Vec2::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height));
        let velocity = Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
        Boid::new(position, velocity, size)
    }

    /// Reflect off the grid border.
    ///
    /// Every axis outside `[0, limit)` has its velocity component flipped, the
    /// boid takes a corrective step and is clamped back onto the grid.
    /// Returns whether it bounced.
    pub fn handle_border(&mut self, width: f32, height: f32, dt: f32) -> bool {
        let mut bounced = false;
        if !(0.0..width).contains(&self.position.x) {
            self.velocity.x = -self.velocity.x;
            bounced = true;
        }
        if !(0.0..height).contains(&self.position.y) {
            self.velocity.y = -self.velocity.y;
            bounced = true;
        }

        if bounced {
            self.position += self.velocity * (BOUNCE_STEP_FACTOR * dt);
            self.position.x = self.position.x.clamp(0.0, just_below(width));
            self.position.y = self.position.y.clamp(0.0, just_below(height));
        }
        bounced
    }

    /// Move one tick and interact with the tile underneath.
    ///
    /// The world is only read here.  When the boid drops its water on a fire,
    /// the burning tile is returned and the caller extinguishes it.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        world: &GridWorld,
        config: &FlockConfig,
        rng: &mut R,
    ) -> Option<(usize, usize)> {
        self.position += self.velocity * config.dt;
        let bounced = self.handle_border(world.width() as f32, world.height() as f32, config.dt);

        if !bounced
            && !self.carrying_water
            && rng.gen::<f32>() < config.pickup_chance
            && world.cell_at(self.position) == Some(CellKind::Water)
        {
            self.carrying_water = true;
        }

        if self.carrying_water {
            if let Some((col, row)) = world.tile_of(self.position) {
                if world.cell(col, row) == CellKind::Fire {
                    self.carrying_water = false;
                    return Some((col, row));
                }
            }
        }
        None
    }
}
