//! Fire World
//!
//! Cellular-automaton landscape the swarm lives on. Trees catch fire from
//! burning neighbours, boids carry water onto fire tiles to put them out.

pub mod cell;
pub mod scenario;

use crate::core::config::ConfigError;
use crate::swarm::spatial::SpatialIndex;
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use cell::CellKind;
pub use scenario::ScenarioError;

/// Per-unit ignition probability applied to the weighted fire neighbourhood.
pub const DEFAULT_IGNITION_SCALE: f64 = 0.001;

/// Ignition kernel over the 8-neighbourhood.  Edge neighbours weigh four
/// times the corners; the centre cell does not count.
const IGNITION_KERNEL: [[u32; 3]; 3] = [[1, 4, 1], [4, 0, 4], [1, 4, 1]];

/// Configuration for world generation
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    /// Burning tiles: a fraction of all tiles when < 1, a count otherwise.
    pub fire_size: f64,
    /// Water tiles: a fraction of all tiles when < 1, a count otherwise.
    pub water_size: f64,
    /// Fill every tile that is neither fire nor water with trees.
    pub forest: bool,
    pub ignition_scale: f64,
    /// Load the world from this scenario file instead of generating it.
    pub scenario: Option<PathBuf>,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            width: 5,
            height: 5,
            fire_size: 1.0,
            water_size: 1.0,
            forest: false,
            ignition_scale: DEFAULT_IGNITION_SCALE,
            scenario: None,
        }
    }
}

impl GridConfig {
    /// Tile count, saturating on absurd dimensions; `validate` rejects those.
    pub fn n_tiles(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Resolve a fire/water size into a tile count.
    pub fn tile_amount(&self, size: f64) -> usize {
        if size < 1.0 {
            (self.n_tiles() as f64 * size).floor() as usize
        } else {
            size as usize
        }
    }

    /// `(available, fire, water)` tile counts for a generated world.
    fn tile_counts(&self) -> Result<(usize, usize, usize), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::invalid("grid", "width and height must be positive"));
        }
        let available = self
            .width
            .checked_mul(self.height)
            .ok_or_else(|| ConfigError::invalid("grid", "width * height overflows"))?;
        let fire = self.tile_amount(self.fire_size);
        let water = self.tile_amount(self.water_size);
        let requested = fire.saturating_add(water);
        if requested > available {
            return Err(ConfigError::TooManyTiles {
                requested,
                available,
            });
        }
        Ok((available, fire, water))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, size) in [("fire_size", self.fire_size), ("water_size", self.water_size)] {
            if !size.is_finite() || size < 0.0 {
                return Err(ConfigError::invalid(field, "must be a finite, non-negative number"));
            }
        }
        if !self.ignition_scale.is_finite() || self.ignition_scale < 0.0 {
            return Err(ConfigError::invalid(
                "ignition_scale",
                "must be a finite, non-negative number",
            ));
        }
        // A scenario file brings its own dimensions and tiles.
        if self.scenario.is_some() {
            return Ok(());
        }
        self.tile_counts().map(|_| ())
    }
}

/// The burning landscape.
///
/// Cells are stored row-major; a position `(x, y)` lies on tile
/// `(col = ⌊x⌋, row = ⌊y⌋)`.  `fire_count` and both tile indexes are kept in
/// step with `cells` by every mutating method.
#[derive(Clone, Debug)]
pub struct GridWorld {
    width: usize,
    height: usize,
    cells: Vec<CellKind>,
    fire_count: usize,
    ignition_scale: f64,
    fire_index: SpatialIndex,
    water_index: SpatialIndex,
}

impl PartialEq for GridWorld {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.cells == other.cells
    }
}

fn tile_centre(col: usize, row: usize) -> Vec2 {
    Vec2::new(col as f32 + 0.5, row as f32 + 0.5)
}

impl GridWorld {
    /// Build a world from row-major cells.
    pub fn from_cells(
        width: usize,
        height: usize,
        cells: Vec<CellKind>,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::invalid("grid", "width and height must be positive"));
        }
        if width.checked_mul(height) != Some(cells.len()) {
            return Err(ConfigError::invalid("grid", "cell count must equal width * height"));
        }
        let mut world = GridWorld {
            width,
            height,
            cells,
            fire_count: 0,
            ignition_scale: DEFAULT_IGNITION_SCALE,
            fire_index: SpatialIndex::default(),
            water_index: SpatialIndex::default(),
        };
        world.fire_count = world.count(CellKind::Fire);
        world.rebuild_fire_index();
        world.rebuild_water_index();
        Ok(world)
    }

    /// A world of the given size where every tile is `kind`.
    pub fn filled(width: usize, height: usize, kind: CellKind) -> Result<Self, ConfigError> {
        let n = width
            .checked_mul(height)
            .ok_or_else(|| ConfigError::invalid("grid", "width * height overflows"))?;
        Self::from_cells(width, height, vec![kind; n])
    }

    /// Procedurally place fire and water tiles on distinct random coordinates.
    pub fn generate<R: Rng + ?Sized>(config: &GridConfig, rng: &mut R) -> Result<Self, ConfigError> {
        config.validate()?;
        let (n_tiles, n_fire, n_water) = config.tile_counts()?;
        let fill = if config.forest {
            CellKind::Tree
        } else {
            CellKind::Barren
        };

        let mut cells = vec![fill; n_tiles];
        let picks = rand::seq::index::sample(rng, n_tiles, n_fire + n_water);
        for (i, idx) in picks.iter().enumerate() {
            cells[idx] = if i < n_fire {
                CellKind::Fire
            } else {
                CellKind::Water
            };
        }

        Ok(Self::from_cells(config.width, config.height, cells)?
            .with_ignition_scale(config.ignition_scale))
    }

    pub fn with_ignition_scale(mut self, ignition_scale: f64) -> Self {
        self.ignition_scale = ignition_scale;
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[CellKind] {
        &self.cells
    }

    pub fn ignition_scale(&self) -> f64 {
        self.ignition_scale
    }

    pub fn cell(&self, col: usize, row: usize) -> CellKind {
        self.cells[row * self.width + col]
    }

    /// Tile under a continuous position, if it lies on the grid.
    pub fn tile_of(&self, pos: Vec2) -> Option<(usize, usize)> {
        if !(pos.x >= 0.0 && pos.y >= 0.0) {
            return None;
        }
        let (col, row) = (pos.x as usize, pos.y as usize);
        (col < self.width && row < self.height).then_some((col, row))
    }

    pub fn cell_at(&self, pos: Vec2) -> Option<CellKind> {
        self.tile_of(pos).map(|(col, row)| self.cell(col, row))
    }

    pub fn count(&self, kind: CellKind) -> usize {
        self.cells.iter().filter(|&&c| c == kind).count()
    }

    pub fn fire_count(&self) -> usize {
        self.fire_count
    }

    pub fn contains_fire(&self) -> bool {
        self.fire_count > 0
    }

    /// Minus the number of burning tiles; 0 once every fire is out.
    pub fn fitness(&self) -> f64 {
        -(self.fire_count as f64)
    }

    pub fn fire_index(&self) -> &SpatialIndex {
        &self.fire_index
    }

    pub fn water_index(&self) -> &SpatialIndex {
        &self.water_index
    }

    /// Centre of the nearest burning tile within `range` of `pos`.
    pub fn nearest_fire(&self, pos: Vec2, range: f32) -> Option<Vec2> {
        self.fire_index
            .nearest_within(pos, range)
            .map(|(idx, _)| self.fire_index.point(idx))
    }

    /// Centre of the nearest water tile within `range` of `pos`.
    pub fn nearest_water(&self, pos: Vec2, range: f32) -> Option<Vec2> {
        self.water_index
            .nearest_within(pos, range)
            .map(|(idx, _)| self.water_index.point(idx))
    }

    // ── Mutation ────────────────────────────────────────────────────────────

    /// Overwrite a single tile, keeping the fire counter and indexes in step.
    pub fn set_cell(&mut self, col: usize, row: usize, kind: CellKind) {
        let idx = row * self.width + col;
        let old = self.cells[idx];
        if old == kind {
            return;
        }
        self.cells[idx] = kind;

        if old == CellKind::Fire {
            self.fire_count -= 1;
        }
        if kind == CellKind::Fire {
            self.fire_count += 1;
        }
        if old == CellKind::Fire || kind == CellKind::Fire {
            self.rebuild_fire_index();
        }
        if old == CellKind::Water || kind == CellKind::Water {
            self.rebuild_water_index();
        }
    }

    /// Turn a burning tile into barren ground.  Any other tile is left alone.
    ///
    /// Returns whether a fire was put out.  The fire index is rebuilt at once,
    /// so later queries in the same tick never see the extinguished tile.
    pub fn extinguish(&mut self, col: usize, row: usize) -> bool {
        if self.cell(col, row) != CellKind::Fire {
            return false;
        }
        self.set_cell(col, row, CellKind::Barren);
        true
    }

    /// Advance the automaton by one synchronous step.
    ///
    /// Every tree draws one uniform number and ignites when its neighbourhood
    /// probability exceeds the draw.  All ignitions are decided on the current
    /// state and applied together.  Returns the number of new fires.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut ignited = Vec::new();

        for row in 0..self.height {
            for col in 0..self.width {
                if self.cell(col, row) != CellKind::Tree {
                    continue;
                }
                let p = self.ignition_scale * self.burning_weight(col, row) as f64;
                let draw: f64 = rng.gen();
                if p > draw {
                    ignited.push(row * self.width + col);
                }
            }
        }

        for &idx in &ignited {
            self.cells[idx] = CellKind::Fire;
        }
        self.fire_count += ignited.len();
        if !ignited.is_empty() {
            self.rebuild_fire_index();
            debug!(
                "🔥 [GridWorld] {} trees ignited, {} tiles burning",
                ignited.len(),
                self.fire_count
            );
        }
        ignited.len()
    }

    fn burning_weight(&self, col: usize, row: usize) -> u32 {
        let mut weight = 0;
        for (dr, kernel_row) in IGNITION_KERNEL.iter().enumerate() {
            for (dc, &w) in kernel_row.iter().enumerate() {
                let (Some(r), Some(c)) = ((row + dr).checked_sub(1), (col + dc).checked_sub(1))
                else {
                    continue;
                };
                if r < self.height && c < self.width && self.cell(c, r) == CellKind::Fire {
                    weight += w;
                }
            }
        }
        weight
    }

    /// Restore this world to the state of `template`, reusing buffers.
    pub fn reset_from(&mut self, template: &GridWorld) {
        self.clone_from(template);
    }

    fn rebuild_fire_index(&mut self) {
        let points = self.tile_centres(CellKind::Fire);
        self.fire_index.rebuild(points);
    }

    fn rebuild_water_index(&mut self) {
        let points = self.tile_centres(CellKind::Water);
        self.water_index.rebuild(points);
    }

    fn tile_centres(&self, kind: CellKind) -> Vec<Vec2> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == kind)
            .map(|(idx, _)| tile_centre(idx % width, idx / width))
            .collect()
    }

    // ── Scenario I/O ────────────────────────────────────────────────────────

    pub fn from_scenario_str(text: &str) -> Result<Self, ScenarioError> {
        let parsed = scenario::parse(text)?;
        Self::from_cells(parsed.cols, parsed.rows, parsed.cells)
            .map_err(|_| ScenarioError::EmptyGrid)
    }

    pub fn to_scenario_string(&self) -> String {
        scenario::render(self.height, self.width, &self.cells)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let world = Self::from_scenario_str(&text)?;
        info!(
            "🗺️ [GridWorld] Loaded {}x{} scenario from {} ({} fires)",
            world.width,
            world.height,
            path.display(),
            world.fire_count
        );
        Ok(world)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScenarioError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_scenario_string())?;
        info!("💾 [GridWorld] Saved scenario to {}", path.display());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn assert_fire_invariant(world: &GridWorld) {
        assert_eq!(world.fire_count(), world.count(CellKind::Fire));
        assert_eq!(world.fire_index().len(), world.fire_count());
        assert!(world.fitness() <= 0.0);
        assert_eq!(world.fitness() == 0.0, world.fire_count() == 0);
    }

    fn forest(width: usize, height: usize) -> GridWorld {
        GridWorld::filled(width, height, CellKind::Tree).unwrap()
    }

    #[test]
    fn lone_fire_without_trees_never_spreads() {
        let mut world = GridWorld::filled(5, 5, CellKind::Barren).unwrap();
        world.set_cell(2, 2, CellKind::Fire);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(world.step(&mut rng), 0);
        }
        assert_eq!(world.fire_count(), 1);
        assert_fire_invariant(&world);
    }

    #[test]
    fn fire_spreads_through_forest() {
        let mut world = forest(10, 10).with_ignition_scale(0.05);
        world.set_cell(5, 5, CellKind::Fire);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..40 {
            world.step(&mut rng);
            assert_fire_invariant(&world);
        }
        assert!(world.fire_count() > 1);
    }

    #[test]
    fn certain_ignition_hits_exactly_the_neighbourhood() {
        // Scale 1.0 makes any burning neighbour a certain ignition.
        let mut world = forest(5, 5).with_ignition_scale(1.0);
        world.set_cell(2, 2, CellKind::Fire);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        assert_eq!(world.step(&mut rng), 8);
        assert_eq!(world.fire_count(), 9);
        assert_eq!(world.cell(0, 0), CellKind::Tree);
        assert_eq!(world.cell(1, 1), CellKind::Fire);
        assert_eq!(world.cell(3, 3), CellKind::Fire);
        assert_fire_invariant(&world);
    }

    #[test]
    fn burning_weight_uses_kernel_and_clips_edges() {
        let mut world = forest(3, 3);
        world.set_cell(0, 0, CellKind::Fire);
        world.set_cell(1, 0, CellKind::Fire);
        assert_eq!(world.burning_weight(1, 1), 1 + 4);
        assert_eq!(world.burning_weight(0, 1), 4 + 1);
        assert_eq!(world.burning_weight(2, 2), 0);
    }

    #[test]
    fn extinguish_only_touches_fire() {
        let mut world = GridWorld::from_scenario_str("1 4\n1230\n").unwrap();
        assert!(!world.extinguish(1, 0));
        assert!(!world.extinguish(2, 0));
        assert!(world.extinguish(0, 0));
        assert!(!world.extinguish(0, 0));
        assert_eq!(world.cell(0, 0), CellKind::Barren);
        assert_eq!(world.cell(1, 0), CellKind::Water);
        assert!(!world.contains_fire());
        assert!(world.nearest_fire(Vec2::new(0.5, 0.5), 10.0).is_none());
        assert_fire_invariant(&world);
    }

    #[test]
    fn generate_places_requested_tiles() {
        let config = GridConfig {
            width: 10,
            height: 10,
            fire_size: 0.05,
            water_size: 3.0,
            forest: true,
            ..GridConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let world = GridWorld::generate(&config, &mut rng).unwrap();

        assert_eq!(world.count(CellKind::Fire), 5);
        assert_eq!(world.count(CellKind::Water), 3);
        assert_eq!(world.count(CellKind::Tree), 92);
        assert_eq!(world.water_index().len(), 3);
        assert_fire_invariant(&world);
    }

    #[test]
    fn generate_defaults_to_barren_ground() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let world = GridWorld::generate(&GridConfig::default(), &mut rng).unwrap();
        assert_eq!(world.count(CellKind::Tree), 0);
        assert_eq!(world.count(CellKind::Barren), 23);
    }

    #[test]
    fn generate_rejects_overfull_grid() {
        let config = GridConfig {
            width: 2,
            height: 2,
            fire_size: 3.0,
            water_size: 2.0,
            ..GridConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        assert!(matches!(
            GridWorld::generate(&config, &mut rng),
            Err(ConfigError::TooManyTiles { requested: 5, available: 4 })
        ));
    }

    #[test]
    fn overflowing_dimensions_are_rejected() {
        assert!(GridWorld::filled(usize::MAX, 2, CellKind::Barren).is_err());
        assert!(GridWorld::from_cells(usize::MAX, 2, vec![CellKind::Barren; 2]).is_err());

        let huge = GridConfig {
            width: usize::MAX,
            height: 2,
            ..GridConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        assert!(matches!(
            GridWorld::generate(&huge, &mut rng),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn scenario_config_skips_tile_checks() {
        let config = GridConfig {
            fire_size: 50.0,
            water_size: 50.0,
            scenario: Some(PathBuf::from("lake.txt")),
            ..GridConfig::default()
        };
        assert!(config.validate().is_ok());

        // Generating from it still refuses the overfull grid.
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert!(matches!(
            GridWorld::generate(&config, &mut rng),
            Err(ConfigError::TooManyTiles { requested: 100, available: 25 })
        ));
    }

    #[test]
    fn scenario_round_trip() {
        let config = GridConfig {
            width: 7,
            height: 4,
            fire_size: 0.2,
            water_size: 0.2,
            forest: true,
            ..GridConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let world = GridWorld::generate(&config, &mut rng).unwrap();

        let text = world.to_scenario_string();
        assert!(text.starts_with("4 7\n"));
        let loaded = GridWorld::from_scenario_str(&text).unwrap();
        assert_eq!(loaded, world);
        assert_eq!(loaded.fire_count(), world.fire_count());
    }

    #[test]
    fn scenario_file_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("lake.txt");
        let world = GridWorld::from_scenario_str("3 3\n333\n321\n333\n")?;
        world.save(&path)?;
        assert_eq!(GridWorld::load(&path)?, world);
        Ok(())
    }

    #[test]
    fn nearest_tiles_respect_range() {
        let world = GridWorld::from_scenario_str("1 6\n200001\n").unwrap();
        let here = Vec2::new(0.2, 0.4);
        assert_eq!(world.nearest_water(here, 1.0), Some(Vec2::new(0.5, 0.5)));
        assert_eq!(world.nearest_fire(here, 2.0), None);
        assert_eq!(world.nearest_fire(here, 10.0), Some(Vec2::new(5.5, 0.5)));
    }

    #[test]
    fn reset_restores_template() {
        let template = GridWorld::from_scenario_str("2 2\n13\n31\n").unwrap();
        let mut world = template.clone();
        world.extinguish(0, 0);
        world.extinguish(1, 1);
        assert!(!world.contains_fire());
        world.reset_from(&template);
        assert_eq!(world, template);
        assert_eq!(world.fire_count(), 2);
    }
}
