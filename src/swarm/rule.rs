//! Force Rules
//!
//! Each rule turns what the flock perceives into one steering force per boid.
//! The flock combines them as `Σ weight · force`, and the evolver breeds the
//! weights.

use crate::world::GridWorld;
use glam::Vec2;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard deviation of the Gaussian used when a weight mutates.
pub const DEFAULT_MUTATION_STD: f32 = 0.5;

/// Key of a rule within a rule set; one rule per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    Alignment,
    Cohesion,
    Separation,
    SeekWater,
    SeekFire,
}

impl RuleKind {
    pub const ALL: [RuleKind; 5] = [
        RuleKind::Alignment,
        RuleKind::Cohesion,
        RuleKind::Separation,
        RuleKind::SeekWater,
        RuleKind::SeekFire,
    ];

    /// Column name used in analysis records.
    pub fn label(self) -> &'static str {
        match self {
            RuleKind::Alignment => "Alignment",
            RuleKind::Cohesion => "Cohesion",
            RuleKind::Separation => "Separation",
            RuleKind::SeekWater => "GoToWater",
            RuleKind::SeekFire => "GoToFire",
        }
    }
}

/// The force a rule generates, with its variant-specific parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Behaviour {
    /// Mean velocity of the neighbours.
    Alignment,
    /// Unit vector towards the neighbours' centre, times `strength`.
    Cohesion { strength: f32 },
    /// Unit vector away from the nearest neighbour, times `strength`.
    Separation { strength: f32 },
    /// Empty-handed boids head for the nearest visible water.
    SeekWater,
    /// Boids carrying water head for the nearest visible fire.
    SeekFire,
}

impl Behaviour {
    pub fn kind(&self) -> RuleKind {
        match self {
            Behaviour::Alignment => RuleKind::Alignment,
            Behaviour::Cohesion { .. } => RuleKind::Cohesion,
            Behaviour::Separation { .. } => RuleKind::Separation,
            Behaviour::SeekWater => RuleKind::SeekWater,
            Behaviour::SeekFire => RuleKind::SeekFire,
        }
    }

    /// Default parameters for `kind`.
    pub fn of(kind: RuleKind) -> Self {
        match kind {
            RuleKind::Alignment => Behaviour::Alignment,
            RuleKind::Cohesion => Behaviour::Cohesion { strength: 1.0 },
            RuleKind::Separation => Behaviour::Separation { strength: 1.0 },
            RuleKind::SeekWater => Behaviour::SeekWater,
            RuleKind::SeekFire => Behaviour::SeekFire,
        }
    }

    pub fn strength(&self) -> Option<f32> {
        match self {
            Behaviour::Cohesion { strength } | Behaviour::Separation { strength } => {
                Some(*strength)
            }
            _ => None,
        }
    }
}

/// Everything a rule may look at during one tick.
///
/// `neighbours[i]` holds the other boids within vision range of boid `i`,
/// nearest first.
pub struct Perception<'a> {
    pub positions: &'a [Vec2],
    pub velocities: &'a [Vec2],
    pub carrying: &'a [bool],
    pub neighbours: &'a [Vec<usize>],
    pub world: &'a GridWorld,
    pub vision_range: f32,
}

/// A weighted, evolvable force rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub behaviour: Behaviour,
    pub weight: f32,
    pub mutation_std: f32,
}

impl Rule {
    pub fn new(behaviour: Behaviour, weight: f32) -> Self {
        Rule {
            behaviour,
            weight,
            mutation_std: DEFAULT_MUTATION_STD,
        }
    }

    pub fn of(kind: RuleKind, weight: f32) -> Self {
        Rule::new(Behaviour::of(kind), weight)
    }

    pub fn alignment(weight: f32) -> Self {
        Rule::new(Behaviour::Alignment, weight)
    }

    pub fn cohesion(weight: f32, strength: f32) -> Self {
        Rule::new(Behaviour::Cohesion { strength }, weight)
    }

    pub fn separation(weight: f32, strength: f32) -> Self {
        Rule::new(Behaviour::Separation { strength }, weight)
    }

    pub fn seek_water(weight: f32) -> Self {
        Rule::new(Behaviour::SeekWater, weight)
    }

    pub fn seek_fire(weight: f32) -> Self {
        Rule::new(Behaviour::SeekFire, weight)
    }

    pub fn with_mutation_std(mut self, mutation_std: f32) -> Self {
        self.mutation_std = mutation_std;
        self
    }

    pub fn kind(&self) -> RuleKind {
        self.behaviour.kind()
    }

    /// Unweighted force for every boid in view.
    pub fn apply(&self, view: &Perception) -> Vec<Vec2> {
        let n = view.positions.len();
        match self.behaviour {
            Behaviour::Alignment => (0..n)
                .map(|i| {
                    let neighbours = &view.neighbours[i];
                    if neighbours.is_empty() {
                        return Vec2::ZERO;
                    }
                    let sum: Vec2 = neighbours.iter().map(|&j| view.velocities[j]).sum();
                    sum / neighbours.len() as f32
                })
                .collect(),

            Behaviour::Cohesion { strength } => (0..n)
                .map(|i| {
                    let neighbours = &view.neighbours[i];
                    if neighbours.is_empty() {
                        return Vec2::ZERO;
                    }
                    let sum: Vec2 = neighbours.iter().map(|&j| view.positions[j]).sum();
                    let centre = sum / neighbours.len() as f32;
                    (centre - view.positions[i]).normalize_or_zero() * strength
                })
                .collect(),

            Behaviour::Separation { strength } => (0..n)
                .map(|i| match view.neighbours[i].first() {
                    Some(&nearest) => {
                        (view.positions[i] - view.positions[nearest]).normalize_or_zero()
                            * strength
                    }
                    None => Vec2::ZERO,
                })
                .collect(),

            Behaviour::SeekWater => (0..n)
                .map(|i| {
                    if view.carrying[i] {
                        return Vec2::ZERO;
                    }
                    let pos = view.positions[i];
                    view.world
                        .nearest_water(pos, view.vision_range)
                        .map_or(Vec2::ZERO, |target| (target - pos).normalize_or_zero())
                })
                .collect(),

            Behaviour::SeekFire => (0..n)
                .map(|i| {
                    if !view.carrying[i] {
                        return Vec2::ZERO;
                    }
                    let pos = view.positions[i];
                    view.world
                        .nearest_fire(pos, view.vision_range)
                        .map_or(Vec2::ZERO, |target| (target - pos).normalize_or_zero())
                })
                .collect(),
        }
    }

    /// Child of two rules of the same kind.  Weight and strength are each
    /// taken from a parent chosen by an independent coin flip.
    pub fn crossover<R: Rng + ?Sized>(&self, other: &Rule, rng: &mut R) -> Rule {
        debug_assert_eq!(self.kind(), other.kind());
        let mut pick = |a: f32, b: f32| if rng.gen_bool(0.5) { a } else { b };

        let weight = pick(self.weight, other.weight);
        let behaviour = match (self.behaviour, other.behaviour) {
            (Behaviour::Cohesion { strength: a }, Behaviour::Cohesion { strength: b }) => {
                Behaviour::Cohesion { strength: pick(a, b) }
            }
            (Behaviour::Separation { strength: a }, Behaviour::Separation { strength: b }) => {
                Behaviour::Separation { strength: pick(a, b) }
            }
            (own, _) => own,
        };
        let mutation_std = pick(self.mutation_std, other.mutation_std);

        Rule {
            behaviour,
            weight,
            mutation_std,
        }
    }

    /// Resample the weight from `N(weight, mutation_std)`.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let Ok(normal) = Normal::new(self.weight, self.mutation_std) else {
            return;
        };
        self.weight = normal.sample(rng);
    }
}

/// At most one rule per kind, iterated in kind order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: BTreeMap<RuleKind, Rule>,
}

impl FromIterator<Rule> for RuleSet {
    /// A later rule of the same kind replaces an earlier one.
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut set = RuleSet::default();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// One rule per kind with a weight drawn uniformly from `[lo, hi)`.
    pub fn random<R: Rng + ?Sized>(
        kinds: &[RuleKind],
        (lo, hi): (f32, f32),
        mutation_std: f32,
        rng: &mut R,
    ) -> Self {
        kinds
            .iter()
            .map(|&kind| Rule::of(kind, rng.gen_range(lo..hi)).with_mutation_std(mutation_std))
            .collect()
    }

    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        self.rules.insert(rule.kind(), rule)
    }

    pub fn get(&self, kind: RuleKind) -> Option<&Rule> {
        self.rules.get(&kind)
    }

    pub fn get_mut(&mut self, kind: RuleKind) -> Option<&mut Rule> {
        self.rules.get_mut(&kind)
    }

    pub fn weight(&self, kind: RuleKind) -> Option<f32> {
        self.get(kind).map(|r| r.weight)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn kinds(&self) -> impl Iterator<Item = RuleKind> + '_ {
        self.rules.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Weighted sum of every rule's force, per boid.
    pub fn forces(&self, view: &Perception) -> Vec<Vec2> {
        let mut total = vec![Vec2::ZERO; view.positions.len()];
        for rule in self.rules.values() {
            for (acc, force) in total.iter_mut().zip(rule.apply(view)) {
                *acc += rule.weight * force;
            }
        }
        total
    }

    /// Child rule set over the union of both parents' kinds.  Kinds present
    /// in only one parent are inherited unchanged.
    pub fn crossover<R: Rng + ?Sized>(&self, other: &RuleSet, rng: &mut R) -> RuleSet {
        let mut kinds: Vec<RuleKind> = self.kinds().chain(other.kinds()).collect();
        kinds.sort();
        kinds.dedup();

        kinds
            .into_iter()
            .filter_map(|kind| match (self.get(kind), other.get(kind)) {
                (Some(a), Some(b)) => Some(a.crossover(b, rng)),
                (Some(only), None) | (None, Some(only)) => Some(only.clone()),
                (None, None) => None,
            })
            .collect()
    }

    /// Mutate each rule independently with probability `rate`.
    /// Returns how many rules changed.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f32, rng: &mut R) -> usize {
        let mut mutated = 0;
        for rule in self.rules.values_mut() {
            if rng.gen::<f32>() < rate {
                rule.mutate(rng);
                mutated += 1;
            }
        }
        mutated
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::CellKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Scene {
        positions: Vec<Vec2>,
        velocities: Vec<Vec2>,
        carrying: Vec<bool>,
        neighbours: Vec<Vec<usize>>,
        world: GridWorld,
    }

    impl Scene {
        fn view(&self) -> Perception<'_> {
            Perception {
                positions: &self.positions,
                velocities: &self.velocities,
                carrying: &self.carrying,
                neighbours: &self.neighbours,
                world: &self.world,
                vision_range: 5.0,
            }
        }
    }

    fn three_boids() -> Scene {
        Scene {
            positions: vec![Vec2::new(1.0, 1.0), Vec2::new(3.0, 1.0), Vec2::new(1.0, 4.0)],
            velocities: vec![Vec2::new(1.0, 0.0), Vec2::new(0.0, 2.0), Vec2::new(-1.0, 0.0)],
            carrying: vec![false, true, false],
            // Boid 2 sees nobody.
            neighbours: vec![vec![1], vec![0], vec![]],
            world: GridWorld::filled(10, 10, CellKind::Barren).unwrap(),
        }
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn alignment_averages_neighbour_velocity() {
        let scene = three_boids();
        let forces = Rule::alignment(1.0).apply(&scene.view());
        assert!(close(forces[0], Vec2::new(0.0, 2.0)));
        assert!(close(forces[1], Vec2::new(1.0, 0.0)));
        assert_eq!(forces[2], Vec2::ZERO);
    }

    #[test]
    fn cohesion_and_separation_are_unit_scaled_by_strength() {
        let scene = three_boids();
        let cohesion = Rule::cohesion(1.0, 2.0).apply(&scene.view());
        assert!(close(cohesion[0], Vec2::new(2.0, 0.0)));
        assert_eq!(cohesion[2], Vec2::ZERO);

        let separation = Rule::separation(1.0, 0.5).apply(&scene.view());
        assert!(close(separation[0], Vec2::new(-0.5, 0.0)));
        assert!(close(separation[1], Vec2::new(0.5, 0.0)));
        assert_eq!(separation[2], Vec2::ZERO);
    }

    #[test]
    fn coincident_boids_produce_no_nan() {
        let mut scene = three_boids();
        scene.positions[1] = scene.positions[0];
        let view = scene.view();
        for rule in [Rule::cohesion(1.0, 1.0), Rule::separation(1.0, 1.0)] {
            assert!(rule.apply(&view).iter().all(|f| f.is_finite()));
        }
    }

    #[test]
    fn seek_rules_depend_on_carried_water() {
        let mut scene = three_boids();
        scene.world.set_cell(1, 3, CellKind::Water);
        scene.world.set_cell(6, 1, CellKind::Fire);
        let view = scene.view();

        let water = Rule::seek_water(1.0).apply(&view);
        // Water centre (1.5, 3.5) is straight up-right of boid 0.
        assert!(close(water[0], (Vec2::new(1.5, 3.5) - Vec2::new(1.0, 1.0)).normalize()));
        assert_eq!(water[1], Vec2::ZERO);

        let fire = Rule::seek_fire(1.0).apply(&view);
        assert_eq!(fire[0], Vec2::ZERO);
        assert!(close(fire[1], (Vec2::new(6.5, 1.5) - Vec2::new(3.0, 1.0)).normalize()));
        assert_eq!(fire[2], Vec2::ZERO);
    }

    #[test]
    fn seek_fire_ignores_fire_out_of_range() {
        let mut scene = three_boids();
        scene.world.set_cell(9, 9, CellKind::Fire);
        let fire = Rule::seek_fire(1.0).apply(&scene.view());
        assert_eq!(fire[1], Vec2::ZERO);
    }

    #[test]
    fn forces_are_weighted_sums() {
        let scene = three_boids();
        let view = scene.view();
        let rules: RuleSet = [Rule::alignment(2.0), Rule::separation(-1.0, 1.0)]
            .into_iter()
            .collect();
        let forces = rules.forces(&view);
        assert!(close(forces[0], Vec2::new(0.0, 4.0) + Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn crossover_picks_a_parent_weight() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let a: RuleSet = [Rule::alignment(2.0)].into_iter().collect();
        let b: RuleSet = [Rule::alignment(-2.0)].into_iter().collect();
        let mut seen = [false; 2];
        for _ in 0..200 {
            let child = a.crossover(&b, &mut rng);
            assert_eq!(child.len(), 1);
            let w = child.weight(RuleKind::Alignment).unwrap();
            assert!(w == 2.0 || w == -2.0, "unexpected weight {}", w);
            seen[(w > 0.0) as usize] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn crossover_takes_union_of_kinds() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let a: RuleSet = [Rule::alignment(1.0), Rule::cohesion(0.5, 3.0)].into_iter().collect();
        let b: RuleSet = [Rule::alignment(1.0), Rule::seek_fire(-1.0)].into_iter().collect();
        let child = a.crossover(&b, &mut rng);
        assert_eq!(
            child.kinds().collect::<Vec<_>>(),
            vec![RuleKind::Alignment, RuleKind::Cohesion, RuleKind::SeekFire]
        );
        assert_eq!(child.get(RuleKind::Cohesion), a.get(RuleKind::Cohesion));
        assert_eq!(child.weight(RuleKind::SeekFire), Some(-1.0));
    }

    #[test]
    fn mutation_rate_gates_changes() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let original = RuleSet::random(&RuleKind::ALL, (-1.0, 3.0), 0.5, &mut rng);

        let mut frozen = original.clone();
        assert_eq!(frozen.mutate(0.0, &mut rng), 0);
        assert_eq!(frozen, original);

        let mut mutated = original.clone();
        assert_eq!(mutated.mutate(1.0, &mut rng), 5);
        assert!(original
            .iter()
            .zip(mutated.iter())
            .all(|(a, b)| a.weight != b.weight));
    }

    #[test]
    fn random_weights_fall_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        for _ in 0..50 {
            let set = RuleSet::random(&RuleKind::ALL, (-1.0, 3.0), 0.5, &mut rng);
            assert_eq!(set.len(), 5);
            assert!(set.iter().all(|r| (-1.0..3.0).contains(&r.weight)));
        }
    }
}
