// spatial.rs — Static 2-d tree over a point set.
//
// Rebuild: full reconstruction, median split per level via select_nth → O(N log N).
// Queries: radius (sorted by distance) and k-nearest (sorted by distance).
// Used for boid neighbourhoods and for the fire/water tile lookups of a world.

use glam::Vec2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Nearest-neighbour index.  Rebuild every time the point set changes.
///
/// The tree is implicit: `order` is a permutation of point indices where the
/// median of every sub-range `[lo, hi)` sits at `(lo + hi) / 2`, split on x at
/// even depth and on y at odd depth.
#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    points: Vec<Vec2>,
    order: Vec<usize>,
}

/// Max-heap entry for k-nearest search.  Ordered by distance, then index.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    dist_sq: f32,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.index.cmp(&other.index))
    }
}

#[inline(always)]
fn axis_value(p: Vec2, depth: usize) -> f32 {
    if depth % 2 == 0 {
        p.x
    } else {
        p.y
    }
}

impl SpatialIndex {
    /// Build an index over `points`.
    pub fn build(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut index = Self::default();
        index.rebuild(points);
        index
    }

    /// Full rebuild.  Reuses the existing buffers.
    pub fn rebuild(&mut self, points: impl IntoIterator<Item = Vec2>) {
        self.points.clear();
        self.points.extend(points);
        self.order.clear();
        self.order.extend(0..self.points.len());

        let n = self.order.len();
        Self::split(&self.points, &mut self.order, 0, n, 0);
    }

    fn split(points: &[Vec2], order: &mut [usize], lo: usize, hi: usize, depth: usize) {
        if hi - lo <= 1 {
            return;
        }
        let mid = (lo + hi) / 2;
        order[lo..hi].select_nth_unstable_by(mid - lo, |&a, &b| {
            axis_value(points[a], depth).total_cmp(&axis_value(points[b], depth))
        });
        Self::split(points, order, lo, mid, depth + 1);
        Self::split(points, order, mid + 1, hi, depth + 1);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point stored under `index`, as passed to the last rebuild.
    pub fn point(&self, index: usize) -> Vec2 {
        self.points[index]
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Indices of all points within Euclidean distance `r` of `query`,
    /// nearest first.  Ties are broken by index.
    pub fn query_radius(&self, query: Vec2, r: f32) -> Vec<usize> {
        self.query_radius_with_distance(query, r)
            .into_iter()
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Same as `query_radius` but also returns the distance of every hit.
    pub fn query_radius_with_distance(&self, query: Vec2, r: f32) -> Vec<(usize, f32)> {
        let mut hits = Vec::new();
        if self.is_empty() || !(r >= 0.0) {
            return hits;
        }
        self.collect_radius(query, r, r * r, 0, self.order.len(), 0, &mut hits);
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits.into_iter()
            .map(|(idx, dist_sq)| (idx, dist_sq.sqrt()))
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_radius(
        &self,
        query: Vec2,
        r: f32,
        r_sq: f32,
        lo: usize,
        hi: usize,
        depth: usize,
        hits: &mut Vec<(usize, f32)>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = (lo + hi) / 2;
        let idx = self.order[mid];
        let p = self.points[idx];

        let dist_sq = p.distance_squared(query);
        if dist_sq <= r_sq {
            hits.push((idx, dist_sq));
        }

        let diff = axis_value(query, depth) - axis_value(p, depth);
        if diff <= r {
            self.collect_radius(query, r, r_sq, lo, mid, depth + 1, hits);
        }
        if diff >= -r {
            self.collect_radius(query, r, r_sq, mid + 1, hi, depth + 1, hits);
        }
    }

    /// Same as `query_radius` but skips `self_idx`.
    pub fn query_neighbors(&self, self_idx: usize, query: Vec2, r: f32) -> Vec<usize> {
        let mut hits = self.query_radius(query, r);
        hits.retain(|&idx| idx != self_idx);
        hits
    }

    /// The `k` points nearest to `query`, nearest first.
    pub fn query_nearest(&self, query: Vec2, k: usize) -> Vec<usize> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.collect_nearest(query, k, 0, self.order.len(), 0, &mut heap);
        heap.into_sorted_vec().into_iter().map(|c| c.index).collect()
    }

    fn collect_nearest(
        &self,
        query: Vec2,
        k: usize,
        lo: usize,
        hi: usize,
        depth: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = (lo + hi) / 2;
        let idx = self.order[mid];
        let p = self.points[idx];

        heap.push(Candidate {
            dist_sq: p.distance_squared(query),
            index: idx,
        });
        if heap.len() > k {
            heap.pop();
        }

        let diff = axis_value(query, depth) - axis_value(p, depth);
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.collect_nearest(query, k, near.0, near.1, depth + 1, heap);

        // Far side only matters while the heap is short or the splitting
        // plane is closer than the current worst candidate.
        let worst = heap.peek().map_or(f32::INFINITY, |c| c.dist_sq);
        if heap.len() < k || diff * diff <= worst {
            self.collect_nearest(query, k, far.0, far.1, depth + 1, heap);
        }
    }

    /// Nearest point within `r` of `query`, with its distance.
    pub fn nearest_within(&self, query: Vec2, r: f32) -> Option<(usize, f32)> {
        let idx = *self.query_nearest(query, 1).first()?;
        let dist = self.points[idx].distance(query);
        (dist <= r).then_some((idx, dist))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
