//! Rejection sampling of non-overlapping source coordinates.
//!
//! Draws uniform 2D coordinates and keeps only those whose nearest-other
//! distance satisfies a minimum separation, iterating in rounds until enough
//! points are accepted or a hard round cap is hit. The cap bounds the cost
//! when the requested packing is impossible for the given area.

use rand::rngs::StdRng;
use rand::{thread_rng, RngCore, SeedableRng};

use crate::random_table::BoundedUniform;
use crate::spatial::KdTree2;

/// Maximum number of rejection-sampling rounds before giving up.
const MAX_ITERATIONS: usize = 20;

/// The result of non-overlap coordinate sampling.
///
/// Holds up to the requested number of `(x, y)` pairs, all with pairwise
/// Euclidean separation at or above the requested minimum. When the round cap
/// was reached first, fewer coordinates are returned; callers should check
/// [`is_complete`](Self::is_complete) or compare [`len`](Self::len) against
/// [`requested`](Self::requested).
#[derive(Debug, Clone)]
pub struct NonOverlapCoords {
    coords: Vec<(f64, f64)>,
    requested: usize,
}

impl NonOverlapCoords {
    /// Accepted coordinates, in acceptance order.
    pub fn coords(&self) -> &[(f64, f64)] {
        &self.coords
    }

    /// Number of accepted coordinates.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Whether no coordinates were accepted.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// The count originally requested.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Whether the full requested count was produced.
    pub fn is_complete(&self) -> bool {
        self.coords.len() == self.requested
    }

    /// Consume the result, yielding the coordinate vector.
    pub fn into_vec(self) -> Vec<(f64, f64)> {
        self.coords
    }
}

/// Sample up to `n_coords` coordinates with pairwise separation
/// `>= min_separation`.
///
/// Each round draws `n_coords` fresh uniform candidates over
/// `x_range × y_range`, appends them to the accepted pool, and discards every
/// point whose nearest-other distance falls below `min_separation`. After 20
/// rounds the pool is returned as-is (truncated to `n_coords`); a shortfall
/// is logged as a warning, not reported as an error.
///
/// Identical seeds produce identical accepted sets and ordering. Ranges are
/// half-open, matching the uniform draws elsewhere in this crate; a zero-width
/// range pins that axis to its constant value.
pub fn make_nonoverlap_coords(
    x_range: (f64, f64),
    y_range: (f64, f64),
    n_coords: usize,
    min_separation: f64,
    seed: Option<u64>,
) -> NonOverlapCoords {
    let seed = seed.unwrap_or_else(|| thread_rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);

    let x_dist = BoundedUniform::new(x_range.0, x_range.1);
    let y_dist = BoundedUniform::new(y_range.0, y_range.1);

    let mut pool: Vec<(f64, f64)> = Vec::new();

    let mut niter = 1;
    while pool.len() < n_coords && niter <= MAX_ITERATIONS {
        let xs: Vec<f64> = (0..n_coords).map(|_| x_dist.sample(&mut rng)).collect();
        let ys: Vec<f64> = (0..n_coords).map(|_| y_dist.sample(&mut rng)).collect();
        pool.extend(xs.into_iter().zip(ys));

        if let Some(tree) = KdTree2::build(&pool) {
            let distances = tree.nearest_other_distances();
            pool = pool
                .into_iter()
                .zip(distances)
                .filter(|&(_, dist)| dist >= min_separation)
                .map(|(point, _)| point)
                .collect();
        }
        niter += 1;
    }

    pool.truncate(n_coords);
    if pool.len() < n_coords {
        log::warn!(
            "unable to produce {} non-overlapping coordinates (got {}) with min separation {} \
             after {} rounds",
            n_coords,
            pool.len(),
            min_separation,
            MAX_ITERATIONS,
        );
    }

    NonOverlapCoords {
        coords: pool,
        requested: n_coords,
    }
}
