//! Random source-parameter table generation.
//!
//! Draws uniform-random parameter vectors per source from a
//! [`ParamRanges`] map. Columns are emitted in map insertion order, and the
//! same seed with the same ranges reproduces the table bit for bit. Without a
//! seed, entropy comes from the process random stream and results are not
//! reproducible.

use indexmap::IndexMap;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, RngCore, SeedableRng};

use crate::models::gaussian_amplitude_from_flux;
use crate::table::SourceTable;

/// Uniform sampler that tolerates degenerate bounds.
///
/// `[lower, upper)` with `lower == upper` pins every draw to that value, and
/// reversed bounds are swapped, so no bound combination can abort sampling.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BoundedUniform {
    Constant(f64),
    Range(Uniform<f64>),
}

impl BoundedUniform {
    pub(crate) fn new(lower: f64, upper: f64) -> Self {
        let (lo, hi) = if lower <= upper {
            (lower, upper)
        } else {
            (upper, lower)
        };
        if lo == hi {
            BoundedUniform::Constant(lo)
        } else {
            BoundedUniform::Range(Uniform::new(lo, hi))
        }
    }

    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            BoundedUniform::Constant(value) => *value,
            BoundedUniform::Range(dist) => dist.sample(rng),
        }
    }
}

/// Ordered mapping from parameter name to an inclusive-exclusive
/// `[lower, upper)` bound.
///
/// One table column is generated per entry, sampled independently and
/// uniformly, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ParamRanges {
    ranges: IndexMap<String, (f64, f64)>,
}

impl ParamRanges {
    /// Create an empty range map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter range, returning `self` for chaining.
    pub fn with(mut self, name: &str, lower: f64, upper: f64) -> Self {
        self.ranges.insert(name.to_string(), (lower, upper));
        self
    }

    /// Add or overwrite a parameter range in place.
    pub fn insert(&mut self, name: &str, lower: f64, upper: f64) {
        self.ranges.insert(name.to_string(), (lower, upper));
    }

    /// Whether a range is defined for this parameter.
    pub fn contains(&self, name: &str) -> bool {
        self.ranges.contains_key(name)
    }

    /// Iterate over `(name, (lower, upper))` entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, (f64, f64))> {
        self.ranges.iter().map(|(name, &bounds)| (name.as_str(), bounds))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Generate a table of random model parameters.
///
/// Each row corresponds to a source; each entry of `param_ranges` becomes one
/// column, with values drawn uniformly over `[lower, upper)`. A zero-width
/// range produces a constant column, and reversed bounds are swapped. A column
/// is generated for every entry even if the rendering model does not use it
/// (such columns are ignored by [`crate::render::make_model_sources_image`]).
///
/// An empty range map is valid and yields an `n_sources`-row table with no
/// columns.
///
/// # Arguments
/// * `n_sources` - Number of rows (sources) to generate
/// * `param_ranges` - Per-parameter bounds, one column per entry
/// * `seed` - Optional seed; identical seed and ranges reproduce the table
pub fn make_random_models_table(
    n_sources: usize,
    param_ranges: &ParamRanges,
    seed: Option<u64>,
) -> SourceTable {
    let seed = seed.unwrap_or_else(|| thread_rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut table = SourceTable::new(n_sources);
    for (name, (lower, upper)) in param_ranges.iter() {
        let dist = BoundedUniform::new(lower, upper);
        let values: Vec<f64> = (0..n_sources).map(|_| dist.sample(&mut rng)).collect();
        // Length always matches the row count by construction
        table
            .set_column(name, values)
            .expect("generated column length matches table rows");
    }
    table
}

/// Generate a table of random 2D Gaussian source parameters.
///
/// Identical to [`make_random_models_table`], with one specialization: if
/// `param_ranges` contains `flux` but not `amplitude`, an `amplitude` column
/// is derived as `flux / (2π σx σy)` and appended, using the per-row
/// `x_stddev`/`y_stddev` columns or a default of 1.0 for any stddev not
/// generated. The `flux` column is kept but is inert for rendering.
///
/// If both `flux` and `amplitude` ranges are given, the generated `amplitude`
/// column is authoritative and `flux` is never used to derive it.
pub fn make_random_gaussians_table(
    n_sources: usize,
    param_ranges: &ParamRanges,
    seed: Option<u64>,
) -> SourceTable {
    let mut sources = make_random_models_table(n_sources, param_ranges, seed);

    if param_ranges.contains("flux") && !param_ranges.contains("amplitude") {
        let flux = sources
            .column("flux")
            .expect("flux column exists for flux range")
            .to_vec();
        let amplitude: Vec<f64> = (0..n_sources)
            .map(|row| {
                let xstd = sources.value("x_stddev", row).unwrap_or(1.0);
                let ystd = sources.value("y_stddev", row).unwrap_or(1.0);
                gaussian_amplitude_from_flux(flux[row], xstd, ystd)
            })
            .collect();
        sources
            .set_column("amplitude", amplitude)
            .expect("derived column length matches table rows");
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn gaussian_ranges() -> ParamRanges {
        ParamRanges::new()
            .with("amplitude", 500.0, 1000.0)
            .with("x_mean", 0.0, 500.0)
            .with("y_mean", 0.0, 300.0)
            .with("x_stddev", 1.0, 5.0)
            .with("y_stddev", 1.0, 5.0)
            .with("theta", 0.0, PI)
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let ranges = gaussian_ranges();
        let a = make_random_models_table(25, &ranges, Some(0));
        let b = make_random_models_table(25, &ranges, Some(0));

        for name in ["amplitude", "x_mean", "y_mean", "x_stddev", "y_stddev", "theta"] {
            assert_eq!(a.column(name).unwrap(), b.column(name).unwrap());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let ranges = gaussian_ranges();
        let a = make_random_models_table(10, &ranges, Some(1));
        let b = make_random_models_table(10, &ranges, Some(2));
        assert_ne!(a.column("x_mean").unwrap(), b.column("x_mean").unwrap());
    }

    #[test]
    fn test_values_within_bounds() {
        let ranges = gaussian_ranges();
        let table = make_random_models_table(200, &ranges, Some(7));
        for (name, (lower, upper)) in ranges.iter() {
            for &value in table.column(name).unwrap() {
                assert!(value >= lower && value < upper, "{name} = {value} out of bounds");
            }
        }
    }

    #[test]
    fn test_column_order_matches_range_order() {
        let ranges = gaussian_ranges();
        let table = make_random_models_table(3, &ranges, Some(0));
        let names: Vec<&str> = table.colnames().collect();
        assert_eq!(
            names,
            vec!["amplitude", "x_mean", "y_mean", "x_stddev", "y_stddev", "theta"]
        );
    }

    #[test]
    fn test_empty_ranges_yield_empty_table() {
        let table = make_random_models_table(8, &ParamRanges::new(), Some(0));
        assert_eq!(table.n_rows(), 8);
        assert_eq!(table.n_columns(), 0);
    }

    #[test]
    fn test_zero_width_range_yields_constant_column() {
        let ranges = ParamRanges::new()
            .with("x_mean", 5.0, 5.0)
            .with("amplitude", 1.0, 2.0);
        let table = make_random_models_table(3, &ranges, Some(0));
        assert_eq!(table.column("x_mean").unwrap(), &[5.0, 5.0, 5.0][..]);
        for &value in table.column("amplitude").unwrap() {
            assert!((1.0..2.0).contains(&value));
        }
    }

    #[test]
    fn test_reversed_bounds_are_swapped() {
        let ranges = ParamRanges::new().with("x_mean", 10.0, 2.0);
        let table = make_random_models_table(50, &ranges, Some(1));
        for &value in table.column("x_mean").unwrap() {
            assert!((2.0..10.0).contains(&value));
        }
    }

    #[test]
    fn test_flux_converted_to_amplitude() {
        let ranges = ParamRanges::new()
            .with("flux", 500.0, 1000.0)
            .with("x_mean", 0.0, 100.0)
            .with("y_mean", 0.0, 100.0)
            .with("x_stddev", 1.0, 5.0)
            .with("y_stddev", 1.0, 5.0);
        let table = make_random_gaussians_table(20, &ranges, Some(3));

        assert!(table.contains_column("flux"));
        assert!(table.contains_column("amplitude"));
        for row in 0..20 {
            let expected = table.value("flux", row).unwrap()
                / (2.0
                    * PI
                    * table.value("x_stddev", row).unwrap()
                    * table.value("y_stddev", row).unwrap());
            assert_relative_eq!(table.value("amplitude", row).unwrap(), expected);
        }
    }

    #[test]
    fn test_flux_conversion_uses_default_stddev() {
        let ranges = ParamRanges::new()
            .with("flux", 100.0, 200.0)
            .with("x_mean", 0.0, 10.0)
            .with("y_mean", 0.0, 10.0);
        let table = make_random_gaussians_table(5, &ranges, Some(3));

        for row in 0..5 {
            let expected = table.value("flux", row).unwrap() / (2.0 * PI);
            assert_relative_eq!(table.value("amplitude", row).unwrap(), expected);
        }
    }

    #[test]
    fn test_amplitude_authoritative_when_both_present() {
        let ranges = ParamRanges::new()
            .with("flux", 500.0, 1000.0)
            .with("amplitude", 1.0, 2.0)
            .with("x_stddev", 1.0, 5.0)
            .with("y_stddev", 1.0, 5.0);
        let table = make_random_gaussians_table(10, &ranges, Some(4));

        // Amplitude stays the drawn uniform value, never derived from flux
        for &value in table.column("amplitude").unwrap() {
            assert!((1.0..2.0).contains(&value));
        }
    }
}
