//! Measurement-noise synthesis for simulated images.
//!
//! Two independent operations: applying Poisson photon-arrival statistics to
//! an existing mean-intensity array, and generating a standalone Gaussian or
//! Poisson noise image of a given shape. Both accept an optional seed; with a
//! seed the output is fully reproducible, without one it draws fresh process
//! entropy.

use std::str::FromStr;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{thread_rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use thiserror::Error;

/// Errors from noise generation.
#[derive(Error, Debug)]
pub enum NoiseError {
    /// A Poisson rate (intensity value or mean) was negative.
    #[error("Poisson rate must be >= 0, got {value} at pixel ({row}, {col})")]
    NegativeRate {
        /// The offending value.
        value: f64,
        /// Row of the offending pixel.
        row: usize,
        /// Column of the offending pixel.
        col: usize,
    },

    /// The requested Poisson mean was negative.
    #[error("Poisson mean must be >= 0, got {mean}")]
    NegativeMean {
        /// The requested mean.
        mean: f64,
    },

    /// `mean` was not supplied.
    #[error("'mean' is required for noise generation")]
    MissingMean,

    /// `stddev` was not supplied for Gaussian noise.
    #[error("'stddev' is required for Gaussian noise")]
    MissingStddev,

    /// The Gaussian standard deviation was not usable.
    #[error("invalid Gaussian stddev: {stddev}")]
    InvalidStddev {
        /// The rejected standard deviation.
        stddev: f64,
    },

    /// The distribution selector was not one of the supported names.
    #[error("invalid distribution '{name}': use either 'gaussian' or 'poisson'")]
    UnknownDistribution {
        /// The unrecognized selector.
        name: String,
    },
}

/// Noise distribution selector for [`make_noise_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseDistribution {
    /// Gaussian noise; requires a mean and a standard deviation.
    Gaussian,
    /// Poisson noise; requires only a mean, which is used as the rate
    /// (the variance of a Poisson distribution equals its mean).
    Poisson,
}

impl FromStr for NoiseDistribution {
    type Err = NoiseError;

    fn from_str(name: &str) -> Result<Self, NoiseError> {
        match name {
            "gaussian" => Ok(NoiseDistribution::Gaussian),
            "poisson" => Ok(NoiseDistribution::Poisson),
            other => Err(NoiseError::UnknownDistribution {
                name: other.to_string(),
            }),
        }
    }
}

/// Apply Poisson noise to an intensity array.
///
/// Each output pixel is one draw from a Poisson distribution whose rate is
/// the corresponding input pixel. Every input value must be non-negative; a
/// zero rate always yields zero.
///
/// # Arguments
/// * `data` - Mean counts per pixel, all values `>= 0`
/// * `seed` - Optional seed for reproducible sampling
pub fn apply_poisson_noise(
    data: &Array2<f64>,
    seed: Option<u64>,
) -> Result<Array2<f64>, NoiseError> {
    if let Some(((row, col), &value)) = data.indexed_iter().find(|&(_, &v)| v < 0.0) {
        return Err(NoiseError::NegativeRate { value, row, col });
    }

    let seed = seed.unwrap_or_else(|| thread_rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut noisy = data.clone();
    for pixel in noisy.iter_mut() {
        if *pixel > 0.0 {
            let poisson =
                Poisson::new(*pixel).expect("rate is positive and finite after validation");
            *pixel = poisson.sample(&mut rng);
        }
        // Zero rate means zero counts; leave the pixel as-is.
    }
    Ok(noisy)
}

/// Generate a standalone noise image.
///
/// For [`NoiseDistribution::Gaussian`], both `mean` and `stddev` are
/// required. For [`NoiseDistribution::Poisson`], `mean` is used as the rate
/// and `stddev` is ignored.
///
/// # Arguments
/// * `shape` - Output `(rows, cols)` shape
/// * `distribution` - Which distribution to draw from
/// * `mean` - Mean of the distribution; required
/// * `stddev` - Standard deviation; required for Gaussian, ignored for Poisson
/// * `seed` - Optional seed for reproducible sampling
pub fn make_noise_image(
    shape: (usize, usize),
    distribution: NoiseDistribution,
    mean: Option<f64>,
    stddev: Option<f64>,
    seed: Option<u64>,
) -> Result<Array2<f64>, NoiseError> {
    let mean = mean.ok_or(NoiseError::MissingMean)?;
    let seed = seed.unwrap_or_else(|| thread_rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);

    match distribution {
        NoiseDistribution::Gaussian => {
            let stddev = stddev.ok_or(NoiseError::MissingStddev)?;
            let normal =
                Normal::new(mean, stddev).map_err(|_| NoiseError::InvalidStddev { stddev })?;
            Ok(Array2::from_shape_fn(shape, |_| normal.sample(&mut rng)))
        }
        NoiseDistribution::Poisson => {
            if mean < 0.0 {
                return Err(NoiseError::NegativeMean { mean });
            }
            if mean == 0.0 {
                return Ok(Array2::zeros(shape));
            }
            let poisson = Poisson::new(mean).expect("mean is positive and finite");
            Ok(Array2::from_shape_fn(shape, |_| poisson.sample(&mut rng)))
        }
    }
}
