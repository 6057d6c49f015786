//! Synthetic astronomical source images and total-error maps.
//!
//! This crate generates reference images from parametric source models with
//! known ground truth (positions, fluxes, shapes) for validating photometry
//! algorithms, and combines background-noise estimates with source shot noise
//! into per-pixel uncertainty maps.
//!
//! All operations are single-threaded and deterministic given an explicit
//! seed. When no seed is supplied, fresh entropy is pulled from the process
//! random stream and results are not reproducible.

pub mod coords;
pub mod models;
pub mod noise;
pub mod random_table;
pub mod render;
pub mod scenes;
pub mod spatial;
pub mod table;
pub mod total_error;
pub mod units;

// Re-exports for easier access
pub use coords::{make_nonoverlap_coords, NonOverlapCoords};
pub use models::{
    gaussian_amplitude_from_flux, prf_flux_from_amplitude, Gaussian2D, IntegratedGaussianPrf,
    Moffat2D, SourceModel,
};
pub use noise::{apply_poisson_noise, make_noise_image, NoiseDistribution};
pub use random_table::{make_random_gaussians_table, make_random_models_table, ParamRanges};
pub use render::{
    make_gaussian_prf_sources_image, make_gaussian_sources_image, make_model_sources_image,
};
pub use scenes::{make_100gaussians_image, make_4gaussians_image, make_test_psf_data};
pub use table::SourceTable;
pub use total_error::{calc_total_error, EffectiveGain};
pub use units::{QuantityArray, Unit};
