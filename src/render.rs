//! Rendering of parametric sources onto a pixel grid.
//!
//! The generic renderer substitutes each table row's parameters into a
//! borrowed [`SourceModel`], evaluates it over the output grid, and sums the
//! contributions. The model's parameter state is captured before the first
//! source and restored on every exit path, so a failed render never leaks
//! mutated parameters.
//!
//! Two discretization modes are supported: pixel-center sampling
//! (`oversample = 1`, fast but not flux-conserving for sub-pixel sources) and
//! oversampled averaging over a `k×k` sub-grid per pixel (`oversample > 1`).

use ndarray::Array2;
use thiserror::Error;

use crate::models::{
    gaussian_amplitude_from_flux, prf_flux_from_amplitude, Gaussian2D, IntegratedGaussianPrf,
    ModelError, SourceModel,
};
use crate::table::{SourceTable, TableError};

/// Errors from source rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The oversampling factor must be at least 1.
    #[error("oversampling factor must be >= 1, got 0")]
    ZeroOversample,

    /// A PSF evaluation window must span at least one pixel per axis.
    #[error("psf window shape must be at least (1, 1), got ({rows}, {cols})")]
    EmptyPsfWindow {
        /// Requested window rows.
        rows: usize,
        /// Requested window columns.
        cols: usize,
    },

    /// A per-source parameter assignment failed.
    #[error("failed to assign source parameters: {0}")]
    Model(#[from] ModelError),

    /// A derived column could not be attached to the working table.
    #[error("failed to derive table column: {0}")]
    Table(#[from] TableError),
}

/// Render an image of model sources by superposition.
///
/// For each table row, the columns whose names match model parameters are
/// substituted into `model` and the model is evaluated over the whole output
/// grid; contributions from all sources are added (sources may overlap).
/// Table columns the model does not recognize are ignored, and model
/// parameters without a table column keep their current values.
///
/// With `oversample = 1` the model is sampled once per pixel at the integer
/// pixel center. This does not preserve the total flux of very small sources;
/// that bias is intentional and kept stable. With `oversample > 1` each pixel
/// is the average of an `oversample × oversample` sub-grid over the same
/// extents, approximating the pixel-integrated value at `k²` times the cost.
///
/// The model's parameter state is restored before this function returns,
/// whether it succeeds or fails. On failure no partial image is returned.
///
/// # Arguments
/// * `shape` - Output `(rows, cols)` shape
/// * `model` - Borrowed model; parameters are temporarily overridden per source
/// * `source_table` - One row per source
/// * `oversample` - Sub-samples per pixel edge, `>= 1`
pub fn make_model_sources_image<M: SourceModel>(
    shape: (usize, usize),
    model: &mut M,
    source_table: &SourceTable,
    oversample: usize,
) -> Result<Array2<f64>, RenderError> {
    if oversample == 0 {
        return Err(RenderError::ZeroOversample);
    }

    let params_to_set: Vec<String> = source_table
        .colnames()
        .filter(|name| model.has_parameter(name))
        .map(str::to_string)
        .collect();

    // Acquire: capture the model's live parameter values so they can be put
    // back no matter how the render finishes.
    let saved: Vec<(String, f64)> = params_to_set
        .iter()
        .map(|name| {
            let value = model
                .parameter(name)
                .expect("captured parameters exist on the model");
            (name.clone(), value)
        })
        .collect();

    let mut image = Array2::<f64>::zeros(shape);
    let outcome = render_sources(&mut image, model, source_table, &params_to_set, oversample);

    // Restore unconditionally; names and values came from the model itself,
    // so reassignment cannot hit an unknown parameter.
    for (name, value) in &saved {
        model.set_parameter(name, *value)?;
    }

    outcome?;
    Ok(image)
}

fn render_sources<M: SourceModel>(
    image: &mut Array2<f64>,
    model: &mut M,
    source_table: &SourceTable,
    params_to_set: &[String],
    oversample: usize,
) -> Result<(), RenderError> {
    let (rows, cols) = image.dim();

    for source in source_table.rows() {
        for name in params_to_set {
            let value = source
                .get(name)
                .expect("parameter column covers every row");
            model.set_parameter(name, value)?;
        }

        if oversample == 1 {
            for r in 0..rows {
                for c in 0..cols {
                    image[[r, c]] += model.evaluate(c as f64, r as f64);
                }
            }
        } else {
            add_discretized(image, model, oversample);
        }
    }

    Ok(())
}

/// Add one source to the image by averaging the model over a `k×k`
/// sub-grid per pixel.
///
/// Pixel `(r, c)` spans `[c - 0.5, c + 0.5] × [r - 0.5, r + 0.5]`; sub-samples
/// are placed at the centers of its `k×k` sub-cells.
fn add_discretized<M: SourceModel>(image: &mut Array2<f64>, model: &M, oversample: usize) {
    let (rows, cols) = image.dim();
    let k = oversample as f64;
    let norm = 1.0 / (k * k);

    for r in 0..rows {
        for c in 0..cols {
            let mut total = 0.0;
            for sy in 0..oversample {
                let y = r as f64 - 0.5 + (sy as f64 + 0.5) / k;
                for sx in 0..oversample {
                    let x = c as f64 - 0.5 + (sx as f64 + 0.5) / k;
                    total += model.evaluate(x, y);
                }
            }
            image[[r, c]] += total * norm;
        }
    }
}

/// Render an image of 2D Gaussian sources.
///
/// Delegates to [`make_model_sources_image`] with a [`Gaussian2D`] model.
/// If the table has a `flux` column but no `amplitude` column, a working copy
/// gains an `amplitude` column derived as `flux / (2π σx σy)` (per-row
/// stddevs, defaulting to 1.0 when a stddev column is absent). If both are
/// present, `flux` is ignored.
pub fn make_gaussian_sources_image(
    shape: (usize, usize),
    source_table: &SourceTable,
    oversample: usize,
) -> Result<Array2<f64>, RenderError> {
    let mut model = Gaussian2D::default();

    if source_table.contains_column("flux") && !source_table.contains_column("amplitude") {
        let mut working = source_table.clone();
        let amplitude: Vec<f64> = (0..working.n_rows())
            .map(|row| {
                let flux = working.value("flux", row).expect("flux column present");
                let xstd = working.value("x_stddev", row).unwrap_or(1.0);
                let ystd = working.value("y_stddev", row).unwrap_or(1.0);
                gaussian_amplitude_from_flux(flux, xstd, ystd)
            })
            .collect();
        working.set_column("amplitude", amplitude)?;
        return make_model_sources_image(shape, &mut model, &working, oversample);
    }

    make_model_sources_image(shape, &mut model, source_table, oversample)
}

/// Render an image of pixel-integrated circular Gaussian (PRF) sources.
///
/// Delegates to [`make_model_sources_image`] with an
/// [`IntegratedGaussianPrf`] model at `oversample = 1` (the PRF is already
/// pixel-integrated). If the table has an `amplitude` column but no `flux`
/// column, a working copy gains a `flux` column derived as
/// `amplitude · 2π σ²` (per-row `sigma`, defaulting to 1.0 when absent).
/// If both are present, `amplitude` is ignored.
pub fn make_gaussian_prf_sources_image(
    shape: (usize, usize),
    source_table: &SourceTable,
) -> Result<Array2<f64>, RenderError> {
    let mut model = IntegratedGaussianPrf::default();

    if source_table.contains_column("amplitude") && !source_table.contains_column("flux") {
        let mut working = source_table.clone();
        let flux: Vec<f64> = (0..working.n_rows())
            .map(|row| {
                let amplitude = working
                    .value("amplitude", row)
                    .expect("amplitude column present");
                let sigma = working.value("sigma", row).unwrap_or(1.0);
                prf_flux_from_amplitude(amplitude, sigma)
            })
            .collect();
        working.set_column("flux", flux)?;
        return make_model_sources_image(shape, &mut model, &working, 1);
    }

    make_model_sources_image(shape, &mut model, source_table, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn single_gaussian_table(amplitude: f64, x: f64, y: f64, stddev: f64) -> SourceTable {
        let mut table = SourceTable::new(1);
        table.set_column("amplitude", vec![amplitude]).unwrap();
        table.set_column("x_mean", vec![x]).unwrap();
        table.set_column("y_mean", vec![y]).unwrap();
        table.set_column("x_stddev", vec![stddev]).unwrap();
        table.set_column("y_stddev", vec![stddev]).unwrap();
        table
    }

    #[test]
    fn test_single_source_peak_at_center() {
        let table = single_gaussian_table(100.0, 10.0, 15.0, 2.0);
        let image = make_gaussian_sources_image((30, 30), &table, 1).unwrap();

        assert_relative_eq!(image[[15, 10]], 100.0);
        assert!(image[[0, 0]] < 1e-6);
    }

    #[test]
    fn test_sources_superpose_additively() {
        let mut table = SourceTable::new(2);
        table.set_column("amplitude", vec![50.0, 50.0]).unwrap();
        table.set_column("x_mean", vec![10.0, 10.0]).unwrap();
        table.set_column("y_mean", vec![10.0, 10.0]).unwrap();
        table.set_column("x_stddev", vec![2.0, 2.0]).unwrap();
        table.set_column("y_stddev", vec![2.0, 2.0]).unwrap();

        let image = make_gaussian_sources_image((20, 20), &table, 1).unwrap();
        assert_relative_eq!(image[[10, 10]], 100.0);
    }

    #[test]
    fn test_unknown_columns_ignored() {
        let mut table = single_gaussian_table(10.0, 5.0, 5.0, 1.5);
        table.set_column("id", vec![42.0]).unwrap();

        let image = make_gaussian_sources_image((10, 10), &table, 1).unwrap();
        assert_relative_eq!(image[[5, 5]], 10.0);
    }

    #[test]
    fn test_model_state_restored_after_render() {
        let mut model = Gaussian2D {
            amplitude: 7.0,
            x_mean: 1.0,
            y_mean: 2.0,
            x_stddev: 3.0,
            y_stddev: 4.0,
            theta: 0.5,
        };
        let table = single_gaussian_table(100.0, 10.0, 10.0, 2.0);

        make_model_sources_image((20, 20), &mut model, &table, 1).unwrap();

        assert_eq!(model.amplitude, 7.0);
        assert_eq!(model.x_mean, 1.0);
        assert_eq!(model.y_mean, 2.0);
        assert_eq!(model.x_stddev, 3.0);
        assert_eq!(model.y_stddev, 4.0);
        assert_eq!(model.theta, 0.5);
    }

    #[test]
    fn test_failed_assignment_aborts_and_restores() {
        // The second row carries an invalid stddev; the render must fail as a
        // whole and leave the model exactly as it was.
        let mut table = SourceTable::new(2);
        table.set_column("amplitude", vec![10.0, 20.0]).unwrap();
        table.set_column("x_mean", vec![5.0, 8.0]).unwrap();
        table.set_column("y_mean", vec![5.0, 8.0]).unwrap();
        table.set_column("x_stddev", vec![2.0, -1.0]).unwrap();
        table.set_column("y_stddev", vec![2.0, 2.0]).unwrap();

        let mut model = Gaussian2D::default();
        let result = make_model_sources_image((12, 12), &mut model, &table, 1);

        assert!(matches!(result, Err(RenderError::Model(_))));
        assert_eq!(model.amplitude, 1.0);
        assert_eq!(model.x_mean, 0.0);
        assert_eq!(model.x_stddev, 1.0);
    }

    #[test]
    fn test_zero_oversample_rejected() {
        let mut model = Gaussian2D::default();
        let table = single_gaussian_table(1.0, 5.0, 5.0, 1.0);
        let result = make_model_sources_image((10, 10), &mut model, &table, 0);
        assert!(matches!(result, Err(RenderError::ZeroOversample)));
    }

    #[test]
    fn test_empty_table_renders_zero_image() {
        let mut model = Gaussian2D::default();
        let table = SourceTable::new(0);
        let image = make_model_sources_image((5, 8), &mut model, &table, 1).unwrap();
        assert_eq!(image.dim(), (5, 8));
        assert!(image.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_oversampling_approaches_analytic_flux() {
        // A compact Gaussian badly undersampled at pixel centers; the summed
        // image should approach 2*pi*A*sigma^2 monotonically as the
        // oversampling factor grows.
        let table = single_gaussian_table(100.0, 10.0, 10.0, 0.6);
        let analytic_flux = 100.0 * 2.0 * PI * 0.6 * 0.6;

        let mut prev_error = f64::INFINITY;
        for k in [1usize, 2, 4, 8] {
            let image = make_gaussian_sources_image((21, 21), &table, k).unwrap();
            let total: f64 = image.iter().sum();
            let error = (total - analytic_flux).abs();
            assert!(
                error <= prev_error + 1e-9,
                "k={k}: error {error} did not improve on {prev_error}"
            );
            prev_error = error;
        }
        assert!(prev_error < 0.05 * analytic_flux);
    }

    #[test]
    fn test_flux_table_drives_gaussian_render() {
        let mut table = SourceTable::new(1);
        table.set_column("flux", vec![500.0]).unwrap();
        table.set_column("x_mean", vec![10.0]).unwrap();
        table.set_column("y_mean", vec![10.0]).unwrap();
        table.set_column("x_stddev", vec![2.0]).unwrap();
        table.set_column("y_stddev", vec![2.0]).unwrap();

        let image = make_gaussian_sources_image((20, 20), &table, 1).unwrap();
        let expected_peak = 500.0 / (2.0 * PI * 2.0 * 2.0);
        assert_relative_eq!(image[[10, 10]], expected_peak, epsilon = 1e-9);
        // Caller's table is untouched
        assert!(!table.contains_column("amplitude"));
    }

    #[test]
    fn test_prf_amplitude_derives_flux() {
        let mut table = SourceTable::new(1);
        table.set_column("amplitude", vec![50.0]).unwrap();
        table.set_column("x_0", vec![10.0]).unwrap();
        table.set_column("y_0", vec![10.0]).unwrap();
        table.set_column("sigma", vec![1.5]).unwrap();

        let image = make_gaussian_prf_sources_image((21, 21), &table).unwrap();
        let total: f64 = image.iter().sum();
        let expected_flux = 50.0 * 2.0 * PI * 1.5 * 1.5;
        assert_relative_eq!(total, expected_flux, epsilon = 1e-6);
    }
}
