//! Reference scenes with known ground truth.
//!
//! Fixed example images for validating photometry pipelines: a four-Gaussian
//! scene, a 100-Gaussian scene, and a PSF test image with non-overlapping
//! sources. All use fixed seeds so results are identical across runs.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{thread_rng, RngCore, SeedableRng};

use crate::coords::make_nonoverlap_coords;
use crate::models::SourceModel;
use crate::noise::{make_noise_image, NoiseDistribution};
use crate::random_table::BoundedUniform;
use crate::render::{make_gaussian_sources_image, RenderError};
use crate::table::SourceTable;

/// Seed used by the fixed example scenes.
const SCENE_SEED: u64 = 12345;

/// Make an example image of four 2D Gaussians on a constant background of 5.
///
/// With `noise` set, Gaussian noise with mean 0 and standard deviation 5 is
/// added, drawn from a fixed seed. Without noise the background far from all
/// sources is exactly 5. The output shape is `(100, 200)`.
pub fn make_4gaussians_image(noise: bool) -> Array2<f64> {
    let mut table = SourceTable::new(4);
    let columns: [(&str, [f64; 4]); 6] = [
        ("amplitude", [50.0, 70.0, 150.0, 210.0]),
        ("x_mean", [160.0, 25.0, 150.0, 90.0]),
        ("y_mean", [70.0, 40.0, 25.0, 60.0]),
        ("x_stddev", [15.2, 5.1, 3.0, 8.1]),
        ("y_stddev", [2.6, 2.5, 3.0, 4.7]),
        (
            "theta",
            [
                145.0_f64.to_radians(),
                20.0_f64.to_radians(),
                0.0,
                60.0_f64.to_radians(),
            ],
        ),
    ];
    for (name, values) in columns {
        table
            .set_column(name, values.to_vec())
            .expect("fixed columns match the table size");
    }

    let shape = (100, 200);
    let mut data = make_gaussian_sources_image(shape, &table, 1)
        .expect("fixed scene parameters are valid");
    data += 5.0;

    if noise {
        let noise_image = make_noise_image(
            shape,
            NoiseDistribution::Gaussian,
            Some(0.0),
            Some(5.0),
            Some(SCENE_SEED),
        )
        .expect("fixed noise parameters are valid");
        data += &noise_image;
    }
    data
}

/// Make an example image of 100 random 2D Gaussians on a constant background
/// of 5.
///
/// Source parameters are drawn with a fixed seed: fluxes in `[500, 1000)`,
/// centers over the full `(300, 500)` frame, stddevs in `[1, 5)`, rotation in
/// `[0, 2π)`. With `noise` set, Gaussian noise with mean 0 and standard
/// deviation 2 is added.
pub fn make_100gaussians_image(noise: bool) -> Array2<f64> {
    use crate::random_table::{make_random_gaussians_table, ParamRanges};

    let ranges = ParamRanges::new()
        .with("flux", 500.0, 1000.0)
        .with("x_mean", 0.0, 500.0)
        .with("y_mean", 0.0, 300.0)
        .with("x_stddev", 1.0, 5.0)
        .with("y_stddev", 1.0, 5.0)
        .with("theta", 0.0, 2.0 * std::f64::consts::PI);
    let sources = make_random_gaussians_table(100, &ranges, Some(SCENE_SEED));

    let shape = (300, 500);
    let mut data = make_gaussian_sources_image(shape, &sources, 1)
        .expect("generated scene parameters are valid");
    data += 5.0;

    if noise {
        let noise_image = make_noise_image(
            shape,
            NoiseDistribution::Gaussian,
            Some(0.0),
            Some(2.0),
            Some(SCENE_SEED),
        )
        .expect("fixed noise parameters are valid");
        data += &noise_image;
    }
    data
}

/// Make a PSF test image with randomly placed, non-overlapping sources.
///
/// Source positions come from the non-overlap sampler (so the returned table
/// may have fewer than `n_sources` rows when `min_separation` is large for
/// the frame), fluxes are uniform over `flux_range`, and each source is
/// evaluated only over a window of exactly `psf_shape` pixels around its
/// rounded center (even sizes extend one pixel further past the center),
/// trimmed at the frame edges. Both `psf_shape` dimensions must be at least 1.
/// The model must expose `x_0`, `y_0`, and `flux` parameters; its state is
/// restored before returning, on success and on failure.
///
/// Returns the image and a ground-truth table with `x`, `y`, and `flux`
/// columns.
pub fn make_test_psf_data<M: SourceModel>(
    shape: (usize, usize),
    psf_model: &mut M,
    psf_shape: (usize, usize),
    n_sources: usize,
    flux_range: (f64, f64),
    min_separation: f64,
    seed: Option<u64>,
) -> Result<(Array2<f64>, SourceTable), RenderError> {
    if psf_shape.0 == 0 || psf_shape.1 == 0 {
        return Err(RenderError::EmptyPsfWindow {
            rows: psf_shape.0,
            cols: psf_shape.1,
        });
    }

    let seed = seed.unwrap_or_else(|| thread_rng().next_u64());
    let (rows, cols) = shape;
    // Window extents below/above the rounded center; the high side is one
    // pixel larger for even window sizes.
    let hy_lo = (psf_shape.0 - 1) / 2;
    let hy_hi = psf_shape.0 - hy_lo;
    let hx_lo = (psf_shape.1 - 1) / 2;
    let hx_hi = psf_shape.1 - hx_lo;

    let x_range = (hx_lo as f64, cols.saturating_sub(hx_hi) as f64);
    let y_range = (hy_lo as f64, rows.saturating_sub(hy_hi) as f64);
    let placed = make_nonoverlap_coords(x_range, y_range, n_sources, min_separation, Some(seed));

    let mut rng = StdRng::seed_from_u64(seed);
    let flux_dist = BoundedUniform::new(flux_range.0, flux_range.1);
    let flux: Vec<f64> = (0..placed.len()).map(|_| flux_dist.sample(&mut rng)).collect();

    let (xs, ys): (Vec<f64>, Vec<f64>) = placed.coords().iter().copied().unzip();

    let mut sources = SourceTable::new(placed.len());
    sources.set_column("x", xs)?;
    sources.set_column("y", ys)?;
    sources.set_column("flux", flux)?;

    const PSF_PARAMS: [&str; 3] = ["x_0", "y_0", "flux"];
    let saved: Vec<(&str, f64)> = PSF_PARAMS
        .iter()
        .filter_map(|&name| psf_model.parameter(name).map(|value| (name, value)))
        .collect();

    let mut data = Array2::<f64>::zeros(shape);
    let outcome = render_psf_windows(&mut data, psf_model, &sources, psf_shape);

    for (name, value) in &saved {
        psf_model.set_parameter(name, *value)?;
    }

    outcome?;
    Ok((data, sources))
}

fn render_psf_windows<M: SourceModel>(
    data: &mut Array2<f64>,
    psf_model: &mut M,
    sources: &SourceTable,
    psf_shape: (usize, usize),
) -> Result<(), RenderError> {
    let (rows, cols) = data.dim();
    let psf_rows = psf_shape.0 as isize;
    let psf_cols = psf_shape.1 as isize;

    for source in sources.rows() {
        let x = source.get("x").expect("x column covers every row");
        let y = source.get("y").expect("y column covers every row");
        let flux = source.get("flux").expect("flux column covers every row");

        psf_model.set_parameter("x_0", x)?;
        psf_model.set_parameter("y_0", y)?;
        psf_model.set_parameter("flux", flux)?;

        // Evaluate only over a window of exactly psf_shape pixels around the
        // rounded center, trimmed at frame edges
        let y_start = y.round() as isize - (psf_rows - 1) / 2;
        let x_start = x.round() as isize - (psf_cols - 1) / 2;
        let y_lo = y_start.max(0) as usize;
        let y_hi = ((y_start + psf_rows).max(0) as usize).min(rows);
        let x_lo = x_start.max(0) as usize;
        let x_hi = ((x_start + psf_cols).max(0) as usize).min(cols);

        for r in y_lo..y_hi {
            for c in x_lo..x_hi {
                data[[r, c]] += psf_model.evaluate(c as f64, r as f64);
            }
        }
    }
    Ok(())
}
