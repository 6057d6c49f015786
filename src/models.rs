//! Parametric 2D source models for image synthesis.
//!
//! A [`SourceModel`] exposes its parameters by name so a renderer can
//! substitute per-source values from a table, evaluate the model over a pixel
//! grid, and restore the original parameter state afterward. Concrete models
//! here cover the profiles used for photometry validation: an elliptical
//! [`Gaussian2D`], a [`Moffat2D`] seeing profile, and the pixel-integrated
//! circular Gaussian [`IntegratedGaussianPrf`].

use std::f64::consts::PI;

use scilib::math::basic::erf;
use thiserror::Error;

/// Errors from model parameter access.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The model has no parameter with this name.
    #[error("model has no parameter named '{name}'")]
    UnknownParameter {
        /// The requested parameter name.
        name: String,
    },

    /// The value is outside the parameter's valid domain.
    #[error("invalid value {value} for parameter '{name}'")]
    InvalidValue {
        /// The parameter name.
        name: String,
        /// The rejected value.
        value: f64,
    },
}

/// Reject non-positive values for width-like parameters.
fn require_positive(name: &str, value: f64) -> Result<f64, ModelError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ModelError::InvalidValue {
            name: name.to_string(),
            value,
        })
    }
}

/// A 2D model with named, mutable parameters.
///
/// Implementations are treated as borrowed and possibly stateful: callers
/// that mutate parameters are expected to restore them (the renderer in
/// [`crate::render`] guarantees this on every exit path).
pub trait SourceModel {
    /// Names of all model parameters, in declaration order.
    fn parameter_names(&self) -> &'static [&'static str];

    /// Current value of a named parameter.
    fn parameter(&self, name: &str) -> Option<f64>;

    /// Set a named parameter.
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ModelError>;

    /// Evaluate the model at a single `(x, y)` position.
    fn evaluate(&self, x: f64, y: f64) -> f64;

    /// Whether the model has a parameter with this name.
    fn has_parameter(&self, name: &str) -> bool {
        self.parameter_names().contains(&name)
    }
}

/// Peak amplitude of a 2D Gaussian with the given integrated flux.
///
/// `amplitude = flux / (2π σx σy)`. This is the inverse of integrating the
/// elliptical Gaussian profile over the whole plane.
pub fn gaussian_amplitude_from_flux(flux: f64, x_stddev: f64, y_stddev: f64) -> f64 {
    flux / (2.0 * PI * x_stddev * y_stddev)
}

/// Integrated flux of a circular Gaussian PRF with the given peak amplitude.
///
/// `flux = amplitude · 2π σ²`, the inverse of [`gaussian_amplitude_from_flux`]
/// for `σx = σy = σ`.
pub fn prf_flux_from_amplitude(amplitude: f64, sigma: f64) -> f64 {
    amplitude * 2.0 * PI * sigma * sigma
}

/// Elliptical 2D Gaussian profile with optional rotation.
///
/// Parameters: `amplitude`, `x_mean`, `y_mean`, `x_stddev`, `y_stddev`,
/// `theta` (rotation in radians, counterclockwise from the x axis).
#[derive(Debug, Clone)]
pub struct Gaussian2D {
    /// Peak value at the center.
    pub amplitude: f64,
    /// X position of the center.
    pub x_mean: f64,
    /// Y position of the center.
    pub y_mean: f64,
    /// Standard deviation along the rotated x axis.
    pub x_stddev: f64,
    /// Standard deviation along the rotated y axis.
    pub y_stddev: f64,
    /// Rotation angle in radians.
    pub theta: f64,
}

impl Default for Gaussian2D {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            x_mean: 0.0,
            y_mean: 0.0,
            x_stddev: 1.0,
            y_stddev: 1.0,
            theta: 0.0,
        }
    }
}

impl SourceModel for Gaussian2D {
    fn parameter_names(&self) -> &'static [&'static str] {
        &["amplitude", "x_mean", "y_mean", "x_stddev", "y_stddev", "theta"]
    }

    fn parameter(&self, name: &str) -> Option<f64> {
        match name {
            "amplitude" => Some(self.amplitude),
            "x_mean" => Some(self.x_mean),
            "y_mean" => Some(self.y_mean),
            "x_stddev" => Some(self.x_stddev),
            "y_stddev" => Some(self.y_stddev),
            "theta" => Some(self.theta),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        match name {
            "amplitude" => self.amplitude = value,
            "x_mean" => self.x_mean = value,
            "y_mean" => self.y_mean = value,
            "x_stddev" => self.x_stddev = require_positive(name, value)?,
            "y_stddev" => self.y_stddev = require_positive(name, value)?,
            "theta" => self.theta = value,
            _ => {
                return Err(ModelError::UnknownParameter {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: f64, y: f64) -> f64 {
        let cost2 = self.theta.cos().powi(2);
        let sint2 = self.theta.sin().powi(2);
        let sin2t = (2.0 * self.theta).sin();
        let xstd2 = self.x_stddev * self.x_stddev;
        let ystd2 = self.y_stddev * self.y_stddev;

        let a = 0.5 * (cost2 / xstd2 + sint2 / ystd2);
        let b = 0.5 * (sin2t / xstd2 - sin2t / ystd2);
        let c = 0.5 * (sint2 / xstd2 + cost2 / ystd2);

        let dx = x - self.x_mean;
        let dy = y - self.y_mean;
        self.amplitude * (-(a * dx * dx + b * dx * dy + c * dy * dy)).exp()
    }
}

/// Moffat profile, a common model for seeing-limited stellar images.
///
/// Parameters: `amplitude`, `x_0`, `y_0`, `gamma` (core width), `alpha`
/// (power-law slope of the wings).
#[derive(Debug, Clone)]
pub struct Moffat2D {
    /// Peak value at the center.
    pub amplitude: f64,
    /// X position of the center.
    pub x_0: f64,
    /// Y position of the center.
    pub y_0: f64,
    /// Core width.
    pub gamma: f64,
    /// Power-law index.
    pub alpha: f64,
}

impl Default for Moffat2D {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            x_0: 0.0,
            y_0: 0.0,
            gamma: 1.0,
            alpha: 1.0,
        }
    }
}

impl SourceModel for Moffat2D {
    fn parameter_names(&self) -> &'static [&'static str] {
        &["amplitude", "x_0", "y_0", "gamma", "alpha"]
    }

    fn parameter(&self, name: &str) -> Option<f64> {
        match name {
            "amplitude" => Some(self.amplitude),
            "x_0" => Some(self.x_0),
            "y_0" => Some(self.y_0),
            "gamma" => Some(self.gamma),
            "alpha" => Some(self.alpha),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        match name {
            "amplitude" => self.amplitude = value,
            "x_0" => self.x_0 = value,
            "y_0" => self.y_0 = value,
            "gamma" => self.gamma = require_positive(name, value)?,
            "alpha" => self.alpha = value,
            _ => {
                return Err(ModelError::UnknownParameter {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.x_0;
        let dy = y - self.y_0;
        let rr_gg = (dx * dx + dy * dy) / (self.gamma * self.gamma);
        self.amplitude * (1.0 + rr_gg).powf(-self.alpha)
    }
}

/// Circular Gaussian PRF integrated over each pixel.
///
/// Unlike [`Gaussian2D`], evaluation at `(x, y)` returns the profile
/// integrated over the unit pixel centered there, so summing over pixels
/// recovers `flux` even for sub-pixel-scale sources. Parameters: `flux`,
/// `x_0`, `y_0`, `sigma`.
#[derive(Debug, Clone)]
pub struct IntegratedGaussianPrf {
    /// Total integrated flux.
    pub flux: f64,
    /// X position of the center.
    pub x_0: f64,
    /// Y position of the center.
    pub y_0: f64,
    /// Gaussian standard deviation.
    pub sigma: f64,
}

impl Default for IntegratedGaussianPrf {
    fn default() -> Self {
        Self {
            flux: 1.0,
            x_0: 0.0,
            y_0: 0.0,
            sigma: 1.0,
        }
    }
}

impl SourceModel for IntegratedGaussianPrf {
    fn parameter_names(&self) -> &'static [&'static str] {
        &["flux", "x_0", "y_0", "sigma"]
    }

    fn parameter(&self, name: &str) -> Option<f64> {
        match name {
            "flux" => Some(self.flux),
            "x_0" => Some(self.x_0),
            "y_0" => Some(self.y_0),
            "sigma" => Some(self.sigma),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        match name {
            "flux" => self.flux = value,
            "x_0" => self.x_0 = value,
            "y_0" => self.y_0 = value,
            "sigma" => self.sigma = require_positive(name, value)?,
            _ => {
                return Err(ModelError::UnknownParameter {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: f64, y: f64) -> f64 {
        let denom = self.sigma * std::f64::consts::SQRT_2;
        let dx = x - self.x_0;
        let dy = y - self.y_0;
        self.flux / 4.0
            * (erf((dx + 0.5) / denom) - erf((dx - 0.5) / denom))
            * (erf((dy + 0.5) / denom) - erf((dy - 0.5) / denom))
    }
}
