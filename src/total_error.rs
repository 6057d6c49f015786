//! Total-error maps combining background error with source shot noise.
//!
//! Implements `σ_tot = sqrt(σ_bkg² + I / g)` element-wise, where `I` is the
//! background-subtracted signal and `g` the effective gain. The shot-noise
//! term is clamped to zero wherever the gain is zero (no Poisson contribution
//! when the gain is undefined) or the signal is negative (negative variance
//! is unphysical); such pixels report purely background-limited uncertainty.

use ndarray::Array2;
use thiserror::Error;

use crate::units::{QuantityArray, Unit};

/// Errors from total-error calculation.
#[derive(Error, Debug)]
pub enum TotalErrorError {
    /// The background-error array's shape differs from the data's.
    #[error("bkg_error shape {bkg_error:?} does not match data shape {data:?}")]
    BkgErrorShapeMismatch {
        /// Shape of the data array.
        data: (usize, usize),
        /// Shape of the background-error array.
        bkg_error: (usize, usize),
    },

    /// A 2D effective gain's shape differs from the data's.
    #[error("effective_gain shape {gain:?} does not match data shape {data:?}")]
    GainShapeMismatch {
        /// Shape of the data array.
        data: (usize, usize),
        /// Shape of the gain array.
        gain: (usize, usize),
    },

    /// The effective gain contains a negative value.
    #[error("effective_gain must be non-negative, found {value}")]
    NegativeGain {
        /// The offending gain value.
        value: f64,
    },

    /// Some inputs carry units and some do not.
    #[error("if any of data, bkg_error, or effective_gain has a unit, all must have units")]
    PartialUnits,

    /// Data and background error carry different units.
    #[error("data ({data}) and bkg_error ({bkg_error}) must have the same unit")]
    UnitMismatch {
        /// Unit of the data array.
        data: Unit,
        /// Unit of the background-error array.
        bkg_error: Unit,
    },

    /// `data.unit × gain.unit` does not reduce to a countable unit.
    #[error(
        "(data × effective_gain) must have count units (electron or photon); \
         got {data} × {gain}"
    )]
    NonCountProduct {
        /// Unit of the data array.
        data: Unit,
        /// Unit of the effective gain.
        gain: Unit,
    },
}

/// Effective gain: counts per unit of signal, as a scalar broadcast over the
/// data shape or a per-pixel map. An optional unit tag participates in the
/// same all-or-none unit checking as the arrays.
#[derive(Debug, Clone)]
pub struct EffectiveGain {
    value: GainValue,
    unit: Option<Unit>,
}

#[derive(Debug, Clone)]
enum GainValue {
    Scalar(f64),
    Map(Array2<f64>),
}

impl EffectiveGain {
    /// A scalar gain with no unit tag.
    pub fn scalar(gain: f64) -> Self {
        Self {
            value: GainValue::Scalar(gain),
            unit: None,
        }
    }

    /// A scalar gain with a unit tag.
    pub fn scalar_with_unit(gain: f64, unit: Unit) -> Self {
        Self {
            value: GainValue::Scalar(gain),
            unit: Some(unit),
        }
    }

    /// A per-pixel gain map with no unit tag. Useful when the data has
    /// variable depth across the field, e.g. a mosaic with non-uniform
    /// exposure time.
    pub fn map(gain: Array2<f64>) -> Self {
        Self {
            value: GainValue::Map(gain),
            unit: None,
        }
    }

    /// A per-pixel gain map with a unit tag.
    pub fn map_with_unit(gain: Array2<f64>, unit: Unit) -> Self {
        Self {
            value: GainValue::Map(gain),
            unit: Some(unit),
        }
    }

    /// The unit tag, if any.
    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    fn first_negative(&self) -> Option<f64> {
        match &self.value {
            GainValue::Scalar(gain) => (*gain < 0.0).then_some(*gain),
            GainValue::Map(map) => map.iter().copied().find(|&g| g < 0.0),
        }
    }

    fn at(&self, index: (usize, usize)) -> f64 {
        match &self.value {
            GainValue::Scalar(gain) => *gain,
            GainValue::Map(map) => map[index],
        }
    }
}

/// Calculate a total error array from background error and source shot noise.
///
/// `data` is the background-subtracted signal; `bkg_error` its 1-σ
/// background-only error (all background contributions, excluding source
/// Poisson noise), with the same shape. The output is
/// `sqrt(bkg_error² + data / gain)` per pixel, falling back to `bkg_error`
/// alone wherever the gain is zero or the data negative.
///
/// Units are all-or-none: either `data`, `bkg_error`, and `effective_gain`
/// are all tagged or none is. When tagged, `data` and `bkg_error` must share
/// a unit and `data.unit × gain.unit` must reduce to a countable unit
/// (electrons or photons); the result carries the data's unit.
pub fn calc_total_error(
    data: &QuantityArray,
    bkg_error: &QuantityArray,
    effective_gain: &EffectiveGain,
) -> Result<QuantityArray, TotalErrorError> {
    let shape = data.shape();
    if bkg_error.shape() != shape {
        return Err(TotalErrorError::BkgErrorShapeMismatch {
            data: shape,
            bkg_error: bkg_error.shape(),
        });
    }
    if let GainValue::Map(map) = &effective_gain.value {
        if map.dim() != shape {
            return Err(TotalErrorError::GainShapeMismatch {
                data: shape,
                gain: map.dim(),
            });
        }
    }

    let units = [data.unit(), bkg_error.unit(), effective_gain.unit()];
    let tagged = units.iter().filter(|unit| unit.is_some()).count();
    let output_unit = match tagged {
        0 => None,
        3 => {
            let data_unit = data.unit().expect("all inputs tagged");
            let bkg_unit = bkg_error.unit().expect("all inputs tagged");
            let gain_unit = effective_gain.unit().expect("all inputs tagged");
            if data_unit != bkg_unit {
                return Err(TotalErrorError::UnitMismatch {
                    data: data_unit,
                    bkg_error: bkg_unit,
                });
            }
            match data_unit.checked_mul(gain_unit) {
                Some(product) if product.is_count() => {}
                _ => {
                    return Err(TotalErrorError::NonCountProduct {
                        data: data_unit,
                        gain: gain_unit,
                    })
                }
            }
            Some(data_unit)
        }
        _ => return Err(TotalErrorError::PartialUnits),
    };

    if let Some(value) = effective_gain.first_negative() {
        return Err(TotalErrorError::NegativeGain { value });
    }

    let mut total = Array2::<f64>::zeros(shape);
    for ((index, out), (&signal, &sigma_bkg)) in total
        .indexed_iter_mut()
        .zip(data.data().iter().zip(bkg_error.data().iter()))
    {
        let gain = effective_gain.at(index);
        // Shot-noise variance, clamped: no contribution for zero gain or
        // negative signal.
        let source_variance = if gain > 0.0 {
            (signal / gain).max(0.0)
        } else {
            0.0
        };
        *out = (sigma_bkg * sigma_bkg + source_variance).sqrt();
    }

    Ok(match output_unit {
        Some(unit) => QuantityArray::with_unit(total, unit),
        None => QuantityArray::new(total),
    })
}
