//! Physical unit tags for image quantities.
//!
//! Error propagation only needs a small, closed set of units: detector counts
//! (electrons, photons), digitized values (ADU), exposure time, and the
//! rate/gain composites that reduce to counts when multiplied. [`Unit`]
//! carries that closed algebra; [`QuantityArray`] attaches an optional unit
//! tag to a 2D array so consumers such as
//! [`calc_total_error`](crate::total_error::calc_total_error) can reject
//! silently mixed tagged and untagged data.

use std::fmt;

use ndarray::Array2;

/// A physical unit from the closed set used for error propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Detected electrons.
    Electron,
    /// Detected photons.
    Photon,
    /// Analog-to-digital units.
    Adu,
    /// Seconds of exposure.
    Second,
    /// No unit; a pure ratio.
    Dimensionless,
    /// Electrons per second (count rate).
    ElectronPerSecond,
    /// Photons per second (count rate).
    PhotonPerSecond,
    /// Electrons per ADU (conversion gain).
    ElectronPerAdu,
    /// Photons per ADU (conversion gain).
    PhotonPerAdu,
}

impl Unit {
    /// Whether this unit is a countable quantity (electrons or photons).
    pub fn is_count(self) -> bool {
        matches!(self, Unit::Electron | Unit::Photon)
    }

    /// Product of two units, reduced within the closed set.
    ///
    /// Returns `None` when the product is not representable (e.g.
    /// `electron · photon`). Multiplication is commutative.
    pub fn checked_mul(self, other: Unit) -> Option<Unit> {
        reduce_product(self, other).or_else(|| reduce_product(other, self))
    }
}

/// One-directional reduction table; [`Unit::checked_mul`] tries both orders.
fn reduce_product(left: Unit, right: Unit) -> Option<Unit> {
    use Unit::*;
    match (left, right) {
        (unit, Dimensionless) => Some(unit),
        (ElectronPerSecond, Second) => Some(Electron),
        (PhotonPerSecond, Second) => Some(Photon),
        (Adu, ElectronPerAdu) => Some(Electron),
        (Adu, PhotonPerAdu) => Some(Photon),
        _ => None,
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Unit::Electron => "electron",
            Unit::Photon => "photon",
            Unit::Adu => "adu",
            Unit::Second => "s",
            Unit::Dimensionless => "1",
            Unit::ElectronPerSecond => "electron / s",
            Unit::PhotonPerSecond => "photon / s",
            Unit::ElectronPerAdu => "electron / adu",
            Unit::PhotonPerAdu => "photon / adu",
        };
        f.write_str(text)
    }
}

/// A 2D array with an optional unit tag.
#[derive(Debug, Clone)]
pub struct QuantityArray {
    data: Array2<f64>,
    unit: Option<Unit>,
}

impl QuantityArray {
    /// Wrap an array with no unit tag.
    pub fn new(data: Array2<f64>) -> Self {
        Self { data, unit: None }
    }

    /// Wrap an array with a unit tag.
    pub fn with_unit(data: Array2<f64>, unit: Unit) -> Self {
        Self {
            data,
            unit: Some(unit),
        }
    }

    /// The underlying array.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// The unit tag, if any.
    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    /// `(rows, cols)` shape of the array.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Consume the quantity, yielding the array and the tag.
    pub fn into_parts(self) -> (Array2<f64>, Option<Unit>) {
        (self.data, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_products_reduce_to_counts() {
        assert_eq!(
            Unit::Adu.checked_mul(Unit::ElectronPerAdu),
            Some(Unit::Electron)
        );
        assert_eq!(
            Unit::ElectronPerAdu.checked_mul(Unit::Adu),
            Some(Unit::Electron)
        );
        assert_eq!(
            Unit::ElectronPerSecond.checked_mul(Unit::Second),
            Some(Unit::Electron)
        );
        assert_eq!(
            Unit::PhotonPerSecond.checked_mul(Unit::Second),
            Some(Unit::Photon)
        );
        assert_eq!(
            Unit::Electron.checked_mul(Unit::Dimensionless),
            Some(Unit::Electron)
        );
    }

    #[test]
    fn test_irreducible_products_rejected() {
        assert_eq!(Unit::Electron.checked_mul(Unit::Photon), None);
        assert_eq!(Unit::Adu.checked_mul(Unit::Second), None);
        assert_eq!(Unit::Second.checked_mul(Unit::Second), None);
    }

    #[test]
    fn test_count_predicate() {
        assert!(Unit::Electron.is_count());
        assert!(Unit::Photon.is_count());
        assert!(!Unit::Adu.is_count());
        assert!(!Unit::ElectronPerSecond.is_count());
    }

    #[test]
    fn test_quantity_tagging_round_trip() {
        let tagged = QuantityArray::with_unit(Array2::from_elem((2, 3), 1.5), Unit::Electron);
        assert_eq!(tagged.unit(), Some(Unit::Electron));
        assert_eq!(tagged.shape(), (2, 3));

        let (data, unit) = tagged.into_parts();
        assert_eq!(unit, Some(Unit::Electron));
        assert_eq!(data[[1, 2]], 1.5);
        assert_eq!(QuantityArray::new(data).unit(), None);
    }
}
