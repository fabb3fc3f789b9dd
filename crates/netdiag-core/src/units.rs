//! Unit newtypes for network quantities.
//!
//! Every carrier in the model (electricity, heat, hydrogen) is accounted in
//! megawatts of the carrier's own energy flow, so a single power type serves
//! buses of all carriers. Stores are sized in energy (MWh), and dimensionless
//! factors such as efficiencies, availability and impedances are per-unit.
//!
//! # Usage
//!
//! ```
//! use netdiag_core::units::{Megawatts, MegawattHours, PerUnit};
//!
//! let capacity = Megawatts(100.0);
//! let derated = capacity * PerUnit(0.8).value();
//! assert_eq!(derated.value(), 80.0);
//!
//! // Different dimensions do not mix:
//! // let wrong = capacity + MegawattHours(10.0);
//! let _energy = MegawattHours(10.0);
//! ```
//!
//! Unparseable numeric cells are carried as NaN (the loader's sentinel), so
//! every type exposes `is_nan`/`is_finite` and a `finite_or_zero` accessor
//! used by the aggregation stages.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// Implements the arithmetic shared by all unit newtypes.
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $type {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.2} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Check if value is NaN
            #[inline]
            pub fn is_nan(self) -> bool {
                self.0.is_nan()
            }

            /// Raw value, or zero when the value is NaN or infinite
            #[inline]
            pub fn finite_or_zero(self) -> f64 {
                if self.0.is_finite() {
                    self.0
                } else {
                    0.0
                }
            }

            /// Maximum of two values
            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> std::iter::Sum<&'a $type> for $type {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Power in megawatts of the carrier's energy flow (MW, MW_th, MW_H2)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit_ops!(Megawatts, "MW");

/// Stored energy in megawatt-hours
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MegawattHours(pub f64);

impl_unit_ops!(MegawattHours, "MWh");

/// Dimensionless per-unit factor (efficiency, availability, impedance)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct PerUnit(pub f64);

impl_unit_ops!(PerUnit, "pu");

impl Default for PerUnit {
    fn default() -> Self {
        PerUnit(1.0)
    }
}

impl PerUnit {
    /// True when the factor lies in the half-open interval (0, 1].
    #[inline]
    pub fn is_unit_fraction(self) -> bool {
        self.0 > 0.0 && self.0 <= 1.0
    }
}

impl Mul<PerUnit> for Megawatts {
    type Output = Megawatts;
    fn mul(self, rhs: PerUnit) -> Self::Output {
        Megawatts(self.0 * rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_megawatts_arithmetic() {
        let p1 = Megawatts(100.0);
        let p2 = Megawatts(50.0);

        assert_eq!((p1 + p2).value(), 150.0);
        assert_eq!((p1 - p2).value(), 50.0);
        assert_eq!((-p1).value(), -100.0);
        assert_eq!((p1 * 2.0).value(), 200.0);
        assert_eq!((p1 / 2.0).value(), 50.0);
        assert_eq!(p1 / p2, 2.0);
    }

    #[test]
    fn test_availability_derating() {
        let p = Megawatts(200.0) * PerUnit(0.25);
        assert!((p.value() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_sentinel_helpers() {
        let bad = Megawatts(f64::NAN);
        assert!(bad.is_nan());
        assert!(!bad.is_finite());
        assert_eq!(bad.finite_or_zero(), 0.0);
        assert_eq!(Megawatts(12.5).finite_or_zero(), 12.5);
    }

    #[test]
    fn test_unit_fraction() {
        assert!(PerUnit(1.0).is_unit_fraction());
        assert!(PerUnit(0.35).is_unit_fraction());
        assert!(!PerUnit(0.0).is_unit_fraction());
        assert!(!PerUnit(1.2).is_unit_fraction());
        assert!(!PerUnit(f64::NAN).is_unit_fraction());
    }

    #[test]
    fn test_sum_iterator() {
        let energies = vec![MegawattHours(10.0), MegawattHours(20.0)];
        let total: MegawattHours = energies.iter().sum();
        assert_eq!(total.value(), 30.0);

        let mut acc = Megawatts::default();
        acc += Megawatts(4.0);
        acc += Megawatts(6.0);
        assert_eq!(acc.value(), 10.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Megawatts(100.0)), "100.00 MW");
        assert_eq!(format!("{}", MegawattHours(2.5)), "2.50 MWh");
        assert_eq!(format!("{}", PerUnit(1.0)), "1.00 pu");
    }
}
