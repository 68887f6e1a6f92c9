//! Arbitrary-mass-scale mass triples. Stellar-core-scale kilogram
//! quantities (~1e30) overflow `f64`'s 53-bit mantissa when several
//! components are summed exactly, so masses are carried as `u128`
//! kilograms once they leave the sampling stage.

use serde::{Deserialize, Serialize};

/// `(Z, Volatiles, EnergeticNuclide)` triple of non-negative masses in
/// kilograms. Invariant: `total() == z + volatiles + energetic_nuclide`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ComplexMass {
    pub z: u128,
    pub volatiles: u128,
    pub energetic_nuclide: u128,
}

impl ComplexMass {
    pub const ZERO: ComplexMass = ComplexMass {
        z: 0,
        volatiles: 0,
        energetic_nuclide: 0,
    };

    pub fn new(z: u128, volatiles: u128, energetic_nuclide: u128) -> Self {
        Self {
            z,
            volatiles,
            energetic_nuclide,
        }
    }

    pub fn total(&self) -> u128 {
        self.z + self.volatiles + self.energetic_nuclide
    }

    pub fn total_f64(&self) -> f64 {
        self.total() as f64
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            z: scale_u128(self.z, factor),
            volatiles: scale_u128(self.volatiles, factor),
            energetic_nuclide: scale_u128(self.energetic_nuclide, factor),
        }
    }

    pub fn saturating_add(&self, other: &Self) -> Self {
        Self {
            z: self.z.saturating_add(other.z),
            volatiles: self.volatiles.saturating_add(other.volatiles),
            energetic_nuclide: self.energetic_nuclide.saturating_add(other.energetic_nuclide),
        }
    }
}

/// Converts a `double`-scale mass in kilograms into the `u128`
/// representation, rounding to the nearest integer kilogram (DESIGN.md
/// Open Question 4: round rather than truncate towards zero).
pub fn kg_from_f64(mass_kg: f64) -> u128 {
    if mass_kg <= 0.0 {
        0
    } else {
        mass_kg.round() as u128
    }
}

fn scale_u128(value: u128, factor: f64) -> u128 {
    kg_from_f64(value as f64 * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_exact_sum() {
        let m = ComplexMass::new(1_000_000_000_000_000_000_000_000_000u128, 7, 3);
        assert_eq!(m.total(), m.z + m.volatiles + m.energetic_nuclide);
    }

    #[test]
    fn kg_from_f64_rounds() {
        assert_eq!(kg_from_f64(4.4), 4);
        assert_eq!(kg_from_f64(4.5), 5);
        assert_eq!(kg_from_f64(-1.0), 0);
    }
}
