//! Physical constants shared across the crate, kept alongside the
//! teacher's inline `const G: f64 = 6.67430e-11;` pattern from
//! `PhysicalProperties` but centralized since many more components
//! now need them.

pub const G: f64 = 6.674_30e-11;
pub const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-8;
pub const SOLAR_MASS_KG: f64 = 1.989e30;
pub const SOLAR_RADIUS_M: f64 = 6.957e8;
pub const SOLAR_LUMINOSITY_W: f64 = 3.828e26;
pub const SOLAR_TEFF_K: f64 = 5772.0;
pub const EARTH_MASS_KG: f64 = 5.972e24;
pub const EARTH_RADIUS_M: f64 = 6.371e6;
pub const JUPITER_MASS_KG: f64 = 1.898e27;
pub const AU_M: f64 = 1.495_978_707e11;
pub const YEAR_S: f64 = 365.25 * 86_400.0;
pub const DAY_S: f64 = 86_400.0;
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Default "coil temperature limit", the design parameter for
/// stellar-wind-harvesting equipment.
pub const DEFAULT_COIL_TEMP_LIMIT_K: f64 = 1514.114;

/// Default `dEpdM` used by `minCoilMass`.
pub const DEFAULT_DEPDM: f64 = 2.0e6;

/// Default asteroid-classification mass threshold.
pub const DEFAULT_ASTEROID_UPPER_LIMIT_KG: f64 = 1e21;

/// CMB temperature floor numerator used in equilibrium temperature:
/// `T >= 3.76119e10 / universeAge`.
pub const CMB_FLOOR_NUMERATOR: f64 = 3.761_19e10;
