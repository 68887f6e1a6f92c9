//! The orbital generator pipeline, built on top of one or two already
//! finished `Star`s: protoplanetary disk, core seeding, planet
//! classification, orbital filters, body composition, moons/rings/
//! Trojans/Kuiper belt, and final system assembly.
//!
//! Grounded on `original_source/.../OrbitalGenerator.cpp`'s
//! `GenerateOrbitals`/`GeneratePlanets` stage ordering, generalized
//! from the source's flat `Planets`/`AsteroidClusters` vectors to the
//! `StellarSystem` arena plus tagged `BodyHandle`s. Each stage gets
//! its own module, called in sequence from
//! `crate::orbital_generator::OrbitalGenerator`.

pub mod binary;
pub mod composition;
pub mod cores;
pub mod disk;
pub mod filters;
pub mod garnish;
pub mod assembler;
pub mod planet_class;

use crate::constants::{AU_M, SOLAR_LUMINOSITY_W, STEFAN_BOLTZMANN};
use crate::model::PlanetType;

/// A planet as it travels through classification, filtering and
/// composition: typed and orbit-placed, but not yet converted into
/// the public `model::Planet` (that happens in
/// `assembler`, once the filter pipeline and body-composition stages
/// have settled its final mass, radius and type).
#[derive(Debug, Clone)]
pub struct WorkingPlanet {
    pub planet_type: PlanetType,
    pub mass_kg: f64,
    pub semi_major_axis_m: f64,
    pub eccentricity: f64,
    pub inclination_rad: f64,
    pub longitude_ascending_node_rad: f64,
    pub argument_of_periapsis_rad: f64,
    pub true_anomaly_rad: f64,
    pub migration: bool,
    pub original_semi_major_axis_m: Option<f64>,
    pub beyond_frost_line: bool,
    /// Radius-inflation multiplier applied during composition after a
    /// hot-giant promotion: `(S/10000)^0.094`.
    pub radius_inflation: f64,
    pub core_z_kg: f64,
    pub core_volatiles_kg: f64,
    pub core_energetic_nuclide_kg: f64,
}

impl WorkingPlanet {
    pub fn core_mass_kg(&self) -> f64 {
        self.core_z_kg + self.core_volatiles_kg + self.core_energetic_nuclide_kg
    }
}

/// Pre-main-sequence luminosity, watts, from a progenitor's initial
/// mass: a piecewise power law whose formula is grounded on
/// `original_source/.../OrbitalGenerator.cpp`'s
/// `CalculatePrevMainSequenceLuminosity`.
pub fn prev_main_sequence_luminosity_w(initial_mass_sol: f64) -> f64 {
    let m = initial_mass_sol;
    let common = (10f64.powf(2.0 - m) + 1.0) * SOLAR_LUMINOSITY_W;
    if m < 0.075 {
        0.0
    } else if m < 0.43 {
        common * 0.23 * m.powf(2.3)
    } else if m < 2.0 {
        common * m.powi(4)
    } else if m <= 12.0 {
        common * 1.5 * m.powf(3.5)
    } else {
        common * 1.5 * 12f64.powf(3.5)
    }
}

/// Blackbody equilibrium temperature at distance `a_m` from a single
/// source of luminosity `luminosity_w`, no albedo term.
pub fn equilibrium_temperature_k(luminosity_w: f64, a_m: f64) -> f64 {
    if a_m <= 0.0 {
        return 0.0;
    }
    (luminosity_w / (16.0 * std::f64::consts::PI * STEFAN_BOLTZMANN * a_m * a_m)).powf(0.25)
}

/// Irradiance (Poynting vector) at distance `a_m` from a single star
/// of luminosity `luminosity_w`: `L/(4*pi*a^2)`.
pub fn poynting_vector_w_m2(luminosity_w: f64, a_m: f64) -> f64 {
    if a_m <= 0.0 {
        return f64::INFINITY;
    }
    luminosity_w / (4.0 * std::f64::consts::PI * a_m * a_m)
}

/// Habitable-zone bounds in AU from the 3000/600 W/m^2 Poynting-vector
/// thresholds the orbital generator actually classifies planets
/// against (`original_source/.../OrbitalGenerator.cpp`'s habitable-band
/// computation in `GeneratePlanets`/`JudgeLargePlanets`) — distinct
/// from `crate::random::habitable_zone_au`'s solar-unit fit, which the
/// stellar generator uses for its own coarser estimate.
///
/// `other_star_luminosity_w`/`binary_separation_m` are `Some` only for
/// a star with a companion; the companion's irradiance at the binary
/// separation subtracts from the threshold before solving for `a`.
pub fn habitable_zone_si_au(
    luminosity_w: f64,
    other_star_luminosity_w: Option<f64>,
    binary_separation_m: Option<f64>,
) -> (f64, f64) {
    let four_pi = 4.0 * std::f64::consts::PI;
    let companion_term = match (other_star_luminosity_w, binary_separation_m) {
        (Some(l_other), Some(a_bin)) if a_bin > 0.0 => l_other / (four_pi * a_bin * a_bin),
        _ => 0.0,
    };
    let inner_m2 = (luminosity_w / (four_pi * (3000.0 - companion_term).max(1.0))).sqrt();
    let outer_m2 = (luminosity_w / (four_pi * (600.0 - companion_term).max(1.0))).sqrt();
    (inner_m2 / AU_M, outer_m2 / AU_M)
}

/// Frost line in AU, separating rocky cores from ice cores. Formula
/// grounded on `original_source/.../OrbitalGenerator.cpp`. Uses the
/// 270K blackbody threshold against pre-main-sequence luminosity.
pub fn frost_line_au(
    prev_main_sequence_luminosity_w: f64,
    other_prev_main_sequence_luminosity_w: Option<f64>,
    binary_separation_m: Option<f64>,
) -> f64 {
    let four_pi = 4.0 * std::f64::consts::PI;
    let base = STEFAN_BOLTZMANN * 270f64.powi(4);
    let companion_term = match (other_prev_main_sequence_luminosity_w, binary_separation_m) {
        (Some(l_other), Some(a_bin)) if a_bin > 0.0 => l_other / (four_pi * a_bin * a_bin),
        _ => 0.0,
    };
    let denom = (base - companion_term).max(1e-6);
    let frost_line_au_sq = prev_main_sequence_luminosity_w / (four_pi * denom);
    frost_line_au_sq.sqrt() / AU_M
}

/// Disk age (years) at which the protoplanetary disk has already
/// dissipated for a star of this initial mass. Grounded on
/// `original_source/.../OrbitalGenerator.cpp`'s `DiskAge` computation
/// in `GeneratePlanets`, a supplemental pre-demotion check.
pub fn disk_age_years(initial_mass_sol: f64) -> f64 {
    let m = initial_mass_sol;
    8.15e6 + 8.3e5 * m - 33_854.0 * m * m - 5.031e6 * m.max(1e-6).ln()
}
