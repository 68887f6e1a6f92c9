//! Binary-orbit builder.
//!
//! Grounded on `original_source/.../OrbitalGenerator.cpp`'s
//! `GenerateBinaryOrbit` for the period/eccentricity/split formulas and
//! the antipodal-angle convention; `_BinaryPeriodDistribution(mean,
//! sigma)` constructor arguments confirm the `N(5.03, 2.28)` prior.

use crate::constants::{AU_M, G, SOLAR_MASS_KG, STEFAN_BOLTZMANN, YEAR_S};
use crate::model::{Normal, Star};
use crate::random::RandomEngine;

/// One star's half of a resolved binary-orbit pair.
#[derive(Debug, Clone, Copy)]
pub struct StarOrbitGeometry {
    pub semi_major_axis_m: f64,
    pub argument_of_periapsis_rad: f64,
    pub true_anomaly_rad: f64,
    /// "Near-star inner limit": closest distance at which equipment
    /// rated to `coil_temp_limit_k` survives the combined irradiance
    /// of both stars.
    pub near_star_inner_limit_m: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryOrbit {
    pub semi_major_axis_m: f64,
    pub period_s: f64,
    pub eccentricity: f64,
    pub inclination_rad: f64,
    pub longitude_ascending_node_rad: f64,
    pub star_a: StarOrbitGeometry,
    pub star_b: StarOrbitGeometry,
}

/// Builds the binary-orbit pair and perturbs each star's `normal` in
/// place, perturbing each star's rotational normal by +-0.09 rad.
pub fn generate_binary_orbit(
    rng: &mut RandomEngine,
    star_a: &mut Star,
    star_b: &mut Star,
    binary_period_mean_log_days: f64,
    binary_period_sigma_log_days: f64,
    coil_temp_limit_k: f64,
) -> BinaryOrbit {
    let mass_sol_total = (star_a.mass_kg + star_b.mass_kg) / SOLAR_MASS_KG;
    let lo = (50.0 * 365.0 * mass_sol_total.powf(0.3)).log10();
    let hi = (2500.0 * 365.0 * mass_sol_total.powf(0.3)).log10();

    let mut log_period_days;
    loop {
        log_period_days = rng.normal(binary_period_mean_log_days, binary_period_sigma_log_days);
        if log_period_days >= lo && log_period_days <= hi {
            break;
        }
    }
    let period_days = 10f64.powf(log_period_days);
    let period_s = period_days * 86_400.0;

    let semi_major_axis_m = (G * SOLAR_MASS_KG * mass_sol_total * period_s * period_s
        / (4.0 * std::f64::consts::PI.powi(2)))
    .cbrt();

    let eccentricity = {
        let raw = rng.uniform01() * 1.2;
        let scale = if period_days < 10.0 {
            0.01
        } else if period_days < 1_000_000.0 {
            0.1975 * period_days.log10() - 0.385
        } else {
            0.8
        };
        (raw * scale.max(0.0)).clamp(0.0, 0.99)
    };

    let mu_a = star_b.mass_kg / (star_a.mass_kg + star_b.mass_kg);
    let mu_b = star_a.mass_kg / (star_a.mass_kg + star_b.mass_kg);
    let a_star_a = semi_major_axis_m * mu_a;
    let a_star_b = semi_major_axis_m * mu_b;

    let inclination_rad = rng.uniform(0.0, std::f64::consts::TAU);
    let longitude_ascending_node_rad = rng.uniform(0.0, std::f64::consts::TAU);

    let argument_of_periapsis_a = rng.uniform(0.0, std::f64::consts::TAU);
    let argument_of_periapsis_b = (argument_of_periapsis_a + std::f64::consts::PI) % std::f64::consts::TAU;

    let true_anomaly_a = rng.uniform(0.0, std::f64::consts::TAU);
    let true_anomaly_b = (true_anomaly_a + std::f64::consts::PI) % std::f64::consts::TAU;

    let d_theta_a = rng.uniform(-1.0, 1.0);
    let d_phi_a = rng.uniform(-1.0, 1.0);
    let d_theta_b = rng.uniform(-1.0, 1.0);
    let d_phi_b = rng.uniform(-1.0, 1.0);
    star_a.normal = star_a.normal.perturbed(0.09, d_theta_a, d_phi_a);
    star_b.normal = star_b.normal.perturbed(0.09, d_theta_b, d_phi_b);

    let near_limit_a = near_star_inner_limit_m(
        star_a.luminosity_w,
        star_b.luminosity_w,
        semi_major_axis_m,
        coil_temp_limit_k,
    );
    let near_limit_b = near_star_inner_limit_m(
        star_b.luminosity_w,
        star_a.luminosity_w,
        semi_major_axis_m,
        coil_temp_limit_k,
    );

    BinaryOrbit {
        semi_major_axis_m,
        period_s,
        eccentricity,
        inclination_rad,
        longitude_ascending_node_rad,
        star_a: StarOrbitGeometry {
            semi_major_axis_m: a_star_a,
            argument_of_periapsis_rad: argument_of_periapsis_a,
            true_anomaly_rad: true_anomaly_a,
            near_star_inner_limit_m: near_limit_a,
        },
        star_b: StarOrbitGeometry {
            semi_major_axis_m: a_star_b,
            argument_of_periapsis_rad: argument_of_periapsis_b,
            true_anomaly_rad: true_anomaly_b,
            near_star_inner_limit_m: near_limit_b,
        },
    }
}

/// Solves `4*pi*(sigma*T^4 - L_companion/(4*pi*a_bin^2)) = L_self/a_near^2`
/// for `a_near`.
fn near_star_inner_limit_m(
    luminosity_self_w: f64,
    luminosity_companion_w: f64,
    binary_separation_m: f64,
    coil_temp_limit_k: f64,
) -> f64 {
    let four_pi = 4.0 * std::f64::consts::PI;
    let companion_term = if binary_separation_m > 0.0 {
        luminosity_companion_w / (four_pi * binary_separation_m * binary_separation_m)
    } else {
        0.0
    };
    let denom = (STEFAN_BOLTZMANN * coil_temp_limit_k.powi(4) - companion_term).max(1.0);
    (luminosity_self_w / (four_pi * denom)).sqrt()
}

/// Default mean/sigma for `_BinaryPeriodDistribution`:
/// `N(mean=5.03, sigma=2.28)`.
pub const DEFAULT_LOG_PERIOD_MEAN_DAYS: f64 = 5.03;
pub const DEFAULT_LOG_PERIOD_SIGMA_DAYS: f64 = 2.28;

#[allow(dead_code)]
fn years_from_days(days: f64) -> f64 {
    days * 86_400.0 / YEAR_S
}

#[allow(dead_code)]
fn au(meters: f64) -> f64 {
    meters / AU_M
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::StellarClass;
    use crate::model::{EvolutionPhase, StarOrigin};
    use crate::random::SeedSequence;

    fn plain_star(mass_kg: f64, luminosity_w: f64) -> Star {
        Star {
            age_s: 1e9 * YEAR_S,
            initial_mass_kg: mass_kg,
            mass_kg,
            feh: 0.0,
            lifetime_s: 1e10 * YEAR_S,
            radius_m: crate::constants::SOLAR_RADIUS_M,
            luminosity_w,
            teff_k: 5772.0,
            escape_velocity_m_s: 6e5,
            surface_h1: 0.7,
            surface_z: 0.02,
            surface_energetic_nuclide: 0.0,
            surface_volatiles: 0.28,
            core_temp_k: 1.5e7,
            core_density_kg_m3: 1.5e5,
            wind_speed_m_s: 4e5,
            mass_loss_kg_s: -1e9,
            evolution_progress: 1.0,
            evolution_phase: EvolutionPhase::MainSequence,
            origin: StarOrigin::Normal,
            has_planets: false,
            is_single: false,
            normal: Normal::new(0.3, 1.2),
            magnetic_field_t: 1e-4,
            spin_s: 2e6,
            oblateness: 0.0,
            min_coil_mass_kg: 0.0,
            class: StellarClass::unknown(),
        }
    }

    #[test]
    fn period_within_stable_bracket() {
        let seq = SeedSequence::from_str("binary-test");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let mut a = plain_star(2.0 * SOLAR_MASS_KG, 4.0 * crate::constants::SOLAR_LUMINOSITY_W);
        let mut b = plain_star(1.0 * SOLAR_MASS_KG, crate::constants::SOLAR_LUMINOSITY_W);
        let orbit = generate_binary_orbit(
            &mut rng,
            &mut a,
            &mut b,
            DEFAULT_LOG_PERIOD_MEAN_DAYS,
            DEFAULT_LOG_PERIOD_SIGMA_DAYS,
            crate::constants::DEFAULT_COIL_TEMP_LIMIT_K,
        );
        let mass_sol_total = 3.0;
        let lo_days = 50.0 * 365.0 * mass_sol_total.powf(0.3);
        let hi_days = 2500.0 * 365.0 * mass_sol_total.powf(0.3);
        let period_days = orbit.period_s / 86_400.0;
        assert!(period_days >= lo_days * 0.999 && period_days <= hi_days * 1.001);
        assert!(orbit.eccentricity < 1.0 && orbit.eccentricity >= 0.0);
    }

    #[test]
    fn semi_major_axes_split_by_mass_ratio() {
        let seq = SeedSequence::from_str("binary-split");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let mut a = plain_star(2.0 * SOLAR_MASS_KG, 4.0 * crate::constants::SOLAR_LUMINOSITY_W);
        let mut b = plain_star(1.0 * SOLAR_MASS_KG, crate::constants::SOLAR_LUMINOSITY_W);
        let orbit = generate_binary_orbit(
            &mut rng,
            &mut a,
            &mut b,
            DEFAULT_LOG_PERIOD_MEAN_DAYS,
            DEFAULT_LOG_PERIOD_SIGMA_DAYS,
            crate::constants::DEFAULT_COIL_TEMP_LIMIT_K,
        );
        assert!(orbit.star_a.semi_major_axis_m < orbit.star_b.semi_major_axis_m);
        let total = orbit.star_a.semi_major_axis_m + orbit.star_b.semi_major_axis_m;
        assert!((total - orbit.semi_major_axis_m).abs() / orbit.semi_major_axis_m < 1e-9);
    }
}
