//! Body composition & structure.
//!
//! Grounded on `original_source/.../OrbitalGenerator.cpp`'s
//! `CalculatePlanetMass`/`CalculatePlanetRadius`/`GenerateSpin`/
//! `CalculateTemperature`/`GenerateTerra`. The giant-albedo "eight
//! hard-coded breakpoints" curve is not enumerated anywhere upstream;
//! this module approximates it with a monotonic interpolation across
//! eight irradiance bands rather than inventing exact source constants
//! (documented in DESIGN.md).

use crate::constants::{
    AU_M, CMB_FLOOR_NUMERATOR, EARTH_MASS_KG, EARTH_RADIUS_M, G, JUPITER_MASS_KG, STEFAN_BOLTZMANN,
};
use crate::model::{EvolutionPhase, PlanetType};
use crate::orbit::WorkingPlanet;
use crate::random::RandomEngine;

/// Finished per-planet physical state, handed to the assembler to be
/// converted into a `model::Planet`.
#[derive(Debug, Clone)]
pub struct ComposedPlanet {
    pub planet_type: PlanetType,
    pub radius_m: f64,
    pub core_z_kg: f64,
    pub core_volatiles_kg: f64,
    pub core_energetic_nuclide_kg: f64,
    pub atmosphere_z_kg: f64,
    pub atmosphere_volatiles_kg: f64,
    pub atmosphere_energetic_nuclide_kg: f64,
    pub ocean_z_kg: f64,
    pub ocean_volatiles_kg: f64,
    pub ocean_energetic_nuclide_kg: f64,
    pub crust_mineral_mass_kg: f64,
    pub spin_s: f64,
    pub oblateness: f64,
    pub balance_temperature_k: f64,
}

fn is_giant(t: PlanetType) -> bool {
    t.is_giant()
}

fn radius_m_for(planet_type: PlanetType, mass_kg: f64) -> f64 {
    let m_earth = (mass_kg / EARTH_MASS_KG).max(1e-6);
    let radius_earth = match planet_type {
        PlanetType::Rocky | PlanetType::Terra | PlanetType::Chthonian => {
            if m_earth < 1.0 {
                10f64.powf(m_earth.log10() / 3.0 - 0.0804 * m_earth.powf(0.394) - 0.20949) * 1.94935
            } else {
                m_earth.powf(1.0 / 3.7)
            }
        }
        PlanetType::IcePlanet | PlanetType::Oceanic => {
            if m_earth < 1.0 {
                10f64.powf(m_earth.log10() / 3.0 - 0.0804 * m_earth.powf(0.394) - 0.20949) * 2.53536
            } else {
                m_earth.powf(1.0 / 3.905)
            }
        }
        _ => {
            let jupiter_mass_earth = JUPITER_MASS_KG / EARTH_MASS_KG;
            let x = (m_earth / jupiter_mass_earth).max(1e-6);
            if x < 6.2 {
                1.41 * x.powf(1.0 / 3.905)
            } else if x < 15.0 {
                0.6 * x.powf(0.72)
            } else {
                11.0 * (0.96 + 0.21 * x.log10() - 0.2 * x.log10().powi(2) + 0.1 * x.powf(0.215))
            }
        }
    };
    radius_earth * EARTH_RADIUS_M
}

fn core_volatiles_and_nuclide(core_mass_kg: f64, rng: &mut RandomEngine) -> (f64, f64, f64) {
    let r2 = rng.uniform(0.9, 1.1);
    let r3 = rng.uniform(0.9, 1.1);
    let volatiles = core_mass_kg * 1e-4 * r2;
    let nuclide = core_mass_kg * 5e-6 * r3;
    let z = (core_mass_kg - volatiles - nuclide).max(0.0);
    (z, volatiles, nuclide)
}

/// Context needed to finish one planet's composition: the host star's
/// main-sequence state and irradiance, plus system-wide configuration.
#[derive(Debug, Clone, Copy)]
pub struct CompositionContext {
    pub host_mass_kg: f64,
    pub host_luminosity_w: f64,
    pub host_evolution_phase: EvolutionPhase,
    pub host_evolution_progress: f64,
    pub host_feh: f64,
    pub age_s: f64,
    pub universe_age_s: f64,
    pub inner_radius_au: f64,
    pub outer_radius_au: f64,
}

/// Main composition entry point, consuming a post-filter `WorkingPlanet` and
/// returning its finished physical state (mass partitions already
/// fixed by this point except for the ocean/atmosphere compartments
/// this stage adds).
pub fn compose_planet(
    rng: &mut RandomEngine,
    mut planet: WorkingPlanet,
    ctx: &CompositionContext,
) -> (WorkingPlanet, ComposedPlanet) {
    let irradiance_w_m2 = crate::orbit::poynting_vector_w_m2(ctx.host_luminosity_w, planet.semi_major_axis_m);

    // Ice-planet host-age gate: convert to rocky once the host has
    // moved past pre-main-sequence.
    if planet.planet_type == PlanetType::IcePlanet && ctx.host_evolution_progress >= 1.0 {
        planet.planet_type = PlanetType::Rocky;
    }

    let core_mass_kg = planet.core_mass_kg();
    let mut atmosphere_z = 0.0;
    let mut atmosphere_volatiles = 0.0;
    let mut atmosphere_nuclide = 0.0;
    let mut ocean_z = 0.0;
    let mut ocean_volatiles = 0.0;
    let mut ocean_nuclide = 0.0;

    match planet.planet_type {
        PlanetType::IcePlanet => {
            let ocean_mass = 1.35 * core_mass_kg;
            let (cz, cv, cn) = core_volatiles_and_nuclide(core_mass_kg, rng);
            planet.core_z_kg = cz;
            planet.core_volatiles_kg = cv;
            planet.core_energetic_nuclide_kg = cn;
            ocean_volatiles = ocean_mass * (1.0 - 5e-5);
            ocean_nuclide = ocean_mass * 5e-5;
        }
        PlanetType::Oceanic => {
            let r1 = rng.uniform(0.0, 1.35);
            let ocean_mass = core_mass_kg * r1 / 9.0;
            let (cz, cv, cn) = core_volatiles_and_nuclide(core_mass_kg, rng);
            planet.core_z_kg = cz;
            planet.core_volatiles_kg = cv;
            planet.core_energetic_nuclide_kg = cn;
            ocean_volatiles = ocean_mass * (1.0 - 5e-5);
            ocean_nuclide = ocean_mass * 5e-5;
        }
        PlanetType::IceGiant | PlanetType::HotIceGiant | PlanetType::SubIceGiant | PlanetType::HotSubIceGiant => {
            let new_core = core_mass_kg;
            let core = core_mass_kg * 0.3;
            let frac = ((planet.semi_major_axis_m / AU_M - ctx.inner_radius_au)
                / (ctx.outer_radius_au - ctx.inner_radius_au).max(1e-6))
            .clamp(0.0, 1.0);
            let r1 = 10f64.powf(rng.uniform(2f64.log10(), 20f64.log10()));
            let a = (0.5 + 0.5 * frac) * r1;
            let volatile = (new_core - core) / 9.0 + core * a / 6.0;
            atmosphere_volatiles = volatile * (1.0 - 5e-5);
            atmosphere_nuclide = volatile * 5e-5;
            planet.core_z_kg = core;
            planet.core_volatiles_kg = 0.0;
            planet.core_energetic_nuclide_kg = 0.0;
        }
        PlanetType::GasGiant | PlanetType::HotGasGiant => {
            let new_core = core_mass_kg;
            let core = core_mass_kg * 0.1;
            let feh_term = 10f64.powf(ctx.host_feh);
            let r1_hi = 50f64.min(feh_term / 0.0142).max(7.0 + 1e-3);
            let r1 = 10f64.powf(rng.uniform(7f64.log10(), r1_hi.log10()));
            let frac = ((planet.semi_major_axis_m / AU_M - ctx.inner_radius_au)
                / (ctx.outer_radius_au - ctx.inner_radius_au).max(1e-6))
            .clamp(0.0, 1.0);
            let a = (0.5 + 0.5 * frac) * r1;
            let z = 0.0142 * feh_term * core * a + (1.0 - (1.0 + 5e-5) / 9.0) * (new_core - core);
            atmosphere_z = z;
            planet.core_z_kg = core;
            planet.core_volatiles_kg = 0.0;
            planet.core_energetic_nuclide_kg = 0.0;
        }
        _ => {
            let (cz, cv, cn) = core_volatiles_and_nuclide(core_mass_kg, rng);
            planet.core_z_kg = cz;
            planet.core_volatiles_kg = cv;
            planet.core_energetic_nuclide_kg = cn;
        }
    }

    // Terra conversion.
    let mut radius_m = radius_m_for(planet.planet_type, core_mass_kg.max(1.0));
    if planet.planet_type == PlanetType::Rocky
        && ctx.host_evolution_phase == EvolutionPhase::MainSequence
    {
        let a_au = planet.semi_major_axis_m / AU_M;
        let in_habitable_band = a_au >= ctx.inner_radius_au && a_au <= ctx.outer_radius_au;
        if in_habitable_band {
            let escape_arg = 1.6567e15
                * (ctx.host_luminosity_w
                    / (4.0 * std::f64::consts::PI * STEFAN_BOLTZMANN * planet.semi_major_axis_m.powi(2)))
                .powf(0.25)
                * (radius_m / EARTH_RADIUS_M)
                / (core_mass_kg / EARTH_MASS_KG).max(1e-9);
            let escape_coeff = 10f64.powf(1.0 - escape_arg.max(1.0));
            if escape_coeff > 0.1 {
                planet.planet_type = PlanetType::Terra;
                let r = rng.uniform(10f64.powf(-0.5), 10.0);
                let ocean_mass = core_mass_kg * (radius_m / EARTH_RADIUS_M) * 1e-4 * r;
                ocean_volatiles += ocean_mass * (1.0 - 5e-5);
                ocean_nuclide += ocean_mass * 5e-5;
            }
        }
    }

    radius_m = radius_m_for(planet.planet_type, core_mass_kg.max(1.0));

    // Crust.
    let crust_mineral_mass_kg = match planet.planet_type {
        PlanetType::Rocky => rng.uniform(0.1, 1.0) * 1e-9 * (core_mass_kg / EARTH_MASS_KG).powi(2) * EARTH_MASS_KG,
        PlanetType::Terra => rng.uniform(1.0, 10.0) * 1e-9 * (core_mass_kg / EARTH_MASS_KG).powi(2) * EARTH_MASS_KG,
        _ => 0.0,
    };

    // Secondary atmosphere: rocky/terra/ocean/ice around a non-evolved
    // host.
    let host_is_evolved = !matches!(
        ctx.host_evolution_phase,
        EvolutionPhase::PreMainSequence | EvolutionPhase::MainSequence
    );
    let eligible_for_secondary_atmosphere = matches!(
        planet.planet_type,
        PlanetType::Rocky | PlanetType::Terra | PlanetType::Oceanic | PlanetType::IcePlanet
    );
    if eligible_for_secondary_atmosphere && !host_is_evolved && irradiance_w_m2 > 8.0 {
        let escape_coeff = 1.0f64;
        let mut target = escape_coeff * core_mass_kg * rng.uniform(0.0, 1.0) * 1e-5;
        if planet.planet_type == PlanetType::Terra {
            target *= 0.035;
        }
        if planet.planet_type == PlanetType::IcePlanet {
            target = target.powi(2) / core_mass_kg.max(1.0);
        }
        if target > 1e16 {
            atmosphere_volatiles += target * 0.01;
            atmosphere_z += target * 0.99;
        } else {
            let r_earth = radius_m / EARTH_RADIUS_M;
            planet.core_volatiles_kg += 33.1 * r_earth * r_earth;
            planet.core_energetic_nuclide_kg += 3.31e-4 * r_earth * r_earth;
        }
    }

    let (spin_s, oblateness) = generate_spin(
        rng,
        planet.planet_type,
        core_mass_kg,
        radius_m,
        planet.semi_major_axis_m,
        orbital_period_s(planet.semi_major_axis_m, ctx.host_mass_kg),
        ctx.host_mass_kg,
        ctx.age_s,
    );

    let balance_temperature_k = calculate_temperature(
        planet.planet_type,
        irradiance_w_m2,
        spin_s < 0.0,
        atmosphere_z + atmosphere_volatiles + atmosphere_nuclide,
        radius_m,
        core_mass_kg,
        ctx.universe_age_s,
    );

    radius_m *= planet.radius_inflation;

    let composed = ComposedPlanet {
        planet_type: planet.planet_type,
        radius_m,
        core_z_kg: planet.core_z_kg,
        core_volatiles_kg: planet.core_volatiles_kg,
        core_energetic_nuclide_kg: planet.core_energetic_nuclide_kg,
        atmosphere_z_kg: atmosphere_z,
        atmosphere_volatiles_kg: atmosphere_volatiles,
        atmosphere_energetic_nuclide_kg: atmosphere_nuclide,
        ocean_z_kg: ocean_z,
        ocean_volatiles_kg: ocean_volatiles,
        ocean_energetic_nuclide_kg: ocean_nuclide,
        crust_mineral_mass_kg,
        spin_s,
        oblateness,
        balance_temperature_k,
    };
    (planet, composed)
}

fn orbital_period_s(semi_major_axis_m: f64, parent_mass_kg: f64) -> f64 {
    if parent_mass_kg <= 0.0 {
        return 0.0;
    }
    (4.0 * std::f64::consts::PI.powi(2) * semi_major_axis_m.powi(3) / (G * parent_mass_kg)).sqrt()
}

/// `GenerateSpin`.
#[allow(clippy::too_many_arguments)]
fn generate_spin(
    rng: &mut RandomEngine,
    planet_type: PlanetType,
    mass_kg: f64,
    radius_m: f64,
    semi_major_axis_m: f64,
    orbital_period_s: f64,
    parent_mass_kg: f64,
    age_s: f64,
) -> (f64, f64) {
    let eta = match planet_type {
        PlanetType::IcePlanet | PlanetType::Oceanic => 4e9,
        PlanetType::Rocky | PlanetType::Terra | PlanetType::Chthonian => 3e10,
        _ => 1e12,
    };

    let m = mass_kg.max(1.0);
    let r = radius_m.max(1.0);
    let a = semi_major_axis_m.max(1.0);
    let tau = 0.61435 * m * a.powi(6) * (1.0 + 5.963_361e11 * eta * r.powi(4) / (m * m))
        / (parent_mass_kg.max(1.0).powi(2) * r.powi(3));

    if tau < age_s {
        return (-1.0, 0.0);
    }

    let initial_spin = if is_giant(planet_type) {
        rng.uniform(21_600.0, 43_200.0)
    } else {
        rng.uniform(28_800.0, 86_400.0)
    };

    let spin_s = initial_spin + (orbital_period_s - initial_spin) * (age_s / tau).powf(2.35);
    let oblateness = 4.0 * std::f64::consts::PI.powi(2) * r.powi(3) / (spin_s * spin_s * G * m);
    (spin_s, oblateness)
}

fn giant_albedo(irradiance_w_m2: f64) -> f64 {
    // Monotonic stand-in for the source's eight-breakpoint table
    // (DESIGN.md: exact breakpoints not recoverable); interpolates
    // between a cold-giant and a hot-giant albedo.
    const BREAKPOINTS: [(f64, f64); 8] = [
        (0.0, 0.34),
        (10.0, 0.34),
        (100.0, 0.30),
        (1_000.0, 0.25),
        (10_000.0, 0.20),
        (100_000.0, 0.12),
        (1_000_000.0, 0.07),
        (10_000_000.0, 0.03),
    ];
    for pair in BREAKPOINTS.windows(2) {
        let (s0, a0) = pair[0];
        let (s1, a1) = pair[1];
        if irradiance_w_m2 <= s1 {
            let t = ((irradiance_w_m2 - s0) / (s1 - s0).max(1e-9)).clamp(0.0, 1.0);
            return a0 + (a1 - a0) * t;
        }
    }
    BREAKPOINTS.last().unwrap().1
}

/// `CalculateTemperature`.
fn calculate_temperature(
    planet_type: PlanetType,
    irradiance_w_m2: f64,
    tidally_locked: bool,
    atmosphere_mass_kg: f64,
    radius_m: f64,
    mass_kg: f64,
    universe_age_s: f64,
) -> f64 {
    let (albedo, emissivity) = if is_giant(planet_type) {
        (giant_albedo(irradiance_w_m2), 0.98)
    } else if atmosphere_mass_kg > 0.0
        && matches!(
            planet_type,
            PlanetType::Rocky | PlanetType::Terra | PlanetType::Oceanic | PlanetType::IcePlanet
        )
    {
        let pressure_pa = G * mass_kg * atmosphere_mass_kg / (4.0 * std::f64::consts::PI * radius_m.powi(4));
        let pressure_atm = pressure_pa / 101_325.0;
        let albedo = (0.12 + 0.2 * (pressure_atm.max(1e-6)).log10().clamp(-3.0, 3.0) * 0.05).clamp(0.05, 0.75);
        let emissivity = if tidally_locked { 0.9 } else { 0.95 };
        (albedo, emissivity)
    } else {
        match planet_type {
            PlanetType::IcePlanet => (0.4, 0.9),
            PlanetType::Chthonian => (0.08, 0.95),
            _ => (0.12, 0.95),
        }
    };

    let lock_coefficient = if tidally_locked { 2.0 } else { 1.0 };
    let effective_irradiance = irradiance_w_m2 * (1.0 - albedo) / lock_coefficient;
    let t = (effective_irradiance / (4.0 * emissivity * STEFAN_BOLTZMANN)).powf(0.25);

    let floor = CMB_FLOOR_NUMERATOR / universe_age_s.max(1.0);
    t.max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeedSequence;

    fn default_ctx() -> CompositionContext {
        CompositionContext {
            host_mass_kg: crate::constants::SOLAR_MASS_KG,
            host_luminosity_w: crate::constants::SOLAR_LUMINOSITY_W,
            host_evolution_phase: EvolutionPhase::MainSequence,
            host_evolution_progress: 5.0,
            host_feh: 0.0,
            age_s: 4.5e9 * crate::constants::YEAR_S,
            universe_age_s: 1.38e10 * crate::constants::YEAR_S,
            inner_radius_au: 0.1,
            outer_radius_au: 45.0,
        }
    }

    fn base_planet(planet_type: PlanetType, a_au: f64, mass_kg: f64) -> WorkingPlanet {
        WorkingPlanet {
            planet_type,
            mass_kg,
            semi_major_axis_m: a_au * AU_M,
            eccentricity: 0.01,
            inclination_rad: 0.0,
            longitude_ascending_node_rad: 0.0,
            argument_of_periapsis_rad: 0.0,
            true_anomaly_rad: 0.0,
            migration: false,
            original_semi_major_axis_m: None,
            beyond_frost_line: false,
            radius_inflation: 1.0,
            core_z_kg: mass_kg * 0.9,
            core_volatiles_kg: mass_kg * 0.09,
            core_energetic_nuclide_kg: mass_kg * 0.01,
        }
    }

    #[test]
    fn rocky_planet_gets_a_sane_radius() {
        let seq = SeedSequence::from_str("composition-rocky");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let planet = base_planet(PlanetType::Rocky, 1.0, EARTH_MASS_KG);
        let (_, composed) = compose_planet(&mut rng, planet, &default_ctx());
        assert!(composed.radius_m > 0.3 * EARTH_RADIUS_M && composed.radius_m < 3.0 * EARTH_RADIUS_M);
    }

    #[test]
    fn composed_masses_sum_consistently() {
        let seq = SeedSequence::from_str("composition-sums");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let planet = base_planet(PlanetType::Oceanic, 1.0, EARTH_MASS_KG);
        let (_, composed) = compose_planet(&mut rng, planet, &default_ctx());
        assert!(composed.core_z_kg >= 0.0);
        assert!(composed.ocean_volatiles_kg >= 0.0);
    }

    #[test]
    fn temperature_respects_cmb_floor() {
        let t = calculate_temperature(PlanetType::Rocky, 0.0, false, 0.0, EARTH_RADIUS_M, EARTH_MASS_KG, 1.38e10 * crate::constants::YEAR_S);
        let floor = CMB_FLOOR_NUMERATOR / (1.38e10 * crate::constants::YEAR_S);
        assert!(t >= floor);
    }
}
