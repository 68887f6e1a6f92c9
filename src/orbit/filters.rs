//! Orbital-filter pipeline, applied in strict order.
//!
//! Grounded on `original_source/.../OrbitalGenerator.cpp`'s filter
//! section of `GeneratePlanets`. The source mutates its `Planets`
//! vector mid-iteration (`Planets.erase(Planets.begin()+i, end())` in
//! some stages, `erase(i); --i; continue;` in others); DESIGN.md Open
//! Question 1 resolves this as "restart the sweep after any deletion",
//! which in Rust is simply rebuilding the working vector (`retain`,
//! or an explicit index loop that re-reads `planets.len()` each pass)
//! rather than mimicking the C++ iterator arithmetic.

use crate::model::{EvolutionPhase, PlanetType};
use crate::orbit::{poynting_vector_w_m2, WorkingPlanet};
use crate::random::RandomEngine;

#[derive(Debug, Clone, Copy)]
pub struct HostStarInfo {
    pub mass_kg: f64,
    pub initial_mass_sol: f64,
    pub radius_m: f64,
    pub luminosity_w: f64,
    pub evolution_phase: EvolutionPhase,
    pub age_s: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryContext {
    pub companion: HostStarInfo,
    pub binary_separation_m: f64,
    pub binary_eccentricity: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterContext {
    pub host: HostStarInfo,
    pub binary: Option<BinaryContext>,
    pub asteroid_upper_limit_kg: f64,
    pub disk_inner_radius_au: f64,
}

fn is_post_main_sequence(phase: EvolutionPhase) -> bool {
    !matches!(phase, EvolutionPhase::PreMainSequence | EvolutionPhase::MainSequence)
}

fn is_white_dwarf(phase: EvolutionPhase) -> bool {
    matches!(
        phase,
        EvolutionPhase::HeliumWd | EvolutionPhase::CoWd | EvolutionPhase::ONeMgWd
    )
}

/// Total irradiance at distance `a_m` from the host, adding the
/// companion's contribution at its binary separation when present
/// summed over both stars when the host is part of a binary.
fn total_irradiance(ctx: &FilterContext, a_m: f64) -> f64 {
    let mut s = poynting_vector_w_m2(ctx.host.luminosity_w, a_m);
    if let Some(bin) = &ctx.binary {
        s += poynting_vector_w_m2(bin.companion.luminosity_w, a_m + bin.binary_separation_m);
    }
    s
}

pub fn apply_filters(
    rng: &mut RandomEngine,
    planets: &mut Vec<WorkingPlanet>,
    ctx: &FilterContext,
    habitable_zone_outer_au: f64,
) {
    binary_stability(planets, ctx);
    giant_migration(rng, planets, ctx);
    stellar_engulfment(planets, ctx);
    chthonian_promotion(planets, ctx);
    wd_scattering(rng, planets, ctx);
    hot_giant_promotion(planets, ctx);
    oceanic_to_ice(planets, habitable_zone_outer_au);
    thermal_death(planets, ctx);
}

/// Step 1: binary stability, Holman-Wiegert boundary.
fn binary_stability(planets: &mut Vec<WorkingPlanet>, ctx: &FilterContext) {
    let Some(bin) = &ctx.binary else { return };
    let mu = bin.companion.mass_kg / (ctx.host.mass_kg + bin.companion.mass_kg);
    let e = bin.binary_eccentricity;
    let a_bin = bin.binary_separation_m;
    let stable_boundary = a_bin
        * (0.464 - 0.38 * mu - 0.361 * e + 0.586 * mu * e + 0.15 * e * e - 0.198 * mu * e * e);
    planets.retain(|p| p.semi_major_axis_m <= stable_boundary);
}

/// Step 2: giant migration. Only one planet in the whole system ever
/// migrates; scans inside-out.
fn giant_migration(rng: &mut RandomEngine, planets: &mut Vec<WorkingPlanet>, ctx: &FilterContext) {
    planets.sort_by(|a, b| a.semi_major_axis_m.partial_cmp(&b.semi_major_axis_m).unwrap());

    let mut migrated = false;
    let mut i = 0;
    while i < planets.len() {
        if migrated {
            break;
        }
        if !planets[i].planet_type.is_ice_or_gas_giant() {
            i += 1;
            continue;
        }
        if !rng.bernoulli(0.10) {
            i += 1;
            continue;
        }

        migrated = true;
        let original_a = planets[i].semi_major_axis_m;

        if rng.bernoulli(0.80) {
            // Walk in: relocate to a random slot before the current
            // index, deleting everything in between. The giant adopts
            // the target slot's existing orbit unscaled.
            let new_index = if i == 0 { 0 } else { rng.gen_index(i) };
            let mut giant = planets.remove(i);
            giant.migration = true;
            giant.original_semi_major_axis_m = Some(original_a);
            if new_index < planets.len() {
                giant.semi_major_axis_m = planets[new_index].semi_major_axis_m;
            }
            planets.drain(new_index..i.min(planets.len()));
            planets.insert(new_index, giant);
        } else {
            let coeff = if ctx.host.initial_mass_sol <= 0.6 {
                2.0
            } else if ctx.host.initial_mass_sol <= 1.2 {
                10.0
            } else {
                7.0
            };
            let lower_au = ctx.disk_inner_radius_au / coeff;
            let upper_au = ctx.disk_inner_radius_au * 0.67;
            let exponent = lower_au.log10() + rng.uniform01() * (upper_au.log10() - lower_au.log10());
            let new_a_m = 10f64.powf(exponent) * crate::constants::AU_M;
            let mut giant = planets.remove(i);
            giant.migration = true;
            giant.original_semi_major_axis_m = Some(original_a);
            giant.semi_major_axis_m = new_a_m;
            planets.retain(|p| p.semi_major_axis_m > new_a_m);
            planets.push(giant);
            planets.sort_by(|a, b| a.semi_major_axis_m.partial_cmp(&b.semi_major_axis_m).unwrap());
        }
    }
}

/// Step 3: stellar engulfment.
fn stellar_engulfment(planets: &mut Vec<WorkingPlanet>, ctx: &FilterContext) {
    if !is_post_main_sequence(ctx.host.evolution_phase) {
        let radius_m = ctx.host.radius_m;
        planets.retain(|p| p.semi_major_axis_m >= radius_m);
        return;
    }
    let r_max_m = post_ms_envelope_radius_m(ctx.host.initial_mass_sol);
    planets.retain(|p| p.semi_major_axis_m >= r_max_m);
}

fn post_ms_envelope_radius_m(initial_mass_sol: f64) -> f64 {
    let r_max_sol = if initial_mass_sol < 0.75 {
        104.0 * (2.0 * initial_mass_sol).powi(3) + 0.1
    } else {
        400.0 * (initial_mass_sol - 0.75).cbrt()
    };
    r_max_sol * crate::constants::SOLAR_RADIUS_M
}

/// Step 4: Chthonian promotion around white-dwarf hosts.
fn chthonian_promotion(planets: &mut [WorkingPlanet], ctx: &FilterContext) {
    if !is_white_dwarf(ctx.host.evolution_phase) {
        return;
    }
    let r_max_m = post_ms_envelope_radius_m(ctx.host.initial_mass_sol);
    for p in planets.iter_mut() {
        if p.planet_type.is_ice_or_gas_giant() && p.semi_major_axis_m < 2.0 * r_max_m {
            p.planet_type = PlanetType::Chthonian;
            p.mass_kg = p.core_mass_kg();
        }
    }
}

/// Step 5: WD gravitational scattering, once per system.
fn wd_scattering(rng: &mut RandomEngine, planets: &mut [WorkingPlanet], ctx: &FilterContext) {
    if !is_white_dwarf(ctx.host.evolution_phase) || ctx.host.age_s < 1.0e6 * crate::constants::YEAR_S {
        return;
    }
    for p in planets.iter_mut() {
        if p.planet_type != PlanetType::Rocky {
            continue;
        }
        if rng.bernoulli(0.15) {
            p.semi_major_axis_m = rng.uniform(4.0, 20.0) * crate::constants::SOLAR_RADIUS_M;
            return;
        }
    }
}

/// Step 6: hot-giant promotion.
fn hot_giant_promotion(planets: &mut [WorkingPlanet], ctx: &FilterContext) {
    for p in planets.iter_mut() {
        let s = total_irradiance(ctx, p.semi_major_axis_m);
        if s < 10_000.0 {
            continue;
        }
        if let Some(hot) = p.planet_type.hot_variant() {
            p.planet_type = hot;
            p.radius_inflation *= (s / 10_000.0).powf(0.094);
        }
    }
}

/// Step 7: oceanic planets beyond the outer habitable-zone boundary
/// freeze.
fn oceanic_to_ice(planets: &mut [WorkingPlanet], habitable_zone_outer_au: f64) {
    for p in planets.iter_mut() {
        if p.planet_type == PlanetType::Oceanic
            && p.semi_major_axis_m / crate::constants::AU_M > habitable_zone_outer_au
        {
            p.planet_type = PlanetType::IcePlanet;
        }
    }
}

/// Step 8: thermal death.
fn thermal_death(planets: &mut Vec<WorkingPlanet>, ctx: &FilterContext) {
    planets.retain(|p| {
        let s = total_irradiance(ctx, p.semi_major_axis_m);
        if p.planet_type.is_asteroid_cluster() {
            s <= 1.0e6
        } else {
            let t = crate::orbit::equilibrium_temperature_k(
                total_source_luminosity_w(ctx),
                p.semi_major_axis_m,
            );
            t < 2700.0
        }
    });
}

fn total_source_luminosity_w(ctx: &FilterContext) -> f64 {
    ctx.host.luminosity_w + ctx.binary.as_ref().map(|b| b.companion.luminosity_w).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeedSequence;

    fn plain_planet(planet_type: PlanetType, a_au: f64) -> WorkingPlanet {
        WorkingPlanet {
            planet_type,
            mass_kg: crate::constants::EARTH_MASS_KG,
            semi_major_axis_m: a_au * crate::constants::AU_M,
            eccentricity: 0.01,
            inclination_rad: 0.0,
            longitude_ascending_node_rad: 0.0,
            argument_of_periapsis_rad: 0.0,
            true_anomaly_rad: 0.0,
            migration: false,
            original_semi_major_axis_m: None,
            beyond_frost_line: false,
            radius_inflation: 1.0,
            core_z_kg: crate::constants::EARTH_MASS_KG * 0.9,
            core_volatiles_kg: crate::constants::EARTH_MASS_KG * 0.09,
            core_energetic_nuclide_kg: crate::constants::EARTH_MASS_KG * 0.01,
        }
    }

    fn host(mass_sol: f64) -> HostStarInfo {
        HostStarInfo {
            mass_kg: mass_sol * crate::constants::SOLAR_MASS_KG,
            initial_mass_sol: mass_sol,
            radius_m: crate::constants::SOLAR_RADIUS_M,
            luminosity_w: crate::constants::SOLAR_LUMINOSITY_W,
            evolution_phase: EvolutionPhase::MainSequence,
            age_s: 1e9 * crate::constants::YEAR_S,
        }
    }

    #[test]
    fn engulfment_deletes_planets_inside_stellar_radius() {
        let ctx = FilterContext {
            host: host(1.0),
            binary: None,
            asteroid_upper_limit_kg: 1e21,
            disk_inner_radius_au: 0.1,
        };
        let mut planets = vec![
            plain_planet(PlanetType::Rocky, 1e-6),
            plain_planet(PlanetType::Rocky, 1.0),
        ];
        stellar_engulfment(&mut planets, &ctx);
        assert_eq!(planets.len(), 1);
    }

    #[test]
    fn oceanic_beyond_hz_becomes_ice() {
        let mut planets = vec![plain_planet(PlanetType::Oceanic, 5.0)];
        oceanic_to_ice(&mut planets, 1.4);
        assert_eq!(planets[0].planet_type, PlanetType::IcePlanet);
    }

    #[test]
    fn thermal_death_kills_overheated_planet() {
        let ctx = FilterContext {
            host: host(5.0),
            binary: None,
            asteroid_upper_limit_kg: 1e21,
            disk_inner_radius_au: 0.1,
        };
        let mut planets = vec![plain_planet(PlanetType::Rocky, 0.001)];
        thermal_death(&mut planets, &ctx);
        assert!(planets.is_empty());
    }

    #[test]
    fn giant_migration_migrates_at_most_one_planet() {
        let ctx = FilterContext {
            host: host(1.0),
            binary: None,
            asteroid_upper_limit_kg: 1e21,
            disk_inner_radius_au: 0.1,
        };
        let seq = SeedSequence::from_str("migration-test");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let mut planets = vec![
            plain_planet(PlanetType::GasGiant, 2.0),
            plain_planet(PlanetType::GasGiant, 5.0),
            plain_planet(PlanetType::Rocky, 8.0),
        ];
        giant_migration(&mut rng, &mut planets, &ctx);
        assert!(planets.iter().filter(|p| p.migration).count() <= 1);
    }
}
