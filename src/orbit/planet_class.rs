//! Planet-class classifier, "JudgeLargePlanets".
//!
//! Grounded on `original_source/.../OrbitalGenerator.cpp`'s
//! `JudgeLargePlanets`/`PlanetToAsteroidCluster`. That routine compares
//! `newCoreMass/radius` against a pre-main-sequence-scaled threshold
//! without naming which "radius" — at this stage no planet radius has
//! been computed yet (that happens during composition, further down
//! the pipeline), so the only distance available is the core's own
//! orbital semi-major axis; this module uses that reading (documented
//! in DESIGN.md as an Open Question resolution), consistent with the
//! source's `AU`-scale threshold constant `4.638759e16`.

use crate::constants::EARTH_MASS_KG;
use crate::model::PlanetType;
use crate::orbit::cores::ProtoCore;
use crate::orbit::{equilibrium_temperature_k, prev_main_sequence_luminosity_w, WorkingPlanet};
use crate::random::RandomEngine;

/// Classifies one core into a `WorkingPlanet`, or `None` if it was
/// deleted outright (cores below 1e19 kg are deleted outright).
pub fn classify_core(
    rng: &mut RandomEngine,
    core: ProtoCore,
    progenitor_initial_mass_sol: f64,
    frost_line_au: f64,
    habitable_zone_au: (f64, f64),
    asteroid_upper_limit_kg: f64,
) -> Option<WorkingPlanet> {
    let a_au = core.semi_major_axis_m / crate::constants::AU_M;
    let beyond_frost_line = a_au > frost_line_au;

    let new_core_mass_kg = if beyond_frost_line {
        core.mass_kg * 2.35
    } else {
        core.mass_kg
    };

    let pms_luminosity_w = prev_main_sequence_luminosity_w(progenitor_initial_mass_sol);
    let pms_temp_k = equilibrium_temperature_k(pms_luminosity_w, core.semi_major_axis_m);
    let threshold_base = pms_temp_k * 4.638_759e16;

    let density_proxy = new_core_mass_kg / core.semi_major_axis_m.max(1.0);
    let in_habitable_zone = a_au >= habitable_zone_au.0 && a_au <= habitable_zone_au.1;

    let mut planet_type = if density_proxy > threshold_base / 4.0 {
        PlanetType::GasGiant
    } else if density_proxy > threshold_base / 8.0 {
        PlanetType::IceGiant
    } else if density_proxy > threshold_base / 18.0 && in_habitable_zone && !beyond_frost_line {
        PlanetType::Oceanic
    } else if !beyond_frost_line {
        PlanetType::Rocky
    } else {
        PlanetType::IcePlanet
    };

    if new_core_mass_kg < 1e19 {
        return None;
    }

    let scale = new_core_mass_kg / core.mass_kg.max(1.0);
    let mut core_z_kg = core.core_z_kg * scale;
    let mut core_volatiles_kg = core.core_volatiles_kg * scale;
    let mut core_energetic_nuclide_kg = core.core_energetic_nuclide_kg * scale;
    let mut mass_kg = new_core_mass_kg;

    if mass_kg < asteroid_upper_limit_kg {
        planet_type = if beyond_frost_line {
            PlanetType::RockyIceAsteroidCluster
        } else {
            PlanetType::RockyAsteroidCluster
        };
    } else if mass_kg < 0.1 * EARTH_MASS_KG && rng.bernoulli(0.4) {
        planet_type = if beyond_frost_line {
            PlanetType::RockyIceAsteroidCluster
        } else {
            PlanetType::RockyAsteroidCluster
        };
        let demotion = 10f64.powf(rng.uniform(-3.0, 0.0));
        mass_kg *= demotion;
        core_z_kg *= demotion;
        core_volatiles_kg *= demotion;
        core_energetic_nuclide_kg *= demotion;
    }

    Some(WorkingPlanet {
        planet_type,
        mass_kg,
        semi_major_axis_m: core.semi_major_axis_m,
        eccentricity: core.eccentricity,
        inclination_rad: core.inclination_rad,
        longitude_ascending_node_rad: core.longitude_ascending_node_rad,
        argument_of_periapsis_rad: core.argument_of_periapsis_rad,
        true_anomaly_rad: core.true_anomaly_rad,
        migration: false,
        original_semi_major_axis_m: None,
        beyond_frost_line,
        radius_inflation: 1.0,
        core_z_kg,
        core_volatiles_kg,
        core_energetic_nuclide_kg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeedSequence;

    fn sample_core(mass_kg: f64, a_au: f64) -> ProtoCore {
        ProtoCore {
            mass_kg,
            semi_major_axis_m: a_au * crate::constants::AU_M,
            eccentricity: 0.01,
            inclination_rad: 0.01,
            longitude_ascending_node_rad: 0.0,
            argument_of_periapsis_rad: 0.0,
            true_anomaly_rad: 0.0,
            core_z_kg: mass_kg * 0.9,
            core_volatiles_kg: mass_kg * 0.09,
            core_energetic_nuclide_kg: mass_kg * 0.01,
        }
    }

    #[test]
    fn tiny_core_is_deleted() {
        let seq = SeedSequence::from_str("classify-tiny");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let core = sample_core(1e15, 1.0);
        assert!(classify_core(&mut rng, core, 1.0, 4.0, (0.9, 1.4), 1e21).is_none());
    }

    #[test]
    fn sub_asteroid_upper_limit_becomes_cluster() {
        let seq = SeedSequence::from_str("classify-cluster");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let core = sample_core(1e20, 1.0);
        let classified = classify_core(&mut rng, core, 1.0, 4.0, (0.9, 1.4), 1e21).unwrap();
        assert!(classified.planet_type.is_asteroid_cluster());
    }

    #[test]
    fn massive_core_beyond_frost_line_is_not_oceanic() {
        let seq = SeedSequence::from_str("classify-giant");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let core = sample_core(200.0 * EARTH_MASS_KG, 6.0);
        let classified = classify_core(&mut rng, core, 1.0, 4.0, (0.9, 1.4), 1e21).unwrap();
        assert_ne!(classified.planet_type, PlanetType::Oceanic);
    }
}
