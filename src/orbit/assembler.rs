//! System assembler.
//!
//! Grounded on `original_source/.../OrbitalGenerator.cpp`'s tail of
//! `GenerateOrbitals`: the Kepler rewrite pass, the "copy orbital
//! period into unset spin" pass, and the final asteroid-cluster
//! demotion. The source does all three by walking its flat
//! `Planets`/`Orbits` vectors in place; here `crate::orbital_generator`
//! drives the same three passes against the `StellarSystem` arena.

use crate::complex_mass::{kg_from_f64, ComplexMass};
use crate::model::{AsteroidCluster, AsteroidKind, Normal, Planet, PlanetType};
use crate::orbit::composition::ComposedPlanet;
use crate::orbit::WorkingPlanet;

/// Converts a core-mass core whose classifier (or a later filter step)
/// left it typed as a rocky/rocky-ice asteroid cluster directly into a
/// top-level `AsteroidCluster`, bypassing the `ComposedPlanet`/`Planet`
/// path entirely — radius, spin, atmosphere and ocean are meaningless
/// for a body this small. Preferred over converting a fully-composed
/// `Planet` after the fact, since nothing upstream of this needs to
/// build one for a body that was already known to be cluster-typed
/// coming out of the classifier and filter stages.
pub fn asteroid_cluster_from_working(working: &WorkingPlanet) -> AsteroidCluster {
    let kind = match working.planet_type {
        PlanetType::RockyIceAsteroidCluster => AsteroidKind::RockyIce,
        _ => AsteroidKind::Rocky,
    };
    AsteroidCluster {
        kind,
        mass: ComplexMass::new(
            kg_from_f64(working.core_z_kg),
            kg_from_f64(working.core_volatiles_kg),
            kg_from_f64(working.core_energetic_nuclide_kg),
        ),
    }
}

/// Converts one composed working planet into its public `model::Planet`
/// form. Shared by the top-level planet path (`orbital_generator`) and
/// the moon path (`garnish::generate_moons`), which both finish a
/// `WorkingPlanet`/`ComposedPlanet` pair the same way.
pub fn to_model_planet(
    working: &WorkingPlanet,
    composed: &ComposedPlanet,
    age_s: f64,
    normal: Normal,
    distance_from_host_m: f64,
) -> Planet {
    Planet {
        planet_type: composed.planet_type,
        age_s,
        radius_m: composed.radius_m,
        spin_s: composed.spin_s,
        oblateness: composed.oblateness,
        balance_temperature_k: composed.balance_temperature_k,
        crust_mineral_mass_kg: kg_from_f64(composed.crust_mineral_mass_kg),
        migration: working.migration,
        atmosphere: ComplexMass::new(
            kg_from_f64(composed.atmosphere_z_kg),
            kg_from_f64(composed.atmosphere_volatiles_kg),
            kg_from_f64(composed.atmosphere_energetic_nuclide_kg),
        ),
        ocean: ComplexMass::new(
            kg_from_f64(composed.ocean_z_kg),
            kg_from_f64(composed.ocean_volatiles_kg),
            kg_from_f64(composed.ocean_energetic_nuclide_kg),
        ),
        core: ComplexMass::new(
            kg_from_f64(composed.core_z_kg),
            kg_from_f64(composed.core_volatiles_kg),
            kg_from_f64(composed.core_energetic_nuclide_kg),
        ),
        normal,
        original_semi_major_axis_m: working.original_semi_major_axis_m,
        moons: Vec::new(),
        rings: None,
        trojans: None,
        distance_from_host_m,
    }
}

/// Kepler's third law period for a body of semi-major axis `a_m`
/// around a parent of mass `parent_mass_kg`.
pub fn kepler_period_s(a_m: f64, parent_mass_kg: f64) -> f64 {
    if parent_mass_kg <= 0.0 || a_m <= 0.0 {
        return 0.0;
    }
    (4.0 * std::f64::consts::PI.powi(2) * a_m.powi(3) / (crate::constants::G * parent_mass_kg)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kepler_period_matches_earth_year() {
        let period = kepler_period_s(crate::constants::AU_M, crate::constants::SOLAR_MASS_KG);
        let year_s = crate::constants::YEAR_S;
        assert!((period - year_s).abs() / year_s < 0.01);
    }

    #[test]
    fn asteroid_demotion_keeps_the_core_mass() {
        let working = WorkingPlanet {
            planet_type: PlanetType::RockyAsteroidCluster,
            mass_kg: 1e20,
            semi_major_axis_m: crate::constants::AU_M,
            eccentricity: 0.0,
            inclination_rad: 0.0,
            longitude_ascending_node_rad: 0.0,
            argument_of_periapsis_rad: 0.0,
            true_anomaly_rad: 0.0,
            migration: false,
            original_semi_major_axis_m: None,
            beyond_frost_line: false,
            radius_inflation: 1.0,
            core_z_kg: 9e19,
            core_volatiles_kg: 9e18,
            core_energetic_nuclide_kg: 1e18,
        };
        let cluster = asteroid_cluster_from_working(&working);
        assert_eq!(cluster.kind, AsteroidKind::Rocky);
        let expected = kg_from_f64(9e19) + kg_from_f64(9e18) + kg_from_f64(1e18);
        assert_eq!(cluster.mass.total(), expected);
    }

    #[test]
    fn to_model_planet_carries_composed_masses() {
        let working = WorkingPlanet {
            planet_type: PlanetType::Rocky,
            mass_kg: EARTH_MASS_KG_FOR_TEST,
            semi_major_axis_m: crate::constants::AU_M,
            eccentricity: 0.01,
            inclination_rad: 0.0,
            longitude_ascending_node_rad: 0.0,
            argument_of_periapsis_rad: 0.0,
            true_anomaly_rad: 0.0,
            migration: false,
            original_semi_major_axis_m: None,
            beyond_frost_line: false,
            radius_inflation: 1.0,
            core_z_kg: EARTH_MASS_KG_FOR_TEST * 0.9,
            core_volatiles_kg: EARTH_MASS_KG_FOR_TEST * 0.09,
            core_energetic_nuclide_kg: EARTH_MASS_KG_FOR_TEST * 0.01,
        };
        let composed = ComposedPlanet {
            planet_type: PlanetType::Rocky,
            radius_m: 6.3e6,
            core_z_kg: working.core_z_kg,
            core_volatiles_kg: working.core_volatiles_kg,
            core_energetic_nuclide_kg: working.core_energetic_nuclide_kg,
            atmosphere_z_kg: 0.0,
            atmosphere_volatiles_kg: 0.0,
            atmosphere_energetic_nuclide_kg: 0.0,
            ocean_z_kg: 0.0,
            ocean_volatiles_kg: 0.0,
            ocean_energetic_nuclide_kg: 0.0,
            crust_mineral_mass_kg: 0.0,
            spin_s: 1000.0,
            oblateness: 0.0,
            balance_temperature_k: 280.0,
        };
        let planet = to_model_planet(&working, &composed, 1e9, Normal::default(), 0.0);
        assert_eq!(planet.core.total(), kg_from_f64(working.core_z_kg) + kg_from_f64(working.core_volatiles_kg) + kg_from_f64(working.core_energetic_nuclide_kg));
    }

    const EARTH_MASS_KG_FOR_TEST: f64 = 5.972e24;
}
