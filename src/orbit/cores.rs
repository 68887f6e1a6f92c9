//! Core-mass & initial-orbit seeder.
//!
//! Grounded on `original_source/.../OrbitalGenerator.cpp`'s core-mass
//! weighting and semi-major-axis partition loop inside `GeneratePlanets`.

use crate::constants::AU_M;
use crate::orbit::disk::ProtoplanetaryDisk;
use crate::random::RandomEngine;

/// A newly-seeded planetary core, before classification has assigned
/// it a `PlanetType`. Composition fractions are carried as `f64`
/// kilograms; conversion to the `u128` `ComplexMass` representation
/// happens once the core survives the filter pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ProtoCore {
    pub mass_kg: f64,
    pub semi_major_axis_m: f64,
    pub eccentricity: f64,
    pub inclination_rad: f64,
    pub longitude_ascending_node_rad: f64,
    pub argument_of_periapsis_rad: f64,
    pub true_anomaly_rad: f64,
    pub core_z_kg: f64,
    pub core_volatiles_kg: f64,
    pub core_energetic_nuclide_kg: f64,
}

fn planet_count_range(host_mass_sol: f64, is_white_dwarf_merger: bool) -> (u32, u32) {
    if is_white_dwarf_merger {
        return (2, 4);
    }
    if host_mass_sol < 0.6 {
        (4, 8)
    } else if host_mass_sol < 0.9 {
        (5, 10)
    } else if host_mass_sol < 3.0 {
        (6, 12)
    } else {
        (4, 8)
    }
}

/// Seeds `N` proto-cores with weighted masses and a partitioned set of
/// initial orbits spanning `[disk.inner_radius_au, disk.outer_radius_au]`.
pub fn seed_cores(
    rng: &mut RandomEngine,
    host_mass_sol: f64,
    is_white_dwarf_merger: bool,
    disk: &ProtoplanetaryDisk,
) -> Vec<ProtoCore> {
    let (lo, hi) = planet_count_range(host_mass_sol, is_white_dwarf_merger);
    let count = rng.gen_index((hi - lo) as usize + 1) as u32 + lo;

    let weights: Vec<f64> = (0..count).map(|_| 10f64.powf(rng.uniform(0.0, 3.0))).collect();
    let weight_sum: f64 = weights.iter().sum();
    let dust_mass_kg = disk.dust_mass_sol * crate::constants::SOLAR_MASS_KG;
    let masses_kg: Vec<f64> = weights.iter().map(|w| dust_mass_kg * w / weight_sum).collect();

    let tenth_roots: Vec<f64> = masses_kg.iter().map(|m| m.max(1.0).powf(0.1)).collect();
    let tenth_root_sum: f64 = tenth_roots.iter().sum();

    let inner_m = disk.inner_radius_au * AU_M;
    let outer_m = disk.outer_radius_au * AU_M;
    let ratio = (outer_m / inner_m).max(1e-9);

    let mut boundaries = Vec::with_capacity(count as usize + 1);
    let mut cumulative = 0.0;
    boundaries.push(inner_m);
    for root in &tenth_roots {
        cumulative += root;
        boundaries.push(inner_m * ratio.powf(cumulative / tenth_root_sum));
    }

    (0..count as usize)
        .map(|i| {
            let semi_major_axis_m = (boundaries[i] + boundaries[i + 1]) / 2.0;
            let mass_kg = masses_kg[i];
            let volatile_divisor = rng.uniform(9000.0, 11_000.0);
            let nuclide_divisor = rng.uniform(4.5e6, 5.5e6);
            let core_volatiles_kg = mass_kg / volatile_divisor;
            let core_energetic_nuclide_kg = mass_kg / nuclide_divisor;
            let core_z_kg = (mass_kg - core_volatiles_kg - core_energetic_nuclide_kg).max(0.0);

            ProtoCore {
                mass_kg,
                semi_major_axis_m,
                eccentricity: rng.uniform(0.0, 0.05),
                inclination_rad: rng.uniform(-2.0, 2.0).to_radians(),
                longitude_ascending_node_rad: rng.uniform(0.0, std::f64::consts::TAU),
                argument_of_periapsis_rad: rng.uniform(0.0, std::f64::consts::TAU),
                true_anomaly_rad: rng.uniform(0.0, std::f64::consts::TAU),
                core_z_kg,
                core_volatiles_kg,
                core_energetic_nuclide_kg,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeedSequence;

    #[test]
    fn cores_are_sorted_by_increasing_semi_major_axis() {
        let seq = SeedSequence::from_str("cores-test");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let disk = ProtoplanetaryDisk {
            inner_radius_au: 0.1,
            outer_radius_au: 45.0,
            disk_mass_sol: 0.01,
            dust_mass_sol: 0.0001,
        };
        let cores = seed_cores(&mut rng, 1.0, false, &disk);
        assert!(cores.len() >= 4 && cores.len() <= 12);
        for pair in cores.windows(2) {
            assert!(pair[0].semi_major_axis_m < pair[1].semi_major_axis_m);
        }
    }

    #[test]
    fn core_composition_sums_to_mass() {
        let seq = SeedSequence::from_str("cores-mass");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let disk = ProtoplanetaryDisk {
            inner_radius_au: 0.1,
            outer_radius_au: 45.0,
            disk_mass_sol: 0.01,
            dust_mass_sol: 0.0001,
        };
        for core in seed_cores(&mut rng, 1.0, false, &disk) {
            let sum = core.core_z_kg + core.core_volatiles_kg + core.core_energetic_nuclide_kg;
            assert!((sum - core.mass_kg).abs() / core.mass_kg < 1e-9);
        }
    }
}
