//! Protoplanetary-disk model.
//!
//! Grounded on `original_source/.../OrbitalGenerator.cpp`'s disk-model
//! section at the top of `GeneratePlanets`.

use crate::constants::AU_M;
use crate::model::{EvolutionPhase, Star, StarOrigin};
use crate::orbit::prev_main_sequence_luminosity_w;
use crate::random::RandomEngine;

#[derive(Debug, Clone, Copy)]
pub struct ProtoplanetaryDisk {
    pub inner_radius_au: f64,
    pub outer_radius_au: f64,
    pub disk_mass_sol: f64,
    pub dust_mass_sol: f64,
}

/// `None` means the host has no disk and therefore no planets.
pub fn build_disk(rng: &mut RandomEngine, star: &Star, initial_mass_sol: f64) -> Option<ProtoplanetaryDisk> {
    let is_white_dwarf_merger = matches!(
        star.origin,
        StarOrigin::WhiteDwarfMerge
    );
    let is_remnant = matches!(
        star.evolution_phase,
        EvolutionPhase::HeliumWd
            | EvolutionPhase::CoWd
            | EvolutionPhase::ONeMgWd
            | EvolutionPhase::NeutronStar
            | EvolutionPhase::StellarBlackHole
            | EvolutionPhase::Null
    );

    if is_white_dwarf_merger {
        let disk_base = rng.uniform(0.1, 1.0);
        let mass_sol = disk_base * 1e-5 * star.mass_solar();
        return Some(ProtoplanetaryDisk {
            inner_radius_au: 0.02,
            outer_radius_au: 1.0,
            disk_mass_sol: mass_sol,
            dust_mass_sol: mass_sol,
        });
    }

    if is_remnant {
        return None;
    }

    let m = initial_mass_sol;
    let disk_base = rng.uniform(1.0, 2.0);
    let disk_mass_sol = disk_base
        * m
        * 10f64.powf(-2.05 + 0.1214 * m - 0.026_69 * m * m - 0.2274 * m.max(1e-6).ln());
    let dust_mass_sol = 0.005_68 * disk_mass_sol * 10f64.powf(star.feh);

    let outer_radius_au = if m < 1.0 { 45.0 * m * m } else { 45.0 * m };

    let disk_coeff_k = if m < 0.6 {
        2100.0
    } else if m < 1.5 {
        1400.0
    } else {
        1700.0
    };

    let luminosity_w = prev_main_sequence_luminosity_w(m);
    let inner_radius_sq_m2 = luminosity_w
        / (4.0 * std::f64::consts::PI * crate::constants::STEFAN_BOLTZMANN * disk_coeff_k.powi(4));
    let inner_radius_au = inner_radius_sq_m2.sqrt() / AU_M;

    Some(ProtoplanetaryDisk {
        inner_radius_au,
        outer_radius_au,
        disk_mass_sol,
        dust_mass_sol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Normal;
    use crate::random::SeedSequence;

    fn sun_like() -> Star {
        Star {
            age_s: 1e9 * crate::constants::YEAR_S,
            initial_mass_kg: crate::constants::SOLAR_MASS_KG,
            mass_kg: crate::constants::SOLAR_MASS_KG,
            feh: 0.0,
            lifetime_s: 1e10 * crate::constants::YEAR_S,
            radius_m: crate::constants::SOLAR_RADIUS_M,
            luminosity_w: crate::constants::SOLAR_LUMINOSITY_W,
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
            is_single: true,
            normal: Normal::new(0.0, 1.0),
            magnetic_field_t: 1e-4,
            spin_s: 2e6,
            oblateness: 0.0,
            min_coil_mass_kg: 0.0,
            class: crate::classify::StellarClass::unknown(),
        }
    }

    #[test]
    fn sun_like_host_gets_a_disk_with_sane_radii() {
        let seq = SeedSequence::from_str("disk-test");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let star = sun_like();
        let disk = build_disk(&mut rng, &star, 1.0).expect("sun-like host has a disk");
        assert!(disk.inner_radius_au > 0.0);
        assert!(disk.outer_radius_au > disk.inner_radius_au);
        assert!(disk.disk_mass_sol > 0.0);
    }

    #[test]
    fn remnant_host_without_merge_has_no_disk() {
        let seq = SeedSequence::from_str("disk-remnant");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let mut star = sun_like();
        star.evolution_phase = EvolutionPhase::CoWd;
        star.origin = StarOrigin::Normal;
        assert!(build_disk(&mut rng, &star, 1.0).is_none());
    }
}
