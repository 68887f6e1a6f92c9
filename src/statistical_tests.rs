//! Distributional checks that sample many independent draws and
//! compare empirical frequencies against the closed-form laws the
//! relevant generator component is supposed to follow. Kept separate
//! from the small deterministic unit tests living alongside each
//! component.
//!
//! Scoped to components that never touch `TrackTableCache` (core
//! seeding, planet classification, death-branch reclassification,
//! black-hole spin) since this crate ships no bundled MIST track
//! fixtures; the disk-backed stellar/white-dwarf interpolation path is
//! covered by the deterministic unit tests in `src/track/`.

use std::collections::HashMap;

use crate::constants::{SOLAR_LUMINOSITY_W, SOLAR_MASS_KG, SOLAR_RADIUS_M, YEAR_S};
use crate::death::{self, DeathInput};
use crate::model::{EvolutionPhase, Normal, PlanetType, Star, StarOrigin};
use crate::orbit::{self, cores, disk, planet_class};
use crate::random::{RandomEngine, SeedSequence};
use crate::track::TrackTableCache;

fn plain_star(mass_sol: f64, luminosity_sol: f64) -> Star {
    Star {
        age_s: 1e9 * YEAR_S,
        initial_mass_kg: mass_sol * SOLAR_MASS_KG,
        mass_kg: mass_sol * SOLAR_MASS_KG,
        feh: 0.0,
        lifetime_s: 1e10 * YEAR_S,
        radius_m: SOLAR_RADIUS_M,
        luminosity_w: luminosity_sol * SOLAR_LUMINOSITY_W,
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
        normal: Normal::new(0.3, 1.2),
        magnetic_field_t: 1e-4,
        spin_s: 2e6,
        oblateness: 0.0,
        min_coil_mass_kg: 0.0,
        class: crate::classify::StellarClass::unknown(),
    }
}

/// Sample-generates full proto-core sets for a Sun-like host across
/// `N` independent disks and tallies the resulting `PlanetType`
/// frequencies.
#[test]
fn planet_type_distribution_is_nonempty_and_sane() {
    const N: usize = 400;
    let mut type_counts: HashMap<PlanetType, usize> = HashMap::new();
    let mut total_cores = 0usize;

    for i in 0..N {
        let seq = SeedSequence::from_str(&format!("planet-type-distribution-{i}"));
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let star = plain_star(1.0, 1.0);

        let Some(proto_disk) = disk::build_disk(&mut rng, &star, 1.0) else {
            continue;
        };
        let pms_luminosity_w = orbit::prev_main_sequence_luminosity_w(1.0);
        let frost_line_au = orbit::frost_line_au(pms_luminosity_w, None, None);
        let habitable_zone_au = orbit::habitable_zone_si_au(star.luminosity_w, None, None);

        for core in cores::seed_cores(&mut rng, 1.0, false, &proto_disk) {
            total_cores += 1;
            if let Some(planet) = planet_class::classify_core(
                &mut rng,
                core,
                1.0,
                frost_line_au,
                habitable_zone_au,
                crate::constants::DEFAULT_ASTEROID_UPPER_LIMIT_KG,
            ) {
                *type_counts.entry(planet.planet_type).or_insert(0) += 1;
            }
        }
    }

    assert!(total_cores > 0, "expected at least one proto-core across {N} disks");
    assert!(
        type_counts.values().sum::<usize>() > 0,
        "expected at least one core to survive classification"
    );
    // Gas/ice giants and rocky/oceanic worlds are both reachable from a
    // Sun-like host; a single-bucket result would indicate the
    // density-proxy thresholds collapsed to a constant branch.
    assert!(
        type_counts.len() >= 2,
        "expected more than one planet type across {total_cores} cores, got {type_counts:?}"
    );
}

/// Distributional law: among single-star neutron-star progenitors
/// (`10.0 <= Mi < 21.0` Msol), ~10% merge-reclassify, and of those
/// ~11.45% become black holes rather than staying neutron stars.
#[test]
fn neutron_star_merger_reclassification_matches_law() {
    const N: usize = 6000;
    let cache = TrackTableCache::new(std::env::temp_dir().join("stellar-forge-statistical-tests-unused"));
    let seq = SeedSequence::from_str("ns-merger-law");
    let mut rng = RandomEngine::from_seed_sequence(&seq);

    let mut merged = 0usize;
    let mut merged_to_black_hole = 0usize;
    for _ in 0..N {
        let input = DeathInput {
            initial_mass_sol: 15.0,
            feh: 0.0,
            lifetime_s: 1e8 * YEAR_S,
            age_s: 1e8 * YEAR_S,
            is_single: true,
            force_merge: false,
        };
        let star = death::process_death_star(&mut rng, &cache, &input, |_| 15.0)
            .expect("neutron-star branch never returns an error");
        if matches!(star.origin, StarOrigin::WhiteDwarfMerge) {
            merged += 1;
            if matches!(star.evolution_phase, EvolutionPhase::StellarBlackHole) {
                merged_to_black_hole += 1;
            }
        }
    }

    let observed_merge_rate = merged as f64 / N as f64;
    let merge_sigma = (0.10 * 0.90 / N as f64).sqrt();
    assert!(
        (observed_merge_rate - 0.10).abs() < 4.0 * merge_sigma,
        "observed merge rate {observed_merge_rate:.4} vs expected 0.10 (sigma {merge_sigma:.4})"
    );

    assert!(merged > 0, "expected at least one merger across {N} draws");
    let observed_bh_rate = merged_to_black_hole as f64 / merged as f64;
    let bh_sigma = (0.1145 * 0.8855 / merged as f64).sqrt();
    assert!(
        (observed_bh_rate - 0.1145).abs() < 4.0 * bh_sigma,
        "observed merger-to-black-hole rate {observed_bh_rate:.4} vs expected 0.1145 (sigma {bh_sigma:.4})"
    );
}

/// Black-hole spin always lands in `[0.001, 0.998]`, whichever branch
/// produced the black hole.
#[test]
fn black_hole_spin_stays_within_range() {
    const N: usize = 2000;
    let cache = TrackTableCache::new(std::env::temp_dir().join("stellar-forge-statistical-tests-unused"));
    let seq = SeedSequence::from_str("black-hole-spin-range");
    let mut rng = RandomEngine::from_seed_sequence(&seq);

    let mut saw_black_hole = false;
    for _ in 0..N {
        let input = DeathInput {
            initial_mass_sol: 40.0,
            feh: 0.0,
            lifetime_s: 1e7 * YEAR_S,
            age_s: 1e7 * YEAR_S,
            is_single: false,
            force_merge: false,
        };
        let star = death::process_death_star(&mut rng, &cache, &input, |_| 40.0)
            .expect("high-mass branch never returns an error");
        if matches!(star.evolution_phase, EvolutionPhase::StellarBlackHole) {
            saw_black_hole = true;
            assert!(star.spin_s >= 0.001 && star.spin_s <= 0.998);
        }
    }
    assert!(saw_black_hole, "expected the 33.75+ Msol branch to always produce a black hole");
}
