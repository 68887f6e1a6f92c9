//! Death-star processor, grounded on
//! `ProcessDeathStar`/`GenerateMagnetic`/`GenerateSpin` in
//! `original_source/.../StellarGenerator.cpp`.

use log::{info, warn};

use crate::classify::{classify_star, StellarClass};
use crate::constants::{self, SOLAR_MASS_KG, SOLAR_RADIUS_M, SOLAR_TEFF_K};
use crate::error::{GenError, GenResult, StarOutcome};
use crate::model::{EvolutionPhase, Normal, Star, StarOrigin};
use crate::random::RandomEngine;
use crate::track::{self, MistQuery, TrackTableCache};

/// Magnetic-field log-uniform ranges: seven for normal-star mass/phase
/// bins plus one each for white dwarfs and neutron stars, grounded on
/// `FStellarGenerator`'s constructor init list.
const MAGNETIC_RANGES: [(f64, f64); 8] = [
    (500f64.log10(), 3000f64.log10()),
    (1.0, 3.0),
    (0.0, 1.0),
    (3.0, 4.0),
    (-1.0, 0.0),
    (2.0, 3.0),
    (0.5, 4.5),
    (1e9, 1e11),
];

const WD_SPIN_LOG_RANGE: (f64, f64) = (3.0, 5.0);
const BLACK_HOLE_SPIN_RANGE: (f64, f64) = (0.001, 0.998);

pub struct DeathInput {
    pub initial_mass_sol: f64,
    pub feh: f64,
    pub lifetime_s: f64,
    pub age_s: f64,
    pub is_single: bool,
    pub force_merge: bool,
}

/// Runs the death-star branch table and returns a finalized remnant
/// `Star`. `near_death_mass_sol` is a lazily-evaluated callback for the
/// "recursively invoke the Stellar Generator" step; only the
/// direct-collapse and relativistic-jet branches ever call it.
pub fn process_death_star(
    rng: &mut RandomEngine,
    cache: &TrackTableCache,
    input: &DeathInput,
    near_death_mass_sol: impl FnOnce(&mut RandomEngine) -> f64,
) -> GenResult<Star> {
    let mi = input.initial_mass_sol;
    let feh = input.feh;

    let mut near_death_mass_sol = Some(near_death_mass_sol);
    let mut call_near_death = |rng: &mut RandomEngine| near_death_mass_sol.take().expect("called once")(rng);

    let (phase, origin, mass_sol) = if feh <= -2.0 && (140.0..250.0).contains(&mi) {
        (EvolutionPhase::Null, StarOrigin::PairInstabilitySupernova, 0.0)
    } else if feh <= -2.0 && mi >= 250.0 {
        (
            EvolutionPhase::StellarBlackHole,
            StarOrigin::Photodisintegration,
            0.8 * call_near_death(rng),
        )
    } else if mi < 0.8 {
        (
            EvolutionPhase::HeliumWd,
            StarOrigin::SlowCoolingDown,
            (0.9795 - 0.393 * mi) * mi,
        )
    } else if mi < 7.9 {
        (
            EvolutionPhase::CoWd,
            StarOrigin::EnvelopeDisperse,
            co_wd_mass(mi),
        )
    } else if mi < 9.759 {
        (
            EvolutionPhase::ONeMgWd,
            StarOrigin::EnvelopeDisperse,
            1.301 + 0.008_095 * mi,
        )
    } else if mi < 10.0 {
        (
            EvolutionPhase::NeutronStar,
            StarOrigin::ElectronCaptureSupernova,
            1.246 + 0.0136 * mi,
        )
    } else if mi < 21.0 {
        (
            EvolutionPhase::NeutronStar,
            StarOrigin::IronCoreCollapseSupernova,
            1.246 + 0.0136 * mi,
        )
    } else if mi < 23.3537 {
        (
            EvolutionPhase::StellarBlackHole,
            StarOrigin::IronCoreCollapseSupernova,
            10f64.powf(1.334 - 0.009_987 * mi),
        )
    } else if mi < 33.75 {
        (
            EvolutionPhase::NeutronStar,
            StarOrigin::IronCoreCollapseSupernova,
            12.1 - 0.763 * mi + 0.0137 * mi * mi,
        )
    } else {
        (
            EvolutionPhase::StellarBlackHole,
            StarOrigin::RelativisticJetHypernova,
            0.8 * call_near_death(rng),
        )
    };

    let (phase, origin, mass_sol) = maybe_merge(
        rng,
        input,
        phase,
        origin,
        mass_sol,
    );

    if matches!(phase, EvolutionPhase::Null) {
        return Ok(null_placeholder(mi, feh, input.lifetime_s));
    }

    let death_star_age_s = input.age_s - input.lifetime_s.abs();
    let mut star = match phase {
        EvolutionPhase::HeliumWd | EvolutionPhase::CoWd | EvolutionPhase::ONeMgWd => {
            build_white_dwarf(cache, mass_sol, death_star_age_s)?
        }
        EvolutionPhase::NeutronStar => build_neutron_star(mass_sol, death_star_age_s),
        EvolutionPhase::StellarBlackHole => build_black_hole(rng, mass_sol),
        _ => unreachable!("Null handled above"),
    };

    star.initial_mass_kg = mi * SOLAR_MASS_KG;
    star.feh = feh;
    star.age_s = death_star_age_s;
    star.lifetime_s = -input.lifetime_s.abs();
    star.evolution_phase = phase;
    star.origin = origin;
    star.is_single = input.is_single || matches!(origin, StarOrigin::WhiteDwarfMerge);
    star.normal = Normal::new(rng.uniform(0.0, std::f64::consts::TAU), rng.uniform(0.0, std::f64::consts::PI));

    star.class = classify_star(&star, rng.uniform01());
    generate_magnetic(rng, &mut star);
    generate_spin(rng, &mut star);

    info!(
        "death-star processor produced {:?} remnant at {:.3} Msol",
        star.evolution_phase,
        star.mass_solar()
    );

    Ok(star)
}

fn co_wd_mass(mi: f64) -> f64 {
    -0.000_123_36 * mi.powi(6) + 0.003_160 * mi.powi(5) - 0.029_60 * mi.powi(4) + 0.123_50 * mi.powi(3)
        - 0.215_50 * mi.powi(2)
        + 0.190_22 * mi
        + 0.465_75
}

/// Neutron-star merger reclassification: independently, each
/// neutron-star progenitor draws a 10% single-star merger probability,
/// and on success an 11.45% Bernoulli draw decides the outcome.
fn maybe_merge(
    rng: &mut RandomEngine,
    input: &DeathInput,
    phase: EvolutionPhase,
    origin: StarOrigin,
    mass_sol: f64,
) -> (EvolutionPhase, StarOrigin, f64) {
    if !(input.force_merge || matches!(phase, EvolutionPhase::NeutronStar)) {
        return (phase, origin, mass_sol);
    }
    let merge_probability = if input.force_merge {
        1.0
    } else if input.is_single {
        0.10
    } else {
        0.0
    };
    if !(input.force_merge || rng.bernoulli(merge_probability)) {
        return (phase, origin, mass_sol);
    }

    if rng.bernoulli(0.1145) {
        (
            EvolutionPhase::StellarBlackHole,
            StarOrigin::WhiteDwarfMerge,
            rng.uniform(2.6, 2.76),
        )
    } else {
        (
            EvolutionPhase::NeutronStar,
            StarOrigin::WhiteDwarfMerge,
            rng.uniform(1.38, 2.180_72),
        )
    }
}

fn null_placeholder(initial_mass_sol: f64, feh: f64, lifetime_s: f64) -> Star {
    Star {
        age_s: 0.0,
        initial_mass_kg: initial_mass_sol * SOLAR_MASS_KG,
        mass_kg: 0.0,
        feh,
        lifetime_s: -lifetime_s.abs(),
        radius_m: 0.0,
        luminosity_w: 0.0,
        teff_k: 0.0,
        escape_velocity_m_s: 0.0,
        surface_h1: 0.0,
        surface_z: 0.0,
        surface_energetic_nuclide: 0.0,
        surface_volatiles: 0.0,
        core_temp_k: 0.0,
        core_density_kg_m3: 0.0,
        wind_speed_m_s: 0.0,
        mass_loss_kg_s: 0.0,
        evolution_progress: 0.0,
        evolution_phase: EvolutionPhase::Null,
        origin: StarOrigin::PairInstabilitySupernova,
        has_planets: false,
        is_single: true,
        normal: Normal::default(),
        magnetic_field_t: 0.0,
        spin_s: 0.0,
        oblateness: 0.0,
        min_coil_mass_kg: 0.0,
        class: StellarClass::unknown(),
    }
}

fn build_white_dwarf(cache: &TrackTableCache, mass_sol: f64, death_star_age_s: f64) -> GenResult<Star> {
    let query = MistQuery {
        target_age_s: death_star_age_s,
        target_feh: 0.0,
        target_mass_sol: mass_sol,
    };
    let row = match track::get_full_mist_data(cache, &query, true, true)? {
        StarOutcome::Alive(row) => row,
        StarOutcome::Died { lifetime_s } => {
            warn!("white-dwarf cooling track requested past its final row (lifetime {lifetime_s})");
            return Err(GenError::AssetMissing("white-dwarf track exhausted".into()));
        }
    };

    let radius_sol = 10f64.powf(row[track::WD_LOG_R]);
    let teff = 10f64.powf(row[track::WD_LOG_TEFF]);
    let core_temp = 10f64.powf(row[track::WD_LOG_CENTER_T]);
    let luminosity_sol = radius_sol.powi(2) * (teff / SOLAR_TEFF_K).powi(4);
    let escape_velocity =
        (2.0 * constants::G * mass_sol * SOLAR_MASS_KG / (radius_sol * SOLAR_RADIUS_M)).sqrt();

    Ok(Star {
        age_s: death_star_age_s,
        initial_mass_kg: 0.0,
        mass_kg: mass_sol * SOLAR_MASS_KG,
        feh: 0.0,
        lifetime_s: 0.0,
        radius_m: radius_sol * SOLAR_RADIUS_M,
        luminosity_w: luminosity_sol * constants::SOLAR_LUMINOSITY_W,
        teff_k: teff,
        escape_velocity_m_s: escape_velocity,
        surface_h1: 0.0,
        surface_z: 0.0,
        surface_energetic_nuclide: 0.0,
        surface_volatiles: 1.0,
        core_temp_k: core_temp,
        core_density_kg_m3: 10f64.powf(row[track::WD_LOG_CENTER_RHO]) * 1000.0,
        wind_speed_m_s: 0.0,
        mass_loss_kg_s: 0.0,
        evolution_progress: 0.0,
        evolution_phase: EvolutionPhase::CoWd,
        origin: StarOrigin::EnvelopeDisperse,
        has_planets: false,
        is_single: true,
        normal: Normal::default(),
        magnetic_field_t: 0.0,
        spin_s: 0.0,
        oblateness: 0.0,
        min_coil_mass_kg: 0.0,
        class: StellarClass::unknown(),
    })
}

/// Neutron-star mass-radius relation: a piecewise mass-radius
/// polynomial over mass intervals 0 < M <= 0.777, 0.777-2.018,
/// > 2.018 M☉.
fn neutron_star_radius_km(mass_sol: f64) -> f64 {
    if mass_sol <= 0.777_11 {
        -4.783 + 2.565 / mass_sol + 42.0 * mass_sol - 55.4 * mass_sol.powi(2) + 34.93 * mass_sol.powi(3)
            - 8.4 * mass_sol.powi(4)
    } else if mass_sol <= 2.0181 {
        11.302 - 0.35184 * mass_sol
    } else {
        -31951.1 + 63121.8 * mass_sol - 46717.8 * mass_sol.powi(2) + 15358.4 * mass_sol.powi(3)
            - 1892.365 * mass_sol.powi(4)
    }
}

fn build_neutron_star(mass_sol: f64, mut age_s: f64) -> Star {
    if age_s < 1e5 {
        age_s += 1e5;
    }
    let radius_m = neutron_star_radius_km(mass_sol) * 1000.0;
    let teff = 1.5e8 * ((age_s - 1e5) + 22_000.0).powf(-0.5);
    let luminosity_sol = (radius_m / SOLAR_RADIUS_M).powi(2) * (teff / SOLAR_TEFF_K).powi(4);
    let escape_velocity = (2.0 * constants::G * mass_sol * SOLAR_MASS_KG / radius_m).sqrt();

    Star {
        age_s,
        initial_mass_kg: 0.0,
        mass_kg: mass_sol * SOLAR_MASS_KG,
        feh: 0.0,
        lifetime_s: 0.0,
        radius_m,
        luminosity_w: luminosity_sol * constants::SOLAR_LUMINOSITY_W,
        teff_k: teff,
        escape_velocity_m_s: escape_velocity,
        surface_h1: f64::NAN,
        surface_z: f64::NAN,
        surface_energetic_nuclide: f64::NAN,
        surface_volatiles: f64::NAN,
        core_temp_k: f64::NAN,
        core_density_kg_m3: f64::NAN,
        wind_speed_m_s: 0.0,
        mass_loss_kg_s: 0.0,
        evolution_progress: 0.0,
        evolution_phase: EvolutionPhase::NeutronStar,
        origin: StarOrigin::IronCoreCollapseSupernova,
        has_planets: false,
        is_single: true,
        normal: Normal::default(),
        magnetic_field_t: 0.0,
        spin_s: 0.0,
        oblateness: 0.0,
        min_coil_mass_kg: 0.0,
        class: StellarClass::unknown(),
    }
}

fn build_black_hole(rng: &mut RandomEngine, mass_sol: f64) -> Star {
    let dimensionless_spin = rng.uniform(BLACK_HOLE_SPIN_RANGE.0, BLACK_HOLE_SPIN_RANGE.1);
    Star {
        age_s: 0.0,
        initial_mass_kg: 0.0,
        mass_kg: mass_sol * SOLAR_MASS_KG,
        feh: 0.0,
        lifetime_s: 0.0,
        radius_m: f64::NAN,
        luminosity_w: f64::NAN,
        teff_k: f64::NAN,
        escape_velocity_m_s: f64::NAN,
        surface_h1: f64::NAN,
        surface_z: f64::NAN,
        surface_energetic_nuclide: f64::NAN,
        surface_volatiles: f64::NAN,
        core_temp_k: f64::NAN,
        core_density_kg_m3: f64::NAN,
        wind_speed_m_s: 0.0,
        mass_loss_kg_s: 0.0,
        evolution_progress: 0.0,
        evolution_phase: EvolutionPhase::StellarBlackHole,
        origin: StarOrigin::IronCoreCollapseSupernova,
        has_planets: false,
        is_single: true,
        normal: Normal::default(),
        magnetic_field_t: 0.0,
        spin_s: dimensionless_spin,
        oblateness: 0.0,
        min_coil_mass_kg: 0.0,
        class: StellarClass::unknown(),
    }
}

/// Magnetic field sampler shared by normal-star generation and the
/// death-star processor.
pub fn generate_magnetic(rng: &mut RandomEngine, star: &mut Star) {
    use crate::classify::StarKind;

    let field = match star.class.star_kind {
        StarKind::NormalStar => {
            let mass_sol = star.mass_solar();
            let is_peculiar = star.class.marks.peculiar_p;
            let bin = if mass_sol < 0.33 {
                0
            } else if mass_sol < 0.6 {
                1
            } else if mass_sol < 1.5 {
                2
            } else if mass_sol < 20.0 {
                let is_ab_main_sequence = matches!(star.evolution_phase, EvolutionPhase::MainSequence)
                    && matches!(
                        star.class.spectral,
                        Some(crate::classify::SpectralLetter::A) | Some(crate::classify::SpectralLetter::B)
                    );
                if is_ab_main_sequence && is_peculiar {
                    3
                } else {
                    4
                }
            } else {
                5
            };
            let (lo, hi) = MAGNETIC_RANGES[bin];
            10f64.powf(rng.uniform(lo, hi)) / 10_000.0
        }
        StarKind::WhiteDwarf => {
            let (lo, hi) = MAGNETIC_RANGES[6];
            10f64.powf(rng.uniform(lo, hi))
        }
        StarKind::NeutronStar => {
            let (lo, hi) = MAGNETIC_RANGES[7];
            rng.uniform(lo, hi) / ((0.034 * star.age_s / 1e4).powf(1.17) + 0.84)
        }
        StarKind::BlackHole | StarKind::DeathPlaceholder => 0.0,
    };
    star.magnetic_field_t = field;
}

/// Spin + oblateness sampler. Main-sequence spin is a product of
/// three mass/radius/age terms.
pub fn generate_spin(rng: &mut RandomEngine, star: &mut Star) {
    use crate::classify::StarKind;

    let spin = match star.class.star_kind {
        StarKind::NormalStar => {
            let mut base = 1.0 + rng.uniform01();
            if star.class.marks.peculiar_p {
                base *= 10.0;
            }
            let mass_sol = star.mass_solar();
            let radius_sol = star.radius_m / SOLAR_RADIUS_M;
            let log_mass = mass_sol.log10();
            let term3 = 2f64.powf((base * (star.age_s + 1e6) * 1e-9).sqrt());
            let (term1, term2) = if mass_sol <= 1.4 {
                let term1 = 10f64.powf(
                    30.893 - 25.343_03 * log_mass.exp() + 21.7577 * log_mass + 7.342_05 * log_mass.powi(2)
                        + 0.129_51 * log_mass.powi(3),
                );
                let term2 = (radius_sol / mass_sol.powf(0.9)).powf(2.5);
                (term1, term2)
            } else {
                let term1 = 10f64.powf(
                    28.0784 - 22.157_53 * log_mass.exp() + 12.551_34 * log_mass + 30.9045 * log_mass.powi(2)
                        - 10.1479 * log_mass.powi(3)
                        + 4.6894 * log_mass.powi(4),
                );
                let term2 = (radius_sol / (1.1062 * mass_sol.powf(0.6))).powf(2.5);
                (term1, term2)
            };
            term1 * term2 * term3
        }
        StarKind::WhiteDwarf => 10f64.powf(rng.uniform(WD_SPIN_LOG_RANGE.0, WD_SPIN_LOG_RANGE.1)),
        StarKind::NeutronStar => star.age_s * 3.0 * 1e-9 + 1e-3,
        // Already drawn as a dimensionless spin uniform on
        // 0.001-0.998 by `build_black_hole`; this sampler must not
        // clobber it.
        StarKind::BlackHole => star.spin_s,
        StarKind::DeathPlaceholder => 0.0,
    };

    if !matches!(star.class.star_kind, StarKind::BlackHole) && spin > 0.0 {
        star.oblateness = 4.0 * std::f64::consts::PI.powi(2) * star.radius_m.powi(3)
            / (spin.powi(2) * constants::G * star.mass_kg);
    }
    star.spin_s = spin;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn co_wd_mass_matches_reference_point() {
        let m = co_wd_mass(1.0);
        assert!((0.4..0.8).contains(&m), "got {m}");
    }

    #[test]
    fn neutron_star_radius_is_kilometre_scale() {
        let r = neutron_star_radius_km(1.4);
        assert!((5.0..20.0).contains(&r), "got {r}");
    }

    fn unused_cache() -> TrackTableCache {
        TrackTableCache::new(std::env::temp_dir().join("stellar-forge-core-test-death-unused"))
    }

    /// Boundary case: mass 250 M☉, FeH -4, option DeathStar — result
    /// is a black hole with non-zero mass and dimensionless spin in
    /// [0.001, 0.998].
    #[test]
    fn direct_collapse_black_hole_has_dimensionless_spin_in_range() {
        let seq = crate::random::SeedSequence::from_str("death-250-msol");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let input = DeathInput {
            initial_mass_sol: 250.0,
            feh: -4.0,
            lifetime_s: 1e13,
            age_s: 1e13,
            is_single: true,
            force_merge: false,
        };
        let star = process_death_star(&mut rng, &unused_cache(), &input, |_| 250.0).expect("produces a star");
        assert_eq!(star.evolution_phase, EvolutionPhase::StellarBlackHole);
        assert!(star.mass_kg > 0.0);
        assert!((0.001..=0.998).contains(&star.spin_s), "got {}", star.spin_s);
    }

    /// Boundary case: mass 140 M☉, FeH -4, option DeathStar — result
    /// is a null placeholder; caller retries with the mass halved.
    #[test]
    fn pair_instability_yields_null_placeholder() {
        let seq = crate::random::SeedSequence::from_str("death-140-msol");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let input = DeathInput {
            initial_mass_sol: 140.0,
            feh: -4.0,
            lifetime_s: 1e13,
            age_s: 1e13,
            is_single: true,
            force_merge: false,
        };
        let star = process_death_star(&mut rng, &unused_cache(), &input, |_| 140.0).expect("produces a star");
        assert_eq!(star.evolution_phase, EvolutionPhase::Null);
        assert_eq!(star.mass_kg, 0.0);
    }
}
