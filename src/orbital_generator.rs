//! The orbital generator: configured by seed sequence, universe age,
//! binary period mean/sigma, coil temperature limit, asteroid upper
//! mass limit, rings parent lower mass limit, life probability,
//! UV-habitable-zone inclusion, and an ASI-filter toggle, then driven
//! over an already-populated `StellarSystem` via `generate_orbitals`.
//!
//! Grounded on `original_source/.../OrbitalGenerator.cpp`'s top-level
//! `GenerateOrbitals`, which drives disk, cores, classification,
//! filters, composition and garnish over an already-populated
//! `StellarSystem` one host star at a time. Each stage already lives in
//! its own module under `crate::orbit`; this file is only the pipeline
//! glue plus the two system-wide finishing passes the assembler calls
//! for ("rewrite periods from Kepler", "copy period into unset spin").

use crate::constants::{DEFAULT_ASTEROID_UPPER_LIMIT_KG, DEFAULT_COIL_TEMP_LIMIT_K, SOLAR_MASS_KG, YEAR_S};
use crate::model::{BodyHandle, Normal, Orbit, OrbitalDetail, Planet, Star, StarOrigin, StellarSystem};
use crate::orbit::assembler::{asteroid_cluster_from_working, kepler_period_s, to_model_planet};
use crate::orbit::binary::{
    generate_binary_orbit, DEFAULT_LOG_PERIOD_MEAN_DAYS, DEFAULT_LOG_PERIOD_SIGMA_DAYS,
};
use crate::orbit::composition::{compose_planet, CompositionContext};
use crate::orbit::cores::seed_cores;
use crate::orbit::disk::build_disk;
use crate::orbit::filters::{apply_filters, BinaryContext, FilterContext, HostStarInfo};
use crate::orbit::garnish::{attach_garnish, generate_kuiper_belt, GarnishParams};
use crate::orbit::planet_class::classify_core;
use crate::orbit::{frost_line_au, habitable_zone_si_au, poynting_vector_w_m2, prev_main_sequence_luminosity_w};
use crate::random::RandomEngine;

/// The civilization sub-generator is an out-of-scope external
/// collaborator, consumed as a black box with one entry point:
/// `generate_civilization(star, irradiance, planet)`.
/// `OrbitalGenerator` never implements it — callers that care about
/// the feature inject their own.
pub trait CivilizationCollaborator {
    fn generate_civilization(&self, star: &Star, irradiance_w_m2: f64, planet: &Planet);
}

fn host_evolution_allows_planets(star: &Star) -> bool {
    !matches!(star.evolution_phase, crate::model::EvolutionPhase::Null)
}

pub struct OrbitalGenerator {
    universe_age_s: f64,
    binary_period_mean_log_days: f64,
    binary_period_sigma_log_days: f64,
    coil_temp_limit_k: f64,
    asteroid_upper_limit_kg: f64,
    rings_parent_lower_limit_kg: f64,
    life_probability: f64,
    contain_uv_habitable_zone: bool,
    enable_asi_filter: bool,
    civilization: Option<Box<dyn CivilizationCollaborator>>,
}

impl OrbitalGenerator {
    pub fn new() -> Self {
        Self {
            universe_age_s: 1.38e10 * YEAR_S,
            binary_period_mean_log_days: DEFAULT_LOG_PERIOD_MEAN_DAYS,
            binary_period_sigma_log_days: DEFAULT_LOG_PERIOD_SIGMA_DAYS,
            coil_temp_limit_k: DEFAULT_COIL_TEMP_LIMIT_K,
            asteroid_upper_limit_kg: DEFAULT_ASTEROID_UPPER_LIMIT_KG,
            // No default is named anywhere upstream; chosen at roughly
            // one Mars mass so rings/Trojans stay reserved for
            // planet-scale bodies rather than large asteroids
            // (DESIGN.md Open Question).
            rings_parent_lower_limit_kg: 6.4e23,
            life_probability: 0.0,
            contain_uv_habitable_zone: false,
            enable_asi_filter: false,
            civilization: None,
        }
    }

    pub fn with_universe_age_s(mut self, v: f64) -> Self {
        self.universe_age_s = v;
        self
    }

    pub fn with_binary_period_distribution(mut self, mean_log_days: f64, sigma_log_days: f64) -> Self {
        self.binary_period_mean_log_days = mean_log_days;
        self.binary_period_sigma_log_days = sigma_log_days;
        self
    }

    pub fn with_coil_temperature_limit_k(mut self, v: f64) -> Self {
        self.coil_temp_limit_k = v;
        self
    }

    pub fn with_asteroid_upper_limit_kg(mut self, v: f64) -> Self {
        self.asteroid_upper_limit_kg = v;
        self
    }

    pub fn with_rings_parent_lower_limit_kg(mut self, v: f64) -> Self {
        self.rings_parent_lower_limit_kg = v;
        self
    }

    pub fn with_life_probability(mut self, v: f64) -> Self {
        self.life_probability = v.clamp(0.0, 1.0);
        self
    }

    pub fn with_contain_uv_habitable_zone(mut self, v: bool) -> Self {
        self.contain_uv_habitable_zone = v;
        self
    }

    pub fn with_enable_asi_filter(mut self, v: bool) -> Self {
        self.enable_asi_filter = v;
        self
    }

    pub fn with_civilization_collaborator(mut self, collaborator: Box<dyn CivilizationCollaborator>) -> Self {
        self.civilization = Some(collaborator);
        self
    }

    fn habitable_zone_au(&self, star: &Star, companion: Option<(&Star, f64)>) -> (f64, f64) {
        if self.contain_uv_habitable_zone {
            crate::random::habitable_zone_au(star.luminosity_solar())
        } else {
            let (other_lum, sep) = match companion {
                Some((c, sep)) => (Some(c.luminosity_w), Some(sep)),
                None => (None, None),
            };
            habitable_zone_si_au(star.luminosity_w, other_lum, sep)
        }
    }

    /// `GenerateOrbitals`: drives the full disk-through-assembly
    /// pipeline over a `StellarSystem` whose `stars` are already
    /// populated.
    pub fn generate_orbitals(&self, rng: &mut RandomEngine, system: &mut StellarSystem) {
        let star_count = system.stars.len();
        assert!(star_count == 1 || star_count == 2, "a StellarSystem holds one or two stars");

        let binary_separation_m = if star_count == 2 {
            let (left, right) = system.stars.split_at_mut(1);
            let orbit = generate_binary_orbit(
                rng,
                &mut left[0],
                &mut right[0],
                self.binary_period_mean_log_days,
                self.binary_period_sigma_log_days,
                self.coil_temp_limit_k,
            );

            let root = Orbit {
                parent: BodyHandle::BaryCenter,
                semi_major_axis_m: orbit.semi_major_axis_m,
                period_s: orbit.period_s,
                eccentricity: orbit.eccentricity,
                inclination_rad: orbit.inclination_rad,
                longitude_ascending_node_rad: orbit.longitude_ascending_node_rad,
                argument_of_periapsis_rad: orbit.star_a.argument_of_periapsis_rad,
                true_anomaly_rad: orbit.star_a.true_anomaly_rad,
                normal: Normal::default(),
                details: vec![
                    OrbitalDetail {
                        occupant: BodyHandle::Star(0),
                        initial_true_anomaly_rad: orbit.star_a.true_anomaly_rad,
                        sub_orbits: Vec::new(),
                    },
                    OrbitalDetail {
                        occupant: BodyHandle::Star(1),
                        initial_true_anomaly_rad: orbit.star_b.true_anomaly_rad,
                        sub_orbits: Vec::new(),
                    },
                ],
            };
            let idx = system.push_orbit(root);
            system.root_orbit = Some(idx);
            Some(orbit.semi_major_axis_m)
        } else {
            let root = Orbit {
                parent: BodyHandle::BaryCenter,
                semi_major_axis_m: 0.0,
                period_s: 0.0,
                eccentricity: 0.0,
                inclination_rad: 0.0,
                longitude_ascending_node_rad: 0.0,
                argument_of_periapsis_rad: 0.0,
                true_anomaly_rad: 0.0,
                normal: system.stars[0].normal,
                details: vec![OrbitalDetail {
                    occupant: BodyHandle::Star(0),
                    initial_true_anomaly_rad: 0.0,
                    sub_orbits: Vec::new(),
                }],
            };
            let idx = system.push_orbit(root);
            system.root_orbit = Some(idx);
            None
        };

        // Planet-orbit index back-reference, so the final "copy period
        // into unset spin" pass (below) can find each top-level
        // planet's orbit without re-deriving it.
        let mut planet_orbit_indices: Vec<(usize, usize)> = Vec::new();

        for star_index in 0..star_count {
            let star = system.stars[star_index].clone();
            let companion = if star_count == 2 {
                Some(system.stars[1 - star_index].clone())
            } else {
                None
            };

            if !host_evolution_allows_planets(&star) {
                continue;
            }

            let initial_mass_sol = star.initial_mass_kg / SOLAR_MASS_KG;
            let is_white_dwarf_merger = matches!(star.origin, StarOrigin::WhiteDwarfMerge);

            let disk = match build_disk(rng, &star, initial_mass_sol) {
                Some(d) => d,
                None => continue,
            };

            let pms_luminosity_w = prev_main_sequence_luminosity_w(initial_mass_sol);
            let companion_pms_luminosity_w = companion
                .as_ref()
                .map(|c| prev_main_sequence_luminosity_w(c.initial_mass_kg / SOLAR_MASS_KG));

            let frost_line = frost_line_au(pms_luminosity_w, companion_pms_luminosity_w, binary_separation_m);
            let habitable_zone = self.habitable_zone_au(
                &star,
                companion.as_ref().zip(binary_separation_m).map(|(c, sep)| (c, sep)),
            );

            let cores = seed_cores(rng, initial_mass_sol, is_white_dwarf_merger, &disk);
            let mut planets: Vec<_> = cores
                .into_iter()
                .filter_map(|core| {
                    classify_core(
                        rng,
                        core,
                        initial_mass_sol,
                        frost_line,
                        habitable_zone,
                        self.asteroid_upper_limit_kg,
                    )
                })
                .collect();

            let host_info = HostStarInfo {
                mass_kg: star.mass_kg,
                initial_mass_sol,
                radius_m: star.radius_m,
                luminosity_w: star.luminosity_w,
                evolution_phase: star.evolution_phase,
                age_s: star.age_s,
            };
            let binary_ctx = companion.as_ref().zip(binary_separation_m).map(|(c, sep)| BinaryContext {
                companion: HostStarInfo {
                    mass_kg: c.mass_kg,
                    initial_mass_sol: c.initial_mass_kg / SOLAR_MASS_KG,
                    radius_m: c.radius_m,
                    luminosity_w: c.luminosity_w,
                    evolution_phase: c.evolution_phase,
                    age_s: c.age_s,
                },
                binary_separation_m: sep,
                binary_eccentricity: 0.0,
            });
            let filter_ctx = FilterContext {
                host: host_info,
                binary: binary_ctx,
                asteroid_upper_limit_kg: self.asteroid_upper_limit_kg,
                disk_inner_radius_au: disk.inner_radius_au,
            };
            apply_filters(rng, &mut planets, &filter_ctx, habitable_zone.1);

            let host_main_sequence = matches!(star.evolution_phase, crate::model::EvolutionPhase::MainSequence);
            let garnish_params = GarnishParams {
                progenitor_initial_mass_sol: initial_mass_sol,
                habitable_zone_au: habitable_zone,
                frost_line_au: frost_line,
                asteroid_upper_limit_kg: self.asteroid_upper_limit_kg,
                host_main_sequence,
                rings_parent_lower_limit_kg: self.rings_parent_lower_limit_kg,
            };
            let comp_ctx = CompositionContext {
                host_mass_kg: star.mass_kg,
                host_luminosity_w: star.luminosity_w,
                host_evolution_phase: star.evolution_phase,
                host_evolution_progress: star.evolution_progress,
                host_feh: star.feh,
                age_s: star.age_s,
                universe_age_s: self.universe_age_s,
                inner_radius_au: disk.inner_radius_au,
                outer_radius_au: disk.outer_radius_au,
            };

            let mut any_body_attached = false;
            let star_detail_index = 0usize; // each star's OrbitalDetail is at its own star_index within root.details

            for working in planets {
                if working.planet_type.is_asteroid_cluster() {
                    let cluster = asteroid_cluster_from_working(&working);
                    let cluster_idx = system.push_asteroid_cluster(cluster);
                    let orbit = Orbit {
                        parent: BodyHandle::Star(star_index),
                        semi_major_axis_m: working.semi_major_axis_m,
                        period_s: kepler_period_s(working.semi_major_axis_m, star.mass_kg),
                        eccentricity: working.eccentricity,
                        inclination_rad: working.inclination_rad,
                        longitude_ascending_node_rad: working.longitude_ascending_node_rad,
                        argument_of_periapsis_rad: working.argument_of_periapsis_rad,
                        true_anomaly_rad: working.true_anomaly_rad,
                        normal: Normal::default(),
                        details: vec![OrbitalDetail {
                            occupant: BodyHandle::AsteroidCluster(cluster_idx),
                            initial_true_anomaly_rad: working.true_anomaly_rad,
                            sub_orbits: Vec::new(),
                        }],
                    };
                    let orbit_idx = system.push_orbit(orbit);
                    push_sub_orbit(system, star_index, star_detail_index, orbit_idx);
                    any_body_attached = true;
                    continue;
                }

                let (working, composed) = compose_planet(rng, working, &comp_ctx);
                let garnish = attach_garnish(rng, &working, &composed, &comp_ctx, &garnish_params);

                let normal = Normal::new(rng.uniform(0.0, std::f64::consts::TAU), rng.uniform(0.0, std::f64::consts::PI));
                let mut planet_model = to_model_planet(&working, &composed, star.age_s, normal, 0.0);

                let planet_mass_kg = planet_model.total_mass_f64().max(1.0);
                let mut moons = garnish.moons;
                for moon in moons.iter_mut() {
                    if moon.spin_s <= 0.0 {
                        moon.spin_s = kepler_period_s(moon.distance_from_host_m, planet_mass_kg);
                    }
                }
                planet_model.moons = moons;
                planet_model.rings = garnish.rings;
                planet_model.trojans = garnish.trojans;

                if self.enable_asi_filter && self.life_probability > 0.0 {
                    let in_habitable_zone = {
                        let a_au = working.semi_major_axis_m / crate::constants::AU_M;
                        a_au >= habitable_zone.0 && a_au <= habitable_zone.1
                    };
                    if in_habitable_zone && rng.bernoulli(self.life_probability) {
                        if let Some(collaborator) = &self.civilization {
                            let irradiance = poynting_vector_w_m2(star.luminosity_w, working.semi_major_axis_m);
                            collaborator.generate_civilization(&star, irradiance, &planet_model);
                        }
                    }
                }

                let planet_idx = system.push_planet(planet_model);
                let orbit = Orbit {
                    parent: BodyHandle::Star(star_index),
                    semi_major_axis_m: working.semi_major_axis_m,
                    period_s: kepler_period_s(working.semi_major_axis_m, star.mass_kg),
                    eccentricity: working.eccentricity,
                    inclination_rad: working.inclination_rad,
                    longitude_ascending_node_rad: working.longitude_ascending_node_rad,
                    argument_of_periapsis_rad: working.argument_of_periapsis_rad,
                    true_anomaly_rad: working.true_anomaly_rad,
                    normal,
                    details: vec![OrbitalDetail {
                        occupant: BodyHandle::Planet(planet_idx),
                        initial_true_anomaly_rad: working.true_anomaly_rad,
                        sub_orbits: Vec::new(),
                    }],
                };
                let orbit_idx = system.push_orbit(orbit);
                push_sub_orbit(system, star_index, star_detail_index, orbit_idx);
                planet_orbit_indices.push((planet_idx, orbit_idx));
                any_body_attached = true;
            }

            // Kuiper belt: one per star whose own disk survived to this
            // point (DESIGN.md Open Question: "one per normal-host
            // system" is read per-star here, since each star's belt is
            // built from that star's own disk mass).
            let (kuiper_cluster, kuiper_a_m) = generate_kuiper_belt(rng, &disk, star.feh, frost_line);
            let kuiper_idx = system.push_asteroid_cluster(kuiper_cluster);
            let kuiper_orbit = Orbit {
                parent: BodyHandle::Star(star_index),
                semi_major_axis_m: kuiper_a_m,
                period_s: kepler_period_s(kuiper_a_m, star.mass_kg),
                eccentricity: 0.05,
                inclination_rad: 0.0,
                longitude_ascending_node_rad: 0.0,
                argument_of_periapsis_rad: 0.0,
                true_anomaly_rad: 0.0,
                normal: Normal::default(),
                details: vec![OrbitalDetail {
                    occupant: BodyHandle::AsteroidCluster(kuiper_idx),
                    initial_true_anomaly_rad: 0.0,
                    sub_orbits: Vec::new(),
                }],
            };
            let kuiper_orbit_idx = system.push_orbit(kuiper_orbit);
            push_sub_orbit(system, star_index, star_detail_index, kuiper_orbit_idx);

            system.stars[star_index].has_planets = any_body_attached;
        }

        // Finishing pass 1: rewrite every orbit's period from
        // Kepler's third law now that every body exists.
        for i in 0..system.orbits.len() {
            let parent = system.orbits[i].parent;
            let parent_mass_kg = system.parent_mass_kg(parent);
            let a_m = system.orbits[i].semi_major_axis_m;
            system.orbits[i].period_s = kepler_period_s(a_m, parent_mass_kg);
        }

        // Finishing pass 2: copy the orbital period into any
        // top-level planet whose spin is still the tidal-lock
        // sentinel, i.e. captured rotation.
        for (planet_idx, orbit_idx) in planet_orbit_indices {
            let period_s = system.orbits[orbit_idx].period_s;
            if let Some(planet) = system.planets.get_mut(planet_idx) {
                if planet.spin_s <= 0.0 {
                    planet.spin_s = period_s;
                }
            }
        }
    }
}

impl Default for OrbitalGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends `orbit_idx` to the root orbit's `OrbitalDetail` for the
/// given star. `star_detail_index` is always the star's own index: the
/// root orbit's `details` are pushed in star order in both the binary
/// and single-star branches above.
fn push_sub_orbit(system: &mut StellarSystem, star_index: usize, star_detail_index: usize, orbit_idx: usize) {
    let _ = star_detail_index;
    if let Some(root_idx) = system.root_orbit {
        if let Some(detail) = system.orbits[root_idx]
            .details
            .iter_mut()
            .find(|d| matches!(d.occupant, BodyHandle::Star(i) if i == star_index))
        {
            detail.sub_orbits.push(orbit_idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EvolutionPhase, Normal as ModelNormal, StarOrigin};
    use crate::random::SeedSequence;

    fn main_sequence_star(mass_kg: f64, luminosity_w: f64, feh: f64) -> Star {
        Star {
            age_s: 4.5e9 * YEAR_S,
            initial_mass_kg: mass_kg,
            mass_kg,
            feh,
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
            evolution_progress: 5.0,
            evolution_phase: EvolutionPhase::MainSequence,
            origin: StarOrigin::Normal,
            has_planets: false,
            is_single: true,
            normal: ModelNormal::new(0.0, 1.0),
            magnetic_field_t: 1e-4,
            spin_s: 2e6,
            oblateness: 0.0,
            min_coil_mass_kg: 0.0,
            class: crate::classify::StellarClass::unknown(),
        }
    }

    #[test]
    fn single_star_system_gets_a_valid_root_orbit_and_some_bodies() {
        let seq = SeedSequence::from_str("orbital-generator-single");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let mut system = StellarSystem::new("test-single");
        system.push_star(main_sequence_star(crate::constants::SOLAR_MASS_KG, crate::constants::SOLAR_LUMINOSITY_W, 0.0));

        let generator = OrbitalGenerator::new();
        generator.generate_orbitals(&mut rng, &mut system);

        assert!(system.root_orbit.is_some());
        assert!(!system.orbits.is_empty());
        system.validate().expect("system must satisfy its own invariants");
        for planet in &system.planets {
            assert_eq!(
                planet.core.total() + planet.atmosphere.total() + planet.ocean.total(),
                planet.total_mass_kg()
            );
        }
    }

    #[test]
    fn binary_system_shares_one_root_orbit_with_two_details() {
        let seq = SeedSequence::from_str("orbital-generator-binary");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let mut system = StellarSystem::new("test-binary");
        system.push_star(main_sequence_star(1.2 * crate::constants::SOLAR_MASS_KG, 1.4 * crate::constants::SOLAR_LUMINOSITY_W, 0.0));
        system.push_star(main_sequence_star(0.8 * crate::constants::SOLAR_MASS_KG, 0.5 * crate::constants::SOLAR_LUMINOSITY_W, 0.0));

        let generator = OrbitalGenerator::new();
        generator.generate_orbitals(&mut rng, &mut system);

        let root = &system.orbits[system.root_orbit.unwrap()];
        assert_eq!(root.details.len(), 2);
        system.validate().expect("binary system must satisfy its own invariants");
    }

    #[test]
    fn remnant_without_disk_yields_no_bodies() {
        let seq = SeedSequence::from_str("orbital-generator-remnant");
        let mut rng = RandomEngine::from_seed_sequence(&seq);
        let mut system = StellarSystem::new("test-remnant");
        let mut star = main_sequence_star(0.6 * crate::constants::SOLAR_MASS_KG, 0.01 * crate::constants::SOLAR_LUMINOSITY_W, 0.0);
        star.evolution_phase = EvolutionPhase::CoWd;
        star.origin = StarOrigin::Normal;
        system.push_star(star);

        let generator = OrbitalGenerator::new();
        generator.generate_orbitals(&mut rng, &mut system);

        assert!(system.planets.is_empty());
        assert!(system.asteroid_clusters.is_empty());
        assert!(!system.stars[0].has_planets);
    }
}
