//! Core data model: `Star`, `Orbit`, `Planet`, `AsteroidCluster`,
//! `BaryCenter`, `StellarSystem`.
//!
//! Grounded on the plain `Serialize`/`Deserialize` data structs this
//! crate started from (`PhysicalProperties`, `Composition` in
//! `src/lib.rs`), with orbital-target polymorphism and body ownership
//! reworked into
//! tagged variants (sum types) in place of a discriminated union, and
//! an arena of `(type, index)` handles in place of a raw pointer
//! graph (mirroring how `other_examples/.../stellar_forge` addresses
//! bodies by `Id` inside a `Galaxy` container).

use serde::{Deserialize, Serialize};

use crate::complex_mass::ComplexMass;

/// A direction expressed as spherical angles (rad).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Normal {
    pub theta: f64,
    pub phi: f64,
}

impl Normal {
    pub fn new(theta: f64, phi: f64) -> Self {
        Self { theta, phi }
    }

    /// Perturbs both angles by up to `+-max_delta` radians, wrapping
    /// `theta` into `[0, 2pi)` and clamping `phi` into `[0, pi]`.
    pub fn perturbed(&self, max_delta: f64, d_theta: f64, d_phi: f64) -> Self {
        let two_pi = std::f64::consts::TAU;
        let mut theta = (self.theta + d_theta * max_delta) % two_pi;
        if theta < 0.0 {
            theta += two_pi;
        }
        let phi = (self.phi + d_phi * max_delta).clamp(0.0, std::f64::consts::PI);
        Self { theta, phi }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    #[default]
    PreMainSequence,
    MainSequence,
    RedGiant,
    CoreHeBurning,
    Agb,
    WolfRayet,
    Supernova,
    HeliumWd,
    CoWd,
    ONeMgWd,
    NeutronStar,
    StellarBlackHole,
    Null,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StarOrigin {
    #[default]
    Normal,
    WhiteDwarfMerge,
    PairInstabilitySupernova,
    Photodisintegration,
    ElectronCaptureSupernova,
    IronCoreCollapseSupernova,
    RelativisticJetHypernova,
    SlowCoolingDown,
    EnvelopeDisperse,
}

/// A single star. All masses in kilograms, lengths in metres,
/// temperatures in Kelvin, time in seconds unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Star {
    pub age_s: f64,
    pub initial_mass_kg: f64,
    pub mass_kg: f64,
    pub feh: f64,
    /// Negative sentinel indicates a remnant past its main lifetime.
    pub lifetime_s: f64,
    pub radius_m: f64,
    pub luminosity_w: f64,
    pub teff_k: f64,
    pub escape_velocity_m_s: f64,
    pub surface_h1: f64,
    pub surface_z: f64,
    pub surface_energetic_nuclide: f64,
    pub surface_volatiles: f64,
    pub core_temp_k: f64,
    pub core_density_kg_m3: f64,
    pub wind_speed_m_s: f64,
    /// Stored negative, kg/s.
    pub mass_loss_kg_s: f64,
    /// Fractional phase index, 0-9.
    pub evolution_progress: f64,
    pub evolution_phase: EvolutionPhase,
    pub origin: StarOrigin,
    pub has_planets: bool,
    pub is_single: bool,
    pub normal: Normal,
    pub magnetic_field_t: f64,
    /// -1.0 sentinel means tidally locked.
    pub spin_s: f64,
    pub oblateness: f64,
    pub min_coil_mass_kg: f64,
    pub class: crate::classify::StellarClass,
}

impl Star {
    pub fn is_tidally_locked(&self) -> bool {
        self.spin_s < 0.0
    }

    pub fn mass_solar(&self) -> f64 {
        self.mass_kg / crate::constants::SOLAR_MASS_KG
    }

    pub fn luminosity_solar(&self) -> f64 {
        self.luminosity_w / crate::constants::SOLAR_LUMINOSITY_W
    }
}

/// Discriminated tag for an orbit's parent or an orbit-detail's
/// occupant: a tagged variant in place of a C-style union.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BodyHandle {
    BaryCenter,
    Star(usize),
    Planet(usize),
    AsteroidCluster(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitalDetail {
    pub occupant: BodyHandle,
    pub initial_true_anomaly_rad: f64,
    /// Sub-orbits this occupant itself parents; non-owning indices
    /// into `StellarSystem::orbits`.
    pub sub_orbits: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orbit {
    pub parent: BodyHandle,
    pub semi_major_axis_m: f64,
    pub period_s: f64,
    pub eccentricity: f64,
    pub inclination_rad: f64,
    pub longitude_ascending_node_rad: f64,
    pub argument_of_periapsis_rad: f64,
    pub true_anomaly_rad: f64,
    pub normal: Normal,
    pub details: Vec<OrbitalDetail>,
}

impl Orbit {
    /// Kepler's third law check used by the assembler and tests,
    /// with a relative tolerance of 1e-3.
    pub fn kepler_residual(&self, parent_mass_kg: f64) -> f64 {
        if parent_mass_kg <= 0.0 || self.period_s <= 0.0 {
            return 0.0;
        }
        let expected_p2 = 4.0 * std::f64::consts::PI.powi(2) * self.semi_major_axis_m.powi(3)
            / (crate::constants::G * parent_mass_kg);
        ((self.period_s.powi(2) - expected_p2) / self.period_s.powi(2)).abs()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PlanetType {
    Rocky,
    Terra,
    Chthonian,
    IcePlanet,
    Oceanic,
    GasGiant,
    HotGasGiant,
    IceGiant,
    HotIceGiant,
    SubIceGiant,
    HotSubIceGiant,
    RockyAsteroidCluster,
    RockyIceAsteroidCluster,
}

impl PlanetType {
    pub fn is_asteroid_cluster(&self) -> bool {
        matches!(
            self,
            PlanetType::RockyAsteroidCluster | PlanetType::RockyIceAsteroidCluster
        )
    }

    pub fn is_giant(&self) -> bool {
        matches!(
            self,
            PlanetType::GasGiant
                | PlanetType::HotGasGiant
                | PlanetType::IceGiant
                | PlanetType::HotIceGiant
                | PlanetType::SubIceGiant
                | PlanetType::HotSubIceGiant
        )
    }

    pub fn is_ice_or_gas_giant(&self) -> bool {
        matches!(
            self,
            PlanetType::GasGiant | PlanetType::IceGiant | PlanetType::HotGasGiant | PlanetType::HotIceGiant
        )
    }

    pub fn hot_variant(&self) -> Option<PlanetType> {
        match self {
            PlanetType::GasGiant => Some(PlanetType::HotGasGiant),
            PlanetType::IceGiant => Some(PlanetType::HotIceGiant),
            PlanetType::SubIceGiant => Some(PlanetType::HotSubIceGiant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Planet {
    pub planet_type: PlanetType,
    pub age_s: f64,
    pub radius_m: f64,
    /// -1.0 sentinel for tidal lock.
    pub spin_s: f64,
    pub oblateness: f64,
    pub balance_temperature_k: f64,
    pub crust_mineral_mass_kg: u128,
    pub migration: bool,
    pub atmosphere: ComplexMass,
    pub ocean: ComplexMass,
    pub core: ComplexMass,
    pub normal: Normal,
    /// Kept for downstream mass calculations after migration has
    /// moved the planet's current semi-major axis.
    pub original_semi_major_axis_m: Option<f64>,
    pub moons: Vec<Planet>,
    pub rings: Option<Ring>,
    pub trojans: Option<AsteroidCluster>,
    /// Distance from the host body, metres. `0.0` for a top-level
    /// planet (its placement lives in the owning `StellarSystem`'s
    /// `Orbit` arena instead); set for an entry inside `moons`, which
    /// has no arena slot of its own.
    pub distance_from_host_m: f64,
}

impl Planet {
    pub fn total_mass_kg(&self) -> u128 {
        self.atmosphere.total() + self.ocean.total() + self.core.total()
    }

    pub fn total_mass_f64(&self) -> f64 {
        self.total_mass_kg() as f64
    }

    pub fn is_tidally_locked(&self) -> bool {
        self.spin_s < 0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AsteroidKind {
    Rocky,
    RockyIce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsteroidCluster {
    pub kind: AsteroidKind,
    pub mass: ComplexMass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ring {
    pub kind: AsteroidKind,
    pub mass: ComplexMass,
    pub semi_major_axis_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaryCenter {
    pub position: [f64; 3],
    pub normal: Normal,
    pub rank: i64,
    pub name: String,
}

/// Owns every entity of one generated system. No cycles: orbit-detail
/// back-references (`sub_orbits`) are plain indices, never owning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StellarSystem {
    pub barycenter: BaryCenter,
    pub stars: Vec<Star>,
    pub planets: Vec<Planet>,
    pub asteroid_clusters: Vec<AsteroidCluster>,
    pub orbits: Vec<Orbit>,
    /// Index into `orbits` of the orbit parented directly by the
    /// barycenter.
    pub root_orbit: Option<usize>,
}

impl StellarSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            barycenter: BaryCenter {
                position: [0.0; 3],
                normal: Normal::default(),
                rank: 0,
                name: name.into(),
            },
            stars: Vec::new(),
            planets: Vec::new(),
            asteroid_clusters: Vec::new(),
            orbits: Vec::new(),
            root_orbit: None,
        }
    }

    pub fn push_star(&mut self, star: Star) -> usize {
        self.stars.push(star);
        self.stars.len() - 1
    }

    pub fn push_planet(&mut self, planet: Planet) -> usize {
        self.planets.push(planet);
        self.planets.len() - 1
    }

    pub fn push_asteroid_cluster(&mut self, cluster: AsteroidCluster) -> usize {
        self.asteroid_clusters.push(cluster);
        self.asteroid_clusters.len() - 1
    }

    pub fn push_orbit(&mut self, orbit: Orbit) -> usize {
        self.orbits.push(orbit);
        self.orbits.len() - 1
    }

    pub fn parent_mass_kg(&self, parent: BodyHandle) -> f64 {
        match parent {
            BodyHandle::BaryCenter => self.stars.iter().map(|s| s.mass_kg).sum(),
            BodyHandle::Star(i) => self.stars.get(i).map(|s| s.mass_kg).unwrap_or(0.0),
            BodyHandle::Planet(i) => self.planets.get(i).map(|p| p.total_mass_f64()).unwrap_or(0.0),
            BodyHandle::AsteroidCluster(i) => self
                .asteroid_clusters
                .get(i)
                .map(|a| a.mass.total_f64())
                .unwrap_or(0.0),
        }
    }

    /// Validates the invariants this type alone can check: every
    /// handle resolves to a live body, and every orbit's period
    /// matches its semi-major axis under Kepler's third law.
    pub fn validate(&self) -> Result<(), String> {
        if self.root_orbit.is_none() && !self.orbits.is_empty() {
            return Err("no root orbit parented by the barycenter".into());
        }
        for orbit in &self.orbits {
            self.resolve(orbit.parent)
                .ok_or_else(|| format!("orbit parent {:?} does not resolve", orbit.parent))?;
            for detail in &orbit.details {
                self.resolve(detail.occupant)
                    .ok_or_else(|| format!("orbit detail {:?} does not resolve", detail.occupant))?;
            }
            let parent_mass = self.parent_mass_kg(orbit.parent);
            if parent_mass > 0.0 && orbit.kepler_residual(parent_mass) > 1e-3 {
                return Err(format!(
                    "Kepler residual too large for orbit around {:?}",
                    orbit.parent
                ));
            }
        }
        Ok(())
    }

    fn resolve(&self, handle: BodyHandle) -> Option<()> {
        match handle {
            BodyHandle::BaryCenter => Some(()),
            BodyHandle::Star(i) => self.stars.get(i).map(|_| ()),
            BodyHandle::Planet(i) => self.planets.get(i).map(|_| ()),
            BodyHandle::AsteroidCluster(i) => self.asteroid_clusters.get(i).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kepler_residual_is_zero_for_consistent_orbit() {
        let a = 1.0 * crate::constants::AU_M;
        let m = crate::constants::SOLAR_MASS_KG;
        let period = (4.0 * std::f64::consts::PI.powi(2) * a.powi(3) / (crate::constants::G * m)).sqrt();
        let orbit = Orbit {
            parent: BodyHandle::BaryCenter,
            semi_major_axis_m: a,
            period_s: period,
            eccentricity: 0.0,
            inclination_rad: 0.0,
            longitude_ascending_node_rad: 0.0,
            argument_of_periapsis_rad: 0.0,
            true_anomaly_rad: 0.0,
            normal: Normal::default(),
            details: vec![],
        };
        assert!(orbit.kepler_residual(m) < 1e-6);
    }

    #[test]
    fn normal_perturbation_wraps_theta() {
        let n = Normal::new(0.01, 1.0);
        let perturbed = n.perturbed(0.09, -2.0, 0.0);
        assert!(perturbed.theta >= 0.0 && perturbed.theta < std::f64::consts::TAU);
    }
}
