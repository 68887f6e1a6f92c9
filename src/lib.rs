//! Procedural generator for self-consistent stellar systems: stars,
//! orbits, and planetary retinues.
//!
//! The crate is organized as a pipeline of small generators, each
//! grounded on one stage of `original_source/.../StellarGenerator.cpp`
//! and `OrbitalGenerator.cpp`: [`random`] (seeded sampling), [`track`]
//! (MIST/white-dwarf track interpolation), [`classify`] (MK spectral
//! classification), [`death`] (stellar-remnant processing),
//! [`stellar_generator`] (the star-level orchestrator), and `orbit`
//! (the planetary-system pipeline, built on top of a finished `Star`).

pub mod classify;
pub mod complex_mass;
pub mod constants;
pub mod death;
pub mod error;
pub mod model;
pub mod orbit;
pub mod orbital_generator;
pub mod random;
pub mod stellar_generator;
pub mod track;

#[cfg(test)]
mod statistical_tests;

pub use classify::StellarClass;
pub use complex_mass::ComplexMass;
pub use error::{GenError, GenResult};
pub use model::{
    AsteroidCluster, BaryCenter, BodyHandle, EvolutionPhase, Orbit, OrbitalDetail, Planet,
    PlanetType, Ring, Star, StarOrigin, StellarSystem,
};
pub use orbital_generator::OrbitalGenerator;
pub use random::{RandomEngine, SeedSequence};
pub use stellar_generator::{BasicProperties, GenerateDistribution, GenerateOption, StellarGenerator};
pub use track::TrackTableCache;
