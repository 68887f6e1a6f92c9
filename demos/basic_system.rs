use stellar_forge_core::{
    GenerateOption, OrbitalGenerator, RandomEngine, SeedSequence, StellarGenerator, StellarSystem,
    TrackTableCache,
};

fn main() {
    env_logger::init();

    // Points at a directory of MIST track CSVs laid out the way
    // `TrackTableCache` expects (see `src/track/mod.rs`); swap in the
    // real asset directory for your deployment.
    let cache = TrackTableCache::new(
        std::env::var("STELLAR_FORGE_TRACK_DIR").unwrap_or_else(|_| "assets/tracks".to_string()),
    );

    for i in 0..5 {
        let seed = SeedSequence::from_str(&format!("basic-system-demo-{i}"));
        let mut rng = RandomEngine::from_seed_sequence(&seed);

        let star_generator = StellarGenerator::new(GenerateOption::Normal);
        let basic = star_generator.generate_basic_properties(&mut rng, 4.5e9 * stellar_forge_core::constants::YEAR_S, 0.0);
        let star = star_generator
            .generate_star(&mut rng, &cache, basic)
            .expect("single-star generation should not hit a permanent death outcome");

        let mut system = StellarSystem::new(format!("Demo System {}", i + 1));
        system.push_star(star);

        OrbitalGenerator::new().generate_orbitals(&mut rng, &mut system);
        system.validate().expect("generated system must satisfy its own invariants");

        println!("\n{}", "=".repeat(80));
        println!("SYSTEM {}", i + 1);
        println!("{}", "=".repeat(80));

        let star = &system.stars[0];
        println!("Class: {}", star.class);
        println!("Mass: {:.2} solar masses", star.mass_solar());
        println!("Radius: {:.2} solar radii", star.radius_m / stellar_forge_core::constants::SOLAR_RADIUS_M);
        println!("Teff: {:.0} K", star.teff_k);
        println!("Luminosity: {:.2e} solar luminosity", star.luminosity_solar());
        println!("Evolution phase: {:?}", star.evolution_phase);
        println!("Tidally locked: {}", star.is_tidally_locked());

        println!("\nPlanets: {}", system.planets.len());
        for (idx, planet) in system.planets.iter().enumerate() {
            println!(
                "  {}: {:?}  mass={:.2} Earths  radius={:.2e} m  T={:.0} K  moons={}  rings={}",
                idx,
                planet.planet_type,
                planet.total_mass_f64() / stellar_forge_core::constants::EARTH_MASS_KG,
                planet.radius_m,
                planet.balance_temperature_k,
                planet.moons.len(),
                planet.rings.is_some(),
            );
        }

        println!("\nAsteroid clusters: {}", system.asteroid_clusters.len());
        for (idx, cluster) in system.asteroid_clusters.iter().enumerate() {
            println!("  {}: {:?}  mass={:.2e} kg", idx, cluster.kind, cluster.mass.total_f64());
        }
    }
}
