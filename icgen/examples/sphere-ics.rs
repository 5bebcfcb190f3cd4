use icgen::generators::{GeneratorBase, SphereInBackground, SphereParameters};
use icgen::snapshot::write_snapshot;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "sphere_ICs.hdf5".into());

    icgen::logging::set_logging_callback(|level, message| {
        eprintln!("[{}] {}", level, message);
    });

    // a dense sphere moving up through a background at rest
    let generator = SphereInBackground::new(SphereParameters {
        background_size: 10.0,
        background_density: 1.0,
        sphere_radius: 1.0,
        sphere_particles: 10_000,
        sphere_velocity: 1.0,
        seed: 42,
    })?;

    let dataset = generator.generate()?;
    write_snapshot(&dataset, &path)?;

    println!(
        "wrote {} background particles and {} sphere particles centered on {:?} to {}",
        generator.background_particles(),
        generator.parameters().sphere_particles,
        generator.sphere_center(),
        path,
    );

    Ok(())
}
