use icgen::Generator;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // output file from the command line, with a default value
    let path = std::env::args().nth(1).unwrap_or_else(|| "uniform_ICs.hdf5".into());

    // print log messages from the library on stderr
    icgen::logging::set_logging_callback(|level, message| {
        eprintln!("[{}] {}", level, message);
    });

    // pass parameters as JSON
    let parameters = r#"{
        "box_size": 10.0,
        "density": 1.0,
        "particle_mass": 1.0,
        "velocity": 1.0,
        "maxwell_distributed": true,
        "seed": 42
    }"#;
    // create the generator with its name and parameters
    let generator = Generator::new("uniform", parameters.to_owned())?;

    // sample the particles and write them to the snapshot file
    let dataset = generator.write(&path)?;
    println!("wrote {} particles to {}", dataset.len(), path);

    Ok(())
}
