use icgen::generators::{GeneratorBase, UniformBox, UniformParameters};
use icgen::snapshot::write_snapshot;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "profiling_ICs.hdf5".into());

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    time_graph::spanned!("Full generation", {
        let generator = UniformBox::new(UniformParameters {
            box_size: 50.0,
            density: 1.0,
            particle_mass: 1.0,
            velocity: 1.0,
            maxwell_distributed: true,
            seed: 42,
        })?;

        let dataset = generator.generate()?;
        write_snapshot(&dataset, &path)?;
    });

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}
