use icgen::snapshot::{read_snapshot, ColumnDensity, DEFAULT_EDGES};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let input = args.next().expect("expected the path to a snapshot as first argument");
    let output = args.next().unwrap_or_else(|| "column_density.npy".into());
    let axis = match args.next() {
        Some(axis) => axis.parse()?,
        None => 2,
    };

    icgen::logging::set_logging_callback(|level, message| {
        eprintln!("[{}] {}", level, message);
    });

    // center the map on the simulation box
    let (header, _) = read_snapshot(&input)?;
    let half_box = 0.5 * header.box_size;
    let density = ColumnDensity::from_file(&input, [half_box; 3])?;

    let map = density.project(header.box_size, DEFAULT_EDGES, axis, true)?;
    // the map can be displayed with numpy and matplotlib:
    // plt.pcolormesh(edges, edges, np.load("column_density.npy").T)
    ndarray_npy::write_npy(&output, &map)?;

    println!("saved the log10 column density along axis {} to {}", axis, output);

    Ok(())
}
