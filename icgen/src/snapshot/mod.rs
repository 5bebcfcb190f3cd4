//! Reading and writing particles in HDF5 snapshot files, following the schema
//! used by Gadget and SWIFT: a `Header` group containing metadata as
//! attributes, and one group per particle type containing the particles
//! data. Only dark matter particles (type 1) are used here.

use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::{Array1, Array2, Ix1, Ix2};

use crate::hdf5::{self, FileBuilder, GroupBuilder};
use crate::{Error, ParticleDataset};

mod projection;
pub use self::projection::{ColumnDensity, DEFAULT_EDGES};

/// Number of particle types in the snapshot header
pub const N_PARTICLE_TYPES: usize = 6;

/// Index of the particle type used for all particles
pub const PARTICLE_TYPE: usize = 1;

/// Metadata stored in the `Header` group of a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotHeader {
    /// Number of particles of each type in this file. `NumPart_ThisFile` has
    /// no high word, so only the low 32 bits of these counts are stored.
    pub particles_this_file: [u64; N_PARTICLE_TYPES],
    /// Total number of particles of each type in the snapshot, including the
    /// high word stored in `NumPart_Total_HighWord`
    pub particles_total: [u64; N_PARTICLE_TYPES],
    /// Mass of the particles of each type, or zero if the masses are stored
    /// for each particle
    pub mass_table: [f64; N_PARTICLE_TYPES],
    /// Time (or scale factor) of the snapshot
    pub time: f64,
    /// Redshift of the snapshot
    pub redshift: f64,
    /// Size of the periodic simulation box
    pub box_size: f64,
    /// Number of files for this snapshot
    pub files_per_snapshot: i64,
    /// Matter density parameter
    pub omega0: f64,
    /// Baryon density parameter
    pub omega_baryon: f64,
    /// Dark energy density parameter
    pub omega_lambda: f64,
    /// Hubble parameter, in units of 100 km/s/Mpc
    pub hubble_param: f64,
    /// Star formation flag
    pub flag_sfr: i64,
    /// Cooling flag
    pub flag_cooling: i64,
    /// Stellar age flag
    pub flag_stellar_age: i64,
    /// Metals flag
    pub flag_metals: i64,
    /// Feedback flag
    pub flag_feedback: i64,
    /// Are the particle data stored in double precision?
    pub flag_double_precision: i64,
}

impl SnapshotHeader {
    /// Get the header used when writing `dataset`: all particles are of type
    /// 1, with individual masses, in a non-cosmological setting.
    pub fn for_dataset(dataset: &ParticleDataset) -> SnapshotHeader {
        let mut particles = [0; N_PARTICLE_TYPES];
        particles[PARTICLE_TYPE] = dataset.len() as u64;

        SnapshotHeader {
            particles_this_file: particles,
            particles_total: particles,
            mass_table: [0.0; N_PARTICLE_TYPES],
            time: 0.0,
            redshift: 0.0,
            box_size: dataset.box_size(),
            files_per_snapshot: 1,
            omega0: 0.0,
            omega_baryon: 0.0,
            omega_lambda: 0.0,
            hubble_param: 1.0,
            flag_sfr: 0,
            flag_cooling: 0,
            flag_stellar_age: 0,
            flag_metals: 0,
            flag_feedback: 0,
            flag_double_precision: 1,
        }
    }

    /// Add all the fields of this header as attributes of `group`
    fn write(&self, group: &mut GroupBuilder) -> Result<(), Error> {
        let (this_file, _) = split_counts(&self.particles_this_file);
        let (total, high_word) = split_counts(&self.particles_total);

        group.add_attribute("NumPart_ThisFile", this_file.view())?;
        group.add_attribute("NumPart_Total", total.view())?;
        group.add_attribute("NumPart_Total_HighWord", high_word.view())?;
        group.add_attribute("MassTable", Array1::from(self.mass_table.to_vec()).view())?;
        group.add_scalar_attribute("Time", self.time)?;
        group.add_scalar_attribute("Redshift", self.redshift)?;
        group.add_scalar_attribute("BoxSize", self.box_size)?;
        group.add_scalar_attribute("NumFilesPerSnapshot", self.files_per_snapshot)?;
        group.add_scalar_attribute("Omega0", self.omega0)?;
        group.add_scalar_attribute("OmegaB", self.omega_baryon)?;
        group.add_scalar_attribute("OmegaLambda", self.omega_lambda)?;
        group.add_scalar_attribute("HubbleParam", self.hubble_param)?;
        group.add_scalar_attribute("Flag_Sfr", self.flag_sfr)?;
        group.add_scalar_attribute("Flag_Cooling", self.flag_cooling)?;
        group.add_scalar_attribute("Flag_StellarAge", self.flag_stellar_age)?;
        group.add_scalar_attribute("Flag_Metals", self.flag_metals)?;
        group.add_scalar_attribute("Flag_Feedback", self.flag_feedback)?;
        group.add_scalar_attribute("Flag_DoublePrecision", self.flag_double_precision)?;

        return Ok(());
    }

    /// Read a header from the attributes of `group`. Only `NumPart_Total`,
    /// `MassTable` and `BoxSize` are required, the other attributes take
    /// their default values when missing.
    fn read(group: &hdf5::Group<'_>) -> Result<SnapshotHeader, Error> {
        let total = read_counts(group, "NumPart_Total")?;
        let high_word = if group.attributes().contains_key("NumPart_Total_HighWord") {
            read_counts(group, "NumPart_Total_HighWord")?
        } else {
            [0; N_PARTICLE_TYPES]
        };

        let mut particles_total = [0; N_PARTICLE_TYPES];
        for i in 0..N_PARTICLE_TYPES {
            particles_total[i] = total[i] | (high_word[i] << 32);
        }

        let particles_this_file = if group.attributes().contains_key("NumPart_ThisFile") {
            read_counts(group, "NumPart_ThisFile")?
        } else {
            total
        };

        let mass_table = group.attribute("MassTable")?.read::<f64>()?;
        let mass_table = to_fixed_size(mass_table.iter().copied(), "MassTable")?;

        let float = |name: &str, default: f64| -> Result<f64, Error> {
            match group.attributes().get(name) {
                Some(attribute) => attribute.read_scalar::<f64>(),
                None => Ok(default),
            }
        };

        let integer = |name: &str, default: i64| -> Result<i64, Error> {
            match group.attributes().get(name) {
                Some(attribute) => attribute.read_scalar::<i64>(),
                None => Ok(default),
            }
        };

        return Ok(SnapshotHeader {
            particles_this_file: particles_this_file,
            particles_total: particles_total,
            mass_table: mass_table,
            time: float("Time", 0.0)?,
            redshift: float("Redshift", 0.0)?,
            box_size: group.attribute("BoxSize")?.read_scalar::<f64>()?,
            files_per_snapshot: integer("NumFilesPerSnapshot", 1)?,
            omega0: float("Omega0", 0.0)?,
            omega_baryon: float("OmegaB", 0.0)?,
            omega_lambda: float("OmegaLambda", 0.0)?,
            hubble_param: float("HubbleParam", 1.0)?,
            flag_sfr: integer("Flag_Sfr", 0)?,
            flag_cooling: integer("Flag_Cooling", 0)?,
            flag_stellar_age: integer("Flag_StellarAge", 0)?,
            flag_metals: integer("Flag_Metals", 0)?,
            flag_feedback: integer("Flag_Feedback", 0)?,
            flag_double_precision: integer("Flag_DoublePrecision", 0)?,
        });
    }
}

/// Split 64-bit particle counts into the low and high 32-bit words stored in
/// the header
fn split_counts(counts: &[u64; N_PARTICLE_TYPES]) -> (Array1<i32>, Array1<i32>) {
    // the low word is stored as a (possibly negative) int32, with the same
    // bits as the corresponding uint32
    let low = counts.iter().map(|&count| (count & 0xffff_ffff) as u32 as i32).collect();
    let high = counts.iter().map(|&count| (count >> 32) as u32 as i32).collect();
    return (low, high);
}

/// Read particle counts stored as 32-bit words in the header
fn read_counts(group: &hdf5::Group<'_>, name: &str) -> Result<[u64; N_PARTICLE_TYPES], Error> {
    let values = group.attribute(name)?.read::<i64>()?;
    // int32 words are re-interpreted as unsigned, larger integers are kept
    let counts = values.iter().map(|&value| {
        if value < 0 { value as u32 as u64 } else { value as u64 }
    });
    return to_fixed_size(counts, name);
}

fn to_fixed_size<T: Copy + Default>(values: impl ExactSizeIterator<Item = T>, name: &str) -> Result<[T; N_PARTICLE_TYPES], Error> {
    if values.len() != N_PARTICLE_TYPES {
        return Err(Error::Hdf5(format!(
            "expected {} values in '{}' header attribute, got {}", N_PARTICLE_TYPES, name, values.len()
        )));
    }

    let mut array = [T::default(); N_PARTICLE_TYPES];
    for (output, value) in array.iter_mut().zip(values) {
        *output = value;
    }
    return Ok(array);
}

/// Get the path of the temporary file used while writing to `path`
fn temporary_path(path: &Path) -> Result<PathBuf, Error> {
    let file_name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => {
            return Err(Error::InvalidParameter(format!(
                "'{}' is not a valid path for a snapshot file", path.display()
            )));
        }
    };

    return Ok(path.with_file_name(format!("{}.tmp", file_name)));
}

/// Write the particles in `dataset` to a new snapshot file at `path`.
///
/// All particles are stored as type 1 particles, with individual masses.
/// The header contains the particle counts and the box size, all other
/// values describe a non-cosmological simulation at time 0.
///
/// The file is first written next to the destination with an additional
/// `.tmp` extension, and then renamed to `path`, overwriting any existing
/// file. If writing fails, the destination is left untouched.
#[time_graph::instrument(name = "write_snapshot")]
pub fn write_snapshot(dataset: &ParticleDataset, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    info!("writing {} particles to '{}'", dataset.len(), path.display());

    let mut file = FileBuilder::new();
    let root = file.root();

    let header = root.create_group("Header")?;
    SnapshotHeader::for_dataset(dataset).write(header)?;

    let particles = root.create_group("PartType1")?;
    particles.add_dataset("ParticleIDs", dataset.ids())?;
    particles.add_dataset("Coordinates", dataset.coordinates())?;
    particles.add_dataset("Masses", dataset.masses())?;
    particles.add_dataset("Velocities", dataset.velocities())?;

    let bytes = file.to_bytes()?;
    debug!("snapshot file for {} particles is {} bytes", dataset.len(), bytes.len());

    let temporary = temporary_path(path)?;
    let result = std::fs::write(&temporary, &bytes).and_then(|_| std::fs::rename(&temporary, path));
    if let Err(error) = result {
        // the temporary file might have been partially written, or could not
        // be moved to the destination
        let _ = std::fs::remove_file(&temporary);
        return Err(error.into());
    }

    return Ok(());
}

fn read_array<D: ndarray::Dimension>(particles: &hdf5::Group<'_>, name: &str) -> Result<ndarray::Array<f64, D>, Error> {
    let values = particles.dataset(name)?.read::<f64>()?;
    return values.into_dimensionality::<D>().map_err(|e| Error::Hdf5(format!(
        "invalid shape for '{}' dataset: {}", name, e
    )));
}

/// Check that a file with the given `header` contains `count` type 1
/// particles. Single-file snapshots are checked against the total count,
/// which is the only one stored with its high word.
fn check_particle_count(header: &SnapshotHeader, count: usize) -> Result<(), Error> {
    let count = count as u64;
    let (declared, matches) = if header.files_per_snapshot == 1 {
        let total = header.particles_total[PARTICLE_TYPE];
        (total, total == count)
    } else {
        let this_file = header.particles_this_file[PARTICLE_TYPE];
        (this_file, this_file == count || this_file == count & 0xffff_ffff)
    };

    if !matches {
        return Err(Error::Hdf5(format!(
            "the header declares {} type 1 particles, but the file contains {}", declared, count
        )));
    }

    return Ok(());
}

/// Read the header and type 1 particles of the snapshot file at `path`.
///
/// If the file does not contain a `Masses` dataset, all particles get the
/// mass of type 1 particles from the header mass table.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<(SnapshotHeader, ParticleDataset), Error> {
    let path = path.as_ref();
    let file = hdf5::File::open(path)?;

    let header = SnapshotHeader::read(&file.group("Header")?)?;
    let particles = file.group("PartType1")?;

    let ids = particles.dataset("ParticleIDs")?.read::<i64>()?;
    let ids = ids.into_dimensionality::<Ix1>().map_err(|e| Error::Hdf5(format!(
        "invalid shape for 'ParticleIDs' dataset: {}", e
    )))?;
    let coordinates: Array2<f64> = read_array::<Ix2>(&particles, "Coordinates")?;
    let velocities: Array2<f64> = read_array::<Ix2>(&particles, "Velocities")?;

    let masses = if particles.contains("Masses") {
        read_array::<Ix1>(&particles, "Masses")?
    } else if header.mass_table[PARTICLE_TYPE] != 0.0 {
        Array1::from_elem(ids.len(), header.mass_table[PARTICLE_TYPE])
    } else {
        return Err(Error::Hdf5(
            "the snapshot contains neither a 'Masses' dataset nor a mass for type 1 particles".into()
        ));
    };

    check_particle_count(&header, ids.len())?;

    let dataset = ParticleDataset::new(header.box_size, coordinates, velocities, ids, masses)?;
    info!("read {} particles from '{}'", dataset.len(), path.display());

    return Ok((header, dataset));
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn dataset() -> ParticleDataset {
        ParticleDataset::new(
            4.0,
            array![[0.5, 1.0, 1.5], [2.0, 2.5, 3.0]],
            array![[0.1, 0.0, -0.1], [0.0, 0.2, 0.0]],
            array![0, 1],
            array![1.5, 1.5],
        ).unwrap()
    }

    #[test]
    fn counts() {
        let mut counts = [0; N_PARTICLE_TYPES];
        counts[1] = 3_000_000_000;
        counts[2] = (5 << 32) + 12;

        let (low, high) = split_counts(&counts);
        assert_eq!(low, array![0, 3_000_000_000_u32 as i32, 12, 0, 0, 0]);
        assert_eq!(high, array![0, 0, 5, 0, 0, 0]);
    }

    #[test]
    fn header_round_trip() {
        let mut header = SnapshotHeader::for_dataset(&dataset());
        header.particles_total[1] = (1 << 33) + 2;
        header.time = 0.5;
        header.mass_table[3] = 2.5;

        let mut builder = FileBuilder::new();
        header.write(builder.root().create_group("Header").unwrap()).unwrap();

        let file = hdf5::File::from_bytes(builder.to_bytes().unwrap()).unwrap();
        let group = file.group("Header").unwrap();
        assert_eq!(SnapshotHeader::read(&group).unwrap(), header);

        let names = group.attributes().keys().map(|name| name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, [
            "NumPart_ThisFile", "NumPart_Total", "NumPart_Total_HighWord",
            "MassTable", "Time", "Redshift", "BoxSize", "NumFilesPerSnapshot",
            "Omega0", "OmegaB", "OmegaLambda", "HubbleParam", "Flag_Sfr",
            "Flag_Cooling", "Flag_StellarAge", "Flag_Metals", "Flag_Feedback",
            "Flag_DoublePrecision",
        ]);
    }

    #[test]
    fn large_particle_counts() {
        let large = (1_u64 << 32) + 5;
        let mut header = SnapshotHeader::for_dataset(&dataset());
        header.particles_this_file[PARTICLE_TYPE] = large;
        header.particles_total[PARTICLE_TYPE] = large;

        let mut builder = FileBuilder::new();
        header.write(builder.root().create_group("Header").unwrap()).unwrap();
        let file = hdf5::File::from_bytes(builder.to_bytes().unwrap()).unwrap();
        let mut header = SnapshotHeader::read(&file.group("Header").unwrap()).unwrap();

        // only the low word of the count in this file is stored
        assert_eq!(header.particles_this_file[PARTICLE_TYPE], 5);
        assert_eq!(header.particles_total[PARTICLE_TYPE], large);

        check_particle_count(&header, large as usize).unwrap();
        let error = check_particle_count(&header, 5).unwrap_err();
        assert_eq!(
            error.to_string(),
            "HDF5 error: the header declares 4294967301 type 1 particles, but the file contains 5"
        );

        // files of a multi-file snapshot only know their low word
        header.files_per_snapshot = 2;
        check_particle_count(&header, large as usize).unwrap();
        check_particle_count(&header, 5).unwrap();
        let error = check_particle_count(&header, 6).unwrap_err();
        assert_eq!(
            error.to_string(),
            "HDF5 error: the header declares 5 type 1 particles, but the file contains 6"
        );
    }

    #[test]
    fn temporary() {
        let path = temporary_path(Path::new("output/snapshot.hdf5")).unwrap();
        assert_eq!(path, Path::new("output/snapshot.hdf5.tmp"));

        assert!(temporary_path(Path::new("..")).is_err());
    }

    #[test]
    fn masses_from_table() {
        let dataset = dataset();
        let mut header = SnapshotHeader::for_dataset(&dataset);
        header.mass_table[1] = 3.0;

        let mut builder = FileBuilder::new();
        let root = builder.root();
        header.write(root.create_group("Header").unwrap()).unwrap();
        let particles = root.create_group("PartType1").unwrap();
        particles.add_dataset("ParticleIDs", dataset.ids()).unwrap();
        particles.add_dataset("Coordinates", dataset.coordinates()).unwrap();
        particles.add_dataset("Velocities", dataset.velocities()).unwrap();

        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("no-masses.hdf5");
        builder.write(&path).unwrap();

        let (header, read) = read_snapshot(&path).unwrap();
        assert_eq!(header.mass_table[1], 3.0);
        assert_eq!(read.masses(), array![3.0, 3.0]);
        assert_eq!(read.coordinates(), dataset.coordinates());
    }
}
