use std::path::Path;

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2, Ix2};

use crate::hdf5;
use crate::{Error, ParticleDataset};

use super::PARTICLE_TYPE;

/// Default number of bin edges along each axis of the projected map
pub const DEFAULT_EDGES: usize = 201;

/// Column density of a set of particles with identical masses: the mass per
/// unit area after projecting the particles along one axis.
#[derive(Debug, Clone)]
pub struct ColumnDensity {
    /// positions of the particles, relative to the center of the map
    positions: Array2<f64>,
    mass: f64,
}

impl ColumnDensity {
    /// Create a new `ColumnDensity` for the particles in `dataset`, using
    /// positions relative to `center`. All particles are assumed to have the
    /// same mass as the first one.
    pub fn from_dataset(dataset: &ParticleDataset, center: [f64; 3]) -> ColumnDensity {
        let mass = dataset.masses().iter().next().copied().unwrap_or(0.0);
        return ColumnDensity::with_mass(dataset.coordinates(), center, mass);
    }

    /// Create a new `ColumnDensity` for the type 1 particles in the snapshot
    /// file at `path`, using positions relative to `center`.
    ///
    /// Only `PartType1/Coordinates` and the `MassTable` attribute of the
    /// `Header` group are required. The mass of the particles is taken from
    /// the mass table, or from the first entry of `PartType1/Masses` if the
    /// mass table entry is zero.
    pub fn from_file(path: impl AsRef<Path>, center: [f64; 3]) -> Result<ColumnDensity, Error> {
        let path = path.as_ref();
        let file = hdf5::File::open(path)?;

        let coordinates = file.dataset("PartType1/Coordinates")?.read::<f64>()?;
        let coordinates = coordinates.into_dimensionality::<Ix2>().map_err(|e| Error::Hdf5(format!(
            "invalid shape for 'Coordinates' dataset: {}", e
        )))?;
        if coordinates.ncols() != 3 {
            return Err(Error::Hdf5(format!(
                "expected 3 columns in 'Coordinates' dataset, got {}", coordinates.ncols()
            )));
        }

        let mass_table = file.group("Header")?.attribute("MassTable")?.read::<f64>()?;
        let mut mass = match mass_table.iter().nth(PARTICLE_TYPE) {
            Some(&mass) => mass,
            None => {
                return Err(Error::Hdf5(format!(
                    "expected at least {} values in 'MassTable' header attribute, got {}",
                    PARTICLE_TYPE + 1, mass_table.len()
                )));
            }
        };

        if mass == 0.0 {
            let masses = file.dataset("PartType1/Masses")?.read::<f64>()?;
            // without any particle, the mass does not matter
            mass = masses.iter().next().copied().unwrap_or(0.0);
            debug!("using the mass of the first particle ({}) for all particles", mass);
        }

        return Ok(ColumnDensity::with_mass(coordinates.view(), center, mass));
    }

    fn with_mass(coordinates: ArrayView2<'_, f64>, center: [f64; 3], mass: f64) -> ColumnDensity {
        let positions = &coordinates - &Array1::from(center.to_vec());
        return ColumnDensity {
            positions: positions,
            mass: mass,
        };
    }

    /// Get the mass used for every particle
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Get the number of particles
    pub fn len(&self) -> usize {
        self.positions.nrows()
    }

    /// Check if there are no particles
    pub fn is_empty(&self) -> bool {
        self.positions.nrows() == 0
    }

    /// Project the particles along `axis` (0, 1 or 2 for x, y or z) on a
    /// square map of size `box_size` centered on the origin, with `n_edges`
    /// bin edges (and `n_edges - 1` bins) along each side.
    ///
    /// The entry `[i, j]` of the map contains the mass per unit area in the
    /// bin `i` along the axis `(axis + 1) % 3` and `j` along `(axis + 2) % 3`.
    /// All bins are half-open, except the last one along each side which
    /// also includes its right edge. Particles outside of the map are
    /// ignored. If `log_scale` is `true`, the map contains the base 10
    /// logarithm of the column density, and empty bins are `-inf`.
    #[time_graph::instrument(name = "ColumnDensity::project")]
    pub fn project(&self, box_size: f64, n_edges: usize, axis: usize, log_scale: bool) -> Result<Array2<f64>, Error> {
        if axis > 2 {
            return Err(Error::InvalidParameter(format!(
                "projection axis must be 0, 1 or 2, got {}", axis
            )));
        }

        if !box_size.is_finite() || box_size <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "box_size must be a positive number, got {}", box_size
            )));
        }

        if n_edges < 2 {
            return Err(Error::InvalidParameter(format!(
                "at least 2 bin edges are required, got {}", n_edges
            )));
        }

        let edges = bin_edges(box_size, n_edges);
        let n_bins = n_edges - 1;
        let first_axis = (axis + 1) % 3;
        let second_axis = (axis + 2) % 3;

        let mut counts = Array2::<f64>::zeros((n_bins, n_bins));
        let mut outside = 0;
        for position in self.positions.rows() {
            let i = find_bin(&edges, position[first_axis]);
            let j = find_bin(&edges, position[second_axis]);
            match (i, j) {
                (Some(i), Some(j)) => counts[[i, j]] += 1.0,
                _ => outside += 1,
            }
        }

        if outside != 0 {
            info!("{} particles are outside of the projected map", outside);
        }

        let bin_width = box_size / n_bins as f64;
        let area = bin_width * bin_width;
        let mass = self.mass;
        let map = counts.mapv(|count| {
            let density = count * mass / area;
            if log_scale { density.log10() } else { density }
        });

        return Ok(map);
    }
}

/// Get `n_edges` evenly spaced bin edges covering `[-box_size/2, box_size/2]`
fn bin_edges(box_size: f64, n_edges: usize) -> Vec<f64> {
    let half = 0.5 * box_size;
    let step = box_size / (n_edges - 1) as f64;

    let mut edges = (0..n_edges).map(|i| -half + i as f64 * step).collect::<Vec<_>>();
    // make sure the last edge is exactly at the end of the range
    edges[n_edges - 1] = half;
    return edges;
}

/// Find the bin containing `value`, such that `edges[bin] <= value <
/// edges[bin + 1]`, or `value == edges[bin + 1]` for the last bin.
fn find_bin(edges: &[f64], value: f64) -> Option<usize> {
    let n_bins = edges.len() - 1;
    if value == edges[n_bins] {
        return Some(n_bins - 1);
    }

    let bin = edges.partition_point(|&edge| edge <= value);
    if bin == 0 || bin > n_bins {
        // NaN values also end up here, since all comparisons are false
        return None;
    }

    return Some(bin - 1);
}
