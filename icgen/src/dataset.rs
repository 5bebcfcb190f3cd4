use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::Error;

/// Particles making up a set of initial conditions: positions, velocities,
/// identifiers and masses, together with the size of the simulation box.
///
/// All the per-particle arrays share the same first dimension `N`, which is
/// checked when creating the dataset. The arrays can not be modified after
/// creation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleDataset {
    box_size: f64,
    coordinates: Array2<f64>,
    velocities: Array2<f64>,
    ids: Array1<i64>,
    masses: Array1<f64>,
}

impl ParticleDataset {
    /// Create a new dataset from the given arrays.
    ///
    /// `coordinates` and `velocities` must have shape `(N, 3)`, while `ids` and
    /// `masses` must contain `N` entries. This function returns
    /// `Error::ShapeMismatch` if this is not the case.
    pub fn new(
        box_size: f64,
        coordinates: Array2<f64>,
        velocities: Array2<f64>,
        ids: Array1<i64>,
        masses: Array1<f64>,
    ) -> Result<ParticleDataset, Error> {
        let n_particles = coordinates.nrows();

        if coordinates.ncols() != 3 {
            return Err(Error::ShapeMismatch(format!(
                "coordinates must have 3 columns, got {}", coordinates.ncols()
            )));
        }

        if velocities.ncols() != 3 {
            return Err(Error::ShapeMismatch(format!(
                "velocities must have 3 columns, got {}", velocities.ncols()
            )));
        }

        let lengths = [
            ("velocities", velocities.nrows()),
            ("ids", ids.len()),
            ("masses", masses.len()),
        ];
        for (name, length) in lengths {
            if length != n_particles {
                return Err(Error::ShapeMismatch(format!(
                    "all particle arrays must have the same length, but coordinates \
                    contains {} particles and {} contains {}",
                    n_particles, name, length
                )));
            }
        }

        return Ok(ParticleDataset {
            box_size: box_size,
            coordinates: coordinates,
            velocities: velocities,
            ids: ids,
            masses: masses,
        });
    }

    /// Get the number of particles in this dataset
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Does this dataset contains any particle?
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Get the size of the simulation box
    pub fn box_size(&self) -> f64 {
        self.box_size
    }

    /// Get the positions of all particles, as an `(N, 3)` array
    pub fn coordinates(&self) -> ArrayView2<'_, f64> {
        self.coordinates.view()
    }

    /// Get the velocities of all particles, as an `(N, 3)` array
    pub fn velocities(&self) -> ArrayView2<'_, f64> {
        self.velocities.view()
    }

    /// Get the identifiers of all particles
    pub fn ids(&self) -> ArrayView1<'_, i64> {
        self.ids.view()
    }

    /// Get the masses of all particles
    pub fn masses(&self) -> ArrayView1<'_, f64> {
        self.masses.view()
    }
}
