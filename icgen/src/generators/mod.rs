//! Generators of initial conditions, sampling particles positions and
//! velocities from different distributions.

use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::math::isotropic_direction;
use crate::{Error, ParticleDataset};

/// Common interface for all initial conditions generators
pub trait GeneratorBase {
    /// Get a human readable description of this generator
    fn name(&self) -> String;

    /// Get the parameters used to create this generator as a JSON string
    fn parameters(&self) -> String;

    /// Sample all the particles and gather them in a new dataset.
    ///
    /// Generators own their random number generator seed, and create a new
    /// random stream from it in each call to this function: calling
    /// `generate` multiple times on the same generator gives the same
    /// particles every time.
    fn generate(&self) -> Result<ParticleDataset, Error>;
}

mod uniform;
pub use self::uniform::{UniformBox, UniformParameters};

mod sphere;
pub use self::sphere::{SphereInBackground, SphereParameters};

fn default_seed() -> u64 {
    42
}

/// Check that `value` is a finite, strictly positive number
fn check_positive(name: &str, value: f64) -> Result<(), Error> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "{} must be a positive number, got {}", name, value
        )));
    }
    return Ok(());
}

/// Check that `value` is a finite, positive or zero number
fn check_non_negative(name: &str, value: f64) -> Result<(), Error> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "{} must be a positive number or zero, got {}", name, value
        )));
    }
    return Ok(());
}

/// Convert an expected number of particles to an integer count, dropping the
/// fractional part.
fn particle_count(expected: f64) -> Result<usize, Error> {
    // ids are stored as i64 in the snapshot files
    if !expected.is_finite() || expected >= i64::MAX as f64 {
        return Err(Error::InvalidParameter(format!(
            "these parameters would create {} particles, which is too many", expected
        )));
    }

    return Ok(expected.floor() as usize);
}

/// Draw `n_particles` positions uniformly in the `[0, box_size)^3` cube.
///
/// The random numbers are consumed particle by particle, for the x, y and z
/// components in order.
fn uniform_positions<R: Rng>(rng: &mut R, n_particles: usize, box_size: f64) -> Array2<f64> {
    let distribution = Uniform::new(0.0, box_size);

    let mut positions = Array2::<f64>::zeros((n_particles, 3));
    for value in positions.iter_mut() {
        *value = distribution.sample(rng);
    }

    return positions;
}

/// Draw `count` random numbers uniformly distributed in `[0, 1)`
fn uniform_samples<R: Rng>(rng: &mut R, count: usize) -> Array1<f64> {
    Array1::from_shape_simple_fn(count, || rng.gen::<f64>())
}

/// Create vectors with the given `norms` and isotropic directions. All the
/// random numbers for the polar angles are drawn first, followed by the ones
/// for the azimuthal angles.
fn isotropic_vectors<R: Rng>(rng: &mut R, norms: ArrayView1<'_, f64>) -> Array2<f64> {
    let u_theta = uniform_samples(rng, norms.len());
    let u_phi = uniform_samples(rng, norms.len());

    let mut vectors = Array2::<f64>::zeros((norms.len(), 3));
    Zip::from(vectors.rows_mut())
        .and(&norms)
        .and(&u_theta)
        .and(&u_phi)
        .for_each(|mut vector, &norm, &u_theta, &u_phi| {
            let direction = isotropic_direction(u_theta, u_phi);
            vector[0] = norm * direction[0];
            vector[1] = norm * direction[1];
            vector[2] = norm * direction[2];
        });

    return vectors;
}
