use log::{info, warn};
use ndarray::{s, Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::math::ball_radius;
use crate::{Error, ParticleDataset};

use super::GeneratorBase;
use super::{check_positive, check_non_negative, particle_count};
use super::{uniform_positions, uniform_samples, isotropic_vectors};

/// Parameters for the generation of a sphere of particles moving inside a
/// background of particles at rest.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SphereParameters {
    /// Length of the edges of the background cube. The simulation box will be
    /// twice as large.
    pub background_size: f64,
    /// Number density of particles in the background. The number of
    /// background particles is `floor(background_size^3 * background_density)`.
    pub background_density: f64,
    /// Radius of the sphere
    pub sphere_radius: f64,
    /// Number of particles inside the sphere
    pub sphere_particles: usize,
    /// Velocity of the sphere particles, along the z axis
    pub sphere_velocity: f64,
    /// Seed of the random number generator
    #[serde(default = "super::default_seed")]
    pub seed: u64,
}

/// A sphere of particles embedded in an uniform background.
///
/// The background particles are uniformly distributed in
/// `[0, background_size)^3` and at rest. The sphere particles are uniformly
/// distributed inside a sphere of radius `sphere_radius` touching the `z = 0`
/// plane, centered at `(background_size / 2, background_size / 2,
/// sphere_radius)`, and all move with velocity `(0, 0, sphere_velocity)`.
///
/// All particles have a mass of 1. The background particles come first in the
/// generated dataset, followed by the sphere particles.
#[derive(Debug, Clone)]
pub struct SphereInBackground {
    parameters: SphereParameters,
    background_particles: usize,
}

impl SphereInBackground {
    /// Create a new `SphereInBackground` generator, checking the given
    /// parameters.
    ///
    /// The background size and sphere radius must be strictly positive, the
    /// background density must be positive or zero, and the parameters must
    /// correspond to at least one particle.
    pub fn new(parameters: SphereParameters) -> Result<SphereInBackground, Error> {
        check_positive("background_size", parameters.background_size)?;
        check_non_negative("background_density", parameters.background_density)?;
        check_positive("sphere_radius", parameters.sphere_radius)?;
        if !parameters.sphere_velocity.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "sphere_velocity must be a finite number, got {}", parameters.sphere_velocity
            )));
        }

        let background_particles = particle_count(
            parameters.background_size.powi(3) * parameters.background_density
        )?;

        if background_particles.checked_add(parameters.sphere_particles).is_none() {
            return Err(Error::InvalidParameter(
                "the total number of particles does not fit in an usize".into()
            ));
        }

        if background_particles + parameters.sphere_particles == 0 {
            return Err(Error::InvalidParameter(
                "these parameters do not create any particle".into()
            ));
        }

        if parameters.sphere_radius > 0.5 * parameters.background_size {
            warn!(
                "the sphere (radius {}) does not fit inside the simulation box (size {})",
                parameters.sphere_radius, 2.0 * parameters.background_size
            );
        }

        return Ok(SphereInBackground {
            parameters: parameters,
            background_particles: background_particles,
        });
    }

    /// Get the parameters of this generator
    pub fn parameters(&self) -> &SphereParameters {
        &self.parameters
    }

    /// Get the number of background particles. These are the first particles
    /// in the generated dataset.
    pub fn background_particles(&self) -> usize {
        self.background_particles
    }

    /// Get the total number of particles this generator will create
    pub fn n_particles(&self) -> usize {
        self.background_particles + self.parameters.sphere_particles
    }

    /// Get the position of the center of the sphere
    pub fn sphere_center(&self) -> [f64; 3] {
        let half_size = 0.5 * self.parameters.background_size;
        return [half_size, half_size, self.parameters.sphere_radius];
    }
}

impl GeneratorBase for SphereInBackground {
    fn name(&self) -> String {
        "sphere in background".into()
    }

    fn parameters(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    #[time_graph::instrument(name = "SphereInBackground::generate")]
    fn generate(&self) -> Result<ParticleDataset, Error> {
        let parameters = &self.parameters;
        let n_background = self.background_particles;
        let n_sphere = parameters.sphere_particles;
        let n_particles = self.n_particles();

        let mut rng = ChaCha8Rng::seed_from_u64(parameters.seed);

        let background = uniform_positions(&mut rng, n_background, parameters.background_size);

        let radii = uniform_samples(&mut rng, n_sphere).mapv(|u| ball_radius(parameters.sphere_radius, u));
        let mut sphere = isotropic_vectors(&mut rng, radii.view());
        sphere += &Array1::from(self.sphere_center().to_vec());

        let mut coordinates = Array2::<f64>::zeros((n_particles, 3));
        coordinates.slice_mut(s![..n_background, ..]).assign(&background);
        coordinates.slice_mut(s![n_background.., ..]).assign(&sphere);

        let mut velocities = Array2::<f64>::zeros((n_particles, 3));
        velocities.slice_mut(s![n_background.., 2]).fill(parameters.sphere_velocity);

        let ids = (0..n_particles).map(|i| i as i64).collect::<Array1<_>>();
        let masses = Array1::from_elem(n_particles, 1.0);

        info!(
            "generated {} background particles and {} particles in a sphere of radius {}",
            n_background, n_sphere, parameters.sphere_radius
        );

        return ParticleDataset::new(
            2.0 * parameters.background_size,
            coordinates,
            velocities,
            ids,
            masses,
        );
    }
}
