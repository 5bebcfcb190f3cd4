use log::info;
use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::math::MaxwellBoltzmann;
use crate::{Error, ParticleDataset};

use super::GeneratorBase;
use super::{check_positive, check_non_negative, particle_count};
use super::{uniform_positions, uniform_samples, isotropic_vectors};

/// Parameters for the generation of particles uniformly distributed in a
/// cubic box.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UniformParameters {
    /// Length of the edges of the cubic box. Particles are placed in
    /// `[0, box_size)` along each axis.
    pub box_size: f64,
    /// Mass density inside the box. The number of particles is
    /// `floor(box_size^3 * density / particle_mass)`.
    pub density: f64,
    /// Mass of each particle
    pub particle_mass: f64,
    /// Norm of the particles velocity. If `maxwell_distributed` is `true`,
    /// this is the mean of the Maxwell-Boltzmann distribution of speeds.
    pub velocity: f64,
    /// Should the speeds be sampled from a Maxwell-Boltzmann distribution
    /// instead of all having the same value?
    #[serde(default)]
    pub maxwell_distributed: bool,
    /// Seed of the random number generator
    #[serde(default = "super::default_seed")]
    pub seed: u64,
}

/// Particles uniformly distributed in a cubic box, with isotropic velocities.
///
/// The velocities all have the same norm, or norms following a
/// Maxwell-Boltzmann distribution. Their direction is uniformly distributed on
/// the unit sphere.
#[derive(Debug, Clone)]
pub struct UniformBox {
    parameters: UniformParameters,
    n_particles: usize,
}

impl UniformBox {
    /// Create a new `UniformBox` generator, checking the given parameters.
    ///
    /// The box size, density and particle mass must be strictly positive, and
    /// the velocity must be positive or zero. The parameters must also
    /// correspond to at least one particle.
    pub fn new(parameters: UniformParameters) -> Result<UniformBox, Error> {
        check_positive("box_size", parameters.box_size)?;
        check_positive("density", parameters.density)?;
        check_positive("particle_mass", parameters.particle_mass)?;
        check_non_negative("velocity", parameters.velocity)?;

        let n_particles = particle_count(
            parameters.box_size.powi(3) * parameters.density / parameters.particle_mass
        )?;

        if n_particles == 0 {
            return Err(Error::InvalidParameter(format!(
                "a box of size {} with density {} can not contain any particle of mass {}",
                parameters.box_size, parameters.density, parameters.particle_mass
            )));
        }

        return Ok(UniformBox {
            parameters: parameters,
            n_particles: n_particles,
        });
    }

    /// Get the parameters of this generator
    pub fn parameters(&self) -> &UniformParameters {
        &self.parameters
    }

    /// Get the number of particles this generator will create
    pub fn n_particles(&self) -> usize {
        self.n_particles
    }
}

impl GeneratorBase for UniformBox {
    fn name(&self) -> String {
        "uniform box".into()
    }

    fn parameters(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    #[time_graph::instrument(name = "UniformBox::generate")]
    fn generate(&self) -> Result<ParticleDataset, Error> {
        let parameters = &self.parameters;
        let n_particles = self.n_particles;

        let mut rng = ChaCha8Rng::seed_from_u64(parameters.seed);

        let coordinates = uniform_positions(&mut rng, n_particles, parameters.box_size);

        let speeds = if parameters.maxwell_distributed {
            let distribution = MaxwellBoltzmann::with_mean(parameters.velocity)?;
            uniform_samples(&mut rng, n_particles).mapv(|u| distribution.inverse_cdf(u))
        } else {
            Array1::from_elem(n_particles, parameters.velocity)
        };
        let velocities = isotropic_vectors(&mut rng, speeds.view());

        let ids = (0..n_particles).map(|i| i as i64).collect::<Array1<_>>();
        let masses = Array1::from_elem(n_particles, parameters.particle_mass);

        info!(
            "generated {} particles in a box of size {} ({} velocities)",
            n_particles,
            parameters.box_size,
            if parameters.maxwell_distributed { "Maxwell-Boltzmann" } else { "fixed-speed" },
        );

        return ParticleDataset::new(parameters.box_size, coordinates, velocities, ids, masses);
    }
}
