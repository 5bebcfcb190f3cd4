use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;

use crate::generators::GeneratorBase;
use crate::generators::{UniformBox, UniformParameters};
use crate::generators::{SphereInBackground, SphereParameters};
use crate::{Error, ParticleDataset};

/// Initial conditions generator, created from its name and JSON parameters.
///
/// This is the entry point for code which does not know in advance which
/// generator will be used, for example when reading the configuration from a
/// file.
///
/// ```
/// let parameters = r#"{
///     "box_size": 10.0,
///     "density": 1.0,
///     "particle_mass": 2.0,
///     "velocity": 0.1
/// }"#;
///
/// let generator = icgen::Generator::new("uniform", parameters.into())?;
/// let dataset = generator.generate()?;
/// assert_eq!(dataset.len(), 500);
/// # Ok::<(), icgen::Error>(())
/// ```
pub struct Generator {
    implementation: Box<dyn GeneratorBase>,
    parameters: String,
}

impl From<Box<dyn GeneratorBase>> for Generator {
    fn from(implementation: Box<dyn GeneratorBase>) -> Generator {
        let parameters = implementation.parameters();
        Generator {
            implementation: implementation,
            parameters: parameters,
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("name", &self.implementation.name())
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl Generator {
    /// Create a new generator with the given `name` and `parameters`.
    ///
    /// The available generators are `"uniform"` (see
    /// [`UniformParameters`](crate::generators::UniformParameters)) and
    /// `"sphere_in_background"` (see
    /// [`SphereParameters`](crate::generators::SphereParameters)). The
    /// `parameters` should be formatted as JSON.
    ///
    /// # Errors
    ///
    /// This function returns an error if there is no registered generator with
    /// the given `name`, or if the parameters are invalid for this generator.
    pub fn new(name: &str, parameters: String) -> Result<Generator, Error> {
        let creator = match REGISTERED_GENERATORS.get(name) {
            Some(creator) => creator,
            None => {
                return Err(Error::InvalidParameter(format!(
                    "unknown generator with name '{}', expected one of {}",
                    name,
                    REGISTERED_GENERATORS.keys()
                        .map(|name| format!("'{}'", name))
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        };

        return Ok(Generator {
            implementation: creator(&parameters)?,
            parameters: parameters,
        });
    }

    /// Get the name of this generator
    pub fn name(&self) -> String {
        self.implementation.name()
    }

    /// Get the parameters used to create this generator in a string,
    /// formatted as JSON.
    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    /// Sample the particles for this generator
    pub fn generate(&self) -> Result<ParticleDataset, Error> {
        self.implementation.generate()
    }

    /// Sample the particles for this generator, and write them to a snapshot
    /// file at the given `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<ParticleDataset, Error> {
        let dataset = self.implementation.generate()?;
        crate::snapshot::write_snapshot(&dataset, path)?;
        return Ok(dataset);
    }
}

type GeneratorCreator = fn(&str) -> Result<Box<dyn GeneratorBase>, Error>;

macro_rules! add_generator {
    ($map :expr, $name :literal, $type :ty, $parameters :ty) => (
        $map.insert($name, (|json| {
            let parameters = serde_json::from_str::<$parameters>(json)?;
            Ok(Box::new(<$type>::new(parameters)?))
        }) as GeneratorCreator);
    );
}

static REGISTERED_GENERATORS: Lazy<BTreeMap<&'static str, GeneratorCreator>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    add_generator!(map, "uniform", UniformBox, UniformParameters);
    add_generator!(map, "sphere_in_background", SphereInBackground, SphereParameters);
    return map;
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_generator() {
        let error = Generator::new("lattice", "{}".into()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid parameter: unknown generator with name 'lattice', \
            expected one of 'sphere_in_background', 'uniform'"
        );
    }

    #[test]
    fn invalid_json() {
        let error = Generator::new("uniform", "{\"box_size\": ".into()).unwrap_err();
        assert!(matches!(error, Error::Json(_)));

        let error = Generator::new("sphere_in_background", "{}".into()).unwrap_err();
        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn invalid_parameters() {
        let parameters = r#"{
            "box_size": -10.0,
            "density": 1.0,
            "particle_mass": 2.0,
            "velocity": 0.1
        }"#;
        let error = Generator::new("uniform", parameters.into()).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: box_size must be a positive number, got -10");
    }

    #[test]
    fn sphere() {
        let parameters = r#"{
            "background_size": 4.0,
            "background_density": 1.0,
            "sphere_radius": 1.0,
            "sphere_particles": 36,
            "sphere_velocity": 1.0,
            "seed": 3
        }"#;
        let generator = Generator::new("sphere_in_background", parameters.into()).unwrap();
        assert_eq!(generator.name(), "sphere in background");
        assert_eq!(generator.parameters(), parameters);

        let dataset = generator.generate().unwrap();
        assert_eq!(dataset.len(), 100);
        assert_eq!(dataset.box_size(), 8.0);
    }

    #[test]
    fn from_implementation() {
        let implementation = UniformBox::new(UniformParameters {
            box_size: 2.0,
            density: 1.0,
            particle_mass: 1.0,
            velocity: 0.0,
            maxwell_distributed: false,
            seed: 42,
        }).unwrap();

        let generator = Generator::from(Box::new(implementation) as Box<dyn GeneratorBase>);
        assert_eq!(generator.name(), "uniform box");
        assert_eq!(
            generator.parameters(),
            r#"{"box_size":2.0,"density":1.0,"particle_mass":1.0,"velocity":0.0,"maxwell_distributed":false,"seed":42}"#
        );
        assert_eq!(generator.generate().unwrap().len(), 8);
    }
}
