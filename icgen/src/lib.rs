#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Generation of particle initial conditions for astrophysical simulations,
//! stored as HDF5 snapshots following the Gadget/SWIFT "PartType" schema.
//!
//! The usual workflow is to create a generator with its parameters, generate a
//! [`ParticleDataset`] and write it to a file with [`snapshot::write_snapshot`]:
//!
//! ```no_run
//! use icgen::generators::{GeneratorBase, UniformBox, UniformParameters};
//!
//! let generator = UniformBox::new(UniformParameters {
//!     box_size: 10.0,
//!     density: 1.0,
//!     particle_mass: 1.0,
//!     velocity: 0.5,
//!     maxwell_distributed: true,
//!     seed: 42,
//! })?;
//!
//! let dataset = generator.generate()?;
//! icgen::snapshot::write_snapshot(&dataset, "uniform_ICs.hdf5")?;
//! # Ok::<(), icgen::Error>(())
//! ```

pub mod math;

mod errors;
pub use self::errors::Error;

mod dataset;
pub use self::dataset::ParticleDataset;

pub mod generators;

mod generator;
pub use self::generator::Generator;

pub mod hdf5;
pub mod snapshot;

pub mod logging;
