//! Mathematical functions used when sampling initial conditions.

mod gamma;
pub use self::gamma::{ln_gamma, gamma_lr};

mod maxwell;
pub use self::maxwell::MaxwellBoltzmann;

mod sphere;
pub use self::sphere::{isotropic_direction, ball_radius};
