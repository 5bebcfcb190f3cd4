use std::f64::consts::PI;

use log::warn;

use crate::Error;
use super::gamma_lr;

/// Maximal number of Newton/bisection steps in `MaxwellBoltzmann::inverse_cdf`
const MAX_INVERSE_ITERATIONS: usize = 200;

/// Maxwell-Boltzmann distribution of speeds, i.e. the distribution of the norm
/// of a 3D vector where each component follows an independent normal
/// distribution with standard deviation `scale`.
///
/// The cumulative distribution function is
///
/// $$ F(v) = P\left(\frac{3}{2}, \frac{v^2}{2 a^2}\right) $$
///
/// where $P$ is the regularized lower incomplete gamma function and $a$ the
/// scale of the distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxwellBoltzmann {
    scale: f64,
}

impl MaxwellBoltzmann {
    /// Create a new distribution with the given `scale` parameter, which must
    /// be a finite positive number (or zero for a degenerate distribution
    /// where all speeds are zero).
    pub fn new(scale: f64) -> Result<MaxwellBoltzmann, Error> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "the scale of a Maxwell-Boltzmann distribution must be positive, got {}", scale
            )));
        }

        return Ok(MaxwellBoltzmann { scale });
    }

    /// Create a new distribution with the given `mean` speed. The scale of the
    /// distribution is `mean / sqrt(8 / pi)`.
    pub fn with_mean(mean: f64) -> Result<MaxwellBoltzmann, Error> {
        if !mean.is_finite() || mean < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "the mean of a Maxwell-Boltzmann distribution must be positive, got {}", mean
            )));
        }

        return MaxwellBoltzmann::new(mean / f64::sqrt(8.0 / PI));
    }

    /// Get the scale parameter of this distribution
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Get the mean speed of this distribution
    pub fn mean(&self) -> f64 {
        self.scale * f64::sqrt(8.0 / PI)
    }

    /// Probability density function, evaluated at `speed`
    pub fn pdf(&self, speed: f64) -> f64 {
        if speed < 0.0 || self.scale == 0.0 {
            return 0.0;
        }

        let a = self.scale;
        let x2 = speed * speed / (a * a);
        return f64::sqrt(2.0 / PI) * x2 * f64::exp(-0.5 * x2) / a;
    }

    /// Cumulative distribution function, evaluated at `speed`
    pub fn cdf(&self, speed: f64) -> f64 {
        if speed <= 0.0 {
            return 0.0;
        } else if self.scale == 0.0 {
            return 1.0;
        }

        let a = self.scale;
        return gamma_lr(1.5, speed * speed / (2.0 * a * a));
    }

    /// Inverse of the cumulative distribution function (percent point
    /// function): get the speed `v` such that `self.cdf(v) == probability`.
    ///
    /// `probability` should be inside `[0, 1]`; values below 0 give a zero
    /// speed and values above 1 an infinite speed.
    ///
    /// The function is inverted numerically, using Newton steps on the reduced
    /// variable `z = v^2 / 2a^2` safeguarded by bisection.
    pub fn inverse_cdf(&self, probability: f64) -> f64 {
        if probability.is_nan() {
            return f64::NAN;
        } else if probability <= 0.0 || self.scale == 0.0 {
            return 0.0;
        } else if probability >= 1.0 {
            return f64::INFINITY;
        }

        // bracket the solution
        let mut low = 0.0;
        let mut high = 1.0;
        while gamma_lr(1.5, high) < probability {
            low = high;
            high *= 2.0;
        }

        // derivative of P(3/2, z) with respect to z is sqrt(z) exp(-z) / Γ(3/2)
        let gamma_3_2 = 0.5 * PI.sqrt();

        let mut z = 0.5 * (low + high);
        let mut converged = false;
        for _ in 0..MAX_INVERSE_ITERATIONS {
            let residual = gamma_lr(1.5, z) - probability;
            if residual.abs() <= f64::EPSILON * probability {
                converged = true;
                break;
            } else if residual < 0.0 {
                low = z;
            } else {
                high = z;
            }

            let derivative = f64::sqrt(z) * f64::exp(-z) / gamma_3_2;
            let mut next = z - residual / derivative;
            if !(next > low && next < high) {
                next = 0.5 * (low + high);
            }

            if (next - z).abs() <= 4.0 * f64::EPSILON * next || high - low <= 4.0 * f64::EPSILON * next {
                z = next;
                converged = true;
                break;
            }
            z = next;
        }

        if !converged {
            warn!(
                "inverse CDF of the Maxwell-Boltzmann distribution did not converge for p = {}",
                probability
            );
        }

        return self.scale * f64::sqrt(2.0 * z);
    }
}
