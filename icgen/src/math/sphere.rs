use std::f64::consts::PI;

/// Get a unit vector with a direction uniformly distributed on the sphere,
/// from two uniform random numbers in `[0, 1)`.
///
/// The azimuthal angle is `2π u_phi`, and the polar angle is
/// `acos(1 - 2 u_theta)`: using a uniform polar angle instead would
/// over-sample the poles of the sphere.
#[inline]
pub fn isotropic_direction(u_theta: f64, u_phi: f64) -> [f64; 3] {
    let theta = f64::acos(1.0 - 2.0 * u_theta);
    let phi = 2.0 * PI * u_phi;

    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();

    return [sin_theta * cos_phi, sin_theta * sin_phi, cos_theta];
}

/// Get the distance to the center of a ball of the given `radius` for a point
/// uniformly distributed inside the ball, from a uniform random number `u` in
/// `[0, 1)`.
#[inline]
pub fn ball_radius(radius: f64, u: f64) -> f64 {
    radius * u.cbrt()
}
