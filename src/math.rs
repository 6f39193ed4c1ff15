//! Math types and the angular distance kernel for Sonosphere

pub use glam::{DVec3, Vec3};

use crate::error::{Result, SonoError};
use rand::Rng;

/// Vectors shorter than this cannot define a direction.
pub const MIN_DIRECTION_MAGNITUDE: f32 = 1e-6;

/// Angular distance between two directions, in degrees, always within `[0, 180]`.
///
/// The cosine ratio is clamped to `[-1, 1]` before `acos` so rounding never
/// produces NaN. Zero-length or non-finite inputs are rejected.
pub fn angle_between(a: Vec3, b: Vec3) -> Result<f32> {
    check_direction(a)?;
    check_direction(b)?;

    let (a, b) = (a.as_dvec3(), b.as_dvec3());
    let ratio = a.dot(b) / (a.length_squared() * b.length_squared()).sqrt();
    let degrees = ratio.clamp(-1.0, 1.0).acos().to_degrees();

    Ok((degrees as f32).clamp(0.0, 180.0))
}

/// Returns the unit vector for `v`, or `InvalidDirection` if it has no usable direction.
pub fn normalize_direction(v: Vec3) -> Result<Vec3> {
    check_direction(v)?;
    Ok(v.normalize())
}

fn check_direction(v: Vec3) -> Result<()> {
    if !v.is_finite() {
        return Err(SonoError::InvalidDirection(format!(
            "non-finite component in {:?}",
            v
        )));
    }
    if v.length() < MIN_DIRECTION_MAGNITUDE {
        return Err(SonoError::InvalidDirection(format!(
            "zero-magnitude vector {:?}",
            v
        )));
    }
    Ok(())
}

/// Uniformly distributed unit vector on the sphere.
pub fn random_unit_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let theta = rng.gen_range(0.0..std::f64::consts::TAU);
    let z: f64 = rng.gen_range(-1.0..1.0);
    let r = (1.0 - z * z).sqrt();

    DVec3::new(r * theta.cos(), r * theta.sin(), z).as_vec3()
}
