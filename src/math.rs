use nalgebra::{Point3, Unit, Vector3};

use crate::error::{Error, Result};

/// The squared length of `vec`.
#[inline]
pub fn dot2(vec: &Vector3<f32>) -> f32 {
    vec.dot(vec)
}

/// Clamp every component of `vec` to be at least zero.
#[inline]
pub fn max_zero(vec: &Vector3<f32>) -> Vector3<f32> {
    vec.map(|c| c.max(0.))
}

#[inline]
pub fn deg_to_rad(deg: f32) -> f32 {
    (deg / 180.) * std::f32::consts::PI
}

pub trait Finite {
    fn is_finite(&self) -> bool;

    /// Fail with [`Error::NonFinite`] naming `what` when any component is NaN or infinite.
    fn ensure_finite(&self, what: &'static str) -> Result<()> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(Error::NonFinite(what))
        }
    }
}

impl Finite for Vector3<f32> {
    #[inline]
    fn is_finite(&self) -> bool {
        self.iter().all(|c| c.is_finite())
    }
}

impl Finite for Point3<f32> {
    #[inline]
    fn is_finite(&self) -> bool {
        self.coords.is_finite()
    }
}

/// Normalize a caller-supplied direction, rejecting non-finite and zero-length input.
pub fn direction(vec: &Vector3<f32>) -> Result<Unit<Vector3<f32>>> {
    vec.ensure_finite("direction")?;
    Unit::try_new(*vec, f32::EPSILON).ok_or(Error::DegenerateDirection)
}

#[test]
fn test_deg_to_rad() {
    assert_eq!(std::f32::consts::PI, deg_to_rad(180.));
}

#[test]
fn test_max_zero() {
    let v = max_zero(&Vector3::new(-1., 0., 2.5));
    assert_eq!(v, Vector3::new(0., 0., 2.5));
}

#[test]
fn test_direction() {
    let d = direction(&Vector3::new(0., 0., 3.)).unwrap();
    assert_eq!(d.into_inner(), Vector3::new(0., 0., 1.));

    assert_eq!(
        direction(&Vector3::zeros()).unwrap_err(),
        Error::DegenerateDirection
    );
    assert_eq!(
        direction(&Vector3::new(f32::NAN, 0., 1.)).unwrap_err(),
        Error::NonFinite("direction")
    );
}

#[test]
fn test_ensure_finite() {
    assert!(Point3::new(1., 2., 3.).ensure_finite("p").is_ok());
    assert_eq!(
        Point3::new(1., f32::INFINITY, 3.).ensure_finite("p"),
        Err(Error::NonFinite("p"))
    );
}
