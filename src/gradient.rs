use nalgebra::{Point3, Unit, Vector3};

use crate::{
    error::{Error, Result},
    math::Finite,
    shape::Shape,
};

#[derive(Debug, Clone, PartialEq)]
pub struct GradientConfig {
    /// The probe offset along each world axis. Larger values smooth over sharp features such as
    /// rectangle corners, smaller ones follow the surface more closely but pick up float noise.
    pub delta: f32,

    /// Raw gradients no longer than this are reported as degenerate.
    pub min_gradient: f32,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            delta: 0.1,
            min_gradient: 1e-6,
        }
    }
}

impl GradientConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.delta.is_finite() && self.delta > 0.) {
            return Err(Error::InvalidConfig("delta must be finite and positive"));
        }
        if !(self.min_gradient.is_finite() && self.min_gradient >= 0.) {
            return Err(Error::InvalidConfig("min_gradient must be finite and non-negative"));
        }
        Ok(())
    }
}

/// Estimate the outward surface normal near `center` from field samples alone.
///
/// The field is probed at `center - delta` along each world axis and compared against its value
/// at `center`. Each difference approximates `delta` times the partial derivative, so the
/// resulting vector points towards increasing field values, away from the shape.
pub fn estimate_normal(
    center: &Point3<f32>,
    shape: &Shape,
    config: &GradientConfig,
) -> Result<Unit<Vector3<f32>>> {
    config.validate()?;
    center.ensure_finite("center")?;

    let dist = shape.distance(center);
    let offset = Vector3::new(config.delta, 0.0, 0.0);
    let step = |off: Vector3<f32>| dist - shape.distance(&(center - off));

    let gradient = Vector3::new(
        step(offset.xyy()),
        step(offset.yxy()),
        step(offset.yyx()),
    );

    Unit::try_new(gradient, config.min_gradient).ok_or(Error::DegenerateGradient {
        x: center.x,
        y: center.y,
        z: center.z,
    })
}

#[cfg(test)]
use {
    crate::{shape::Prim, transform::Frame},
    approx::assert_relative_eq,
    rand::{rngs::StdRng, Rng, SeedableRng},
};

#[test]
fn test_normal_above_segment() {
    let shape = Shape::local(Prim::segment(1.).unwrap());
    let n = estimate_normal(&Point3::new(0., 0.5, 0.), &shape, &GradientConfig::default()).unwrap();
    assert_eq!(n.x, 0.);
    assert!(n.y > 0.99);

    let n = estimate_normal(&Point3::new(0., -2., 0.), &shape, &GradientConfig::default()).unwrap();
    assert_eq!(n.x, 0.);
    assert!(n.y < -0.99);
}

#[test]
fn test_normal_past_endpoint() {
    let shape = Shape::local(Prim::segment(1.).unwrap());
    let n = estimate_normal(&Point3::new(2., 0., 0.), &shape, &GradientConfig::default()).unwrap();
    assert!(n.x > 0.99);
}

#[test]
fn test_normal_above_rectangle() {
    let shape = Shape::local(Prim::rectangle(2., 2.).unwrap());
    let n = estimate_normal(&Point3::new(0.3, 1., -0.2), &shape, &GradientConfig::default()).unwrap();
    assert_relative_eq!(n.into_inner(), Vector3::new(0., 1., 0.), epsilon = 1e-6);
}

#[test]
fn test_normal_outside_torus() {
    let shape = Shape::local(Prim::torus(2.).unwrap());
    let n = estimate_normal(&Point3::new(3., 0., 0.), &shape, &GradientConfig::default()).unwrap();
    assert!(n.x > 0.99);
}

#[test]
fn test_normal_follows_frame() {
    let frame = Frame::new()
        .translate(&Point3::new(5., 0., 0.))
        .rotate_euler(0., 0., 90.);
    let shape = Shape::new(Prim::rectangle(2., 2.).unwrap(), frame);

    // the rectangle's local up now points along world -X
    let n = estimate_normal(&Point3::new(3., 0., 0.), &shape, &GradientConfig::default()).unwrap();
    assert_relative_eq!(n.into_inner(), Vector3::new(-1., 0., 0.), epsilon = 1e-4);
}

#[test]
fn test_degenerate_when_probes_agree() {
    // every probe lands exactly as far from the segment as the center
    let shape = Shape::local(Prim::segment(1.).unwrap());
    assert_eq!(
        estimate_normal(&Point3::new(0., 0.05, 0.05), &shape, &GradientConfig::default()),
        Err(Error::DegenerateGradient {
            x: 0.,
            y: 0.05,
            z: 0.05
        })
    );

    let shape = Shape::local(Prim::rectangle(2., 2.).unwrap());
    assert!(matches!(
        estimate_normal(&Point3::new(0.5, 0.05, 0.5), &shape, &GradientConfig::default()),
        Err(Error::DegenerateGradient { .. })
    ));
}

#[test]
fn test_invalid_config() {
    let shape = Shape::local(Prim::segment(1.).unwrap());
    let config = GradientConfig {
        delta: 0.,
        ..GradientConfig::default()
    };
    assert!(matches!(
        estimate_normal(&Point3::new(0., 1., 0.), &shape, &config),
        Err(Error::InvalidConfig(_))
    ));
    assert_eq!(
        estimate_normal(
            &Point3::new(0., f32::NAN, 0.),
            &shape,
            &GradientConfig::default()
        ),
        Err(Error::NonFinite("center"))
    );
}

#[test]
fn test_unit_norm() {
    let mut rng = StdRng::seed_from_u64(7);
    let shapes = [
        Shape::local(Prim::segment(1.5).unwrap()),
        Shape::local(Prim::rectangle(2., 1.).unwrap()),
        Shape::local(Prim::torus(1.).unwrap()),
    ];

    for shape in &shapes {
        for _ in 0..200 {
            let center = Point3::new(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
            );
            let delta = rng.gen_range(0.001..0.5);
            let config = GradientConfig {
                delta,
                ..GradientConfig::default()
            };
            match estimate_normal(&center, shape, &config) {
                Ok(n) => assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-5),
                Err(err) => assert!(matches!(err, Error::DegenerateGradient { .. })),
            }
        }
    }
}
