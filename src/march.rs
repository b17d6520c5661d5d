use log::{debug, trace};
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use crate::{
    error::{Error, Result},
    math::{self, Finite},
    shape::Shape,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MarchConfig {
    /// The number of field evaluations to perform.
    pub max_steps: u32,

    /// Stop as soon as a sample is at most this far from the surface.
    pub min_dist: f32,
}

impl Default for MarchConfig {
    fn default() -> Self {
        Self {
            max_steps: 4,
            min_dist: 0.,
        }
    }
}

impl MarchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(Error::InvalidConfig("max_steps must be at least 1"));
        }
        if !(self.min_dist.is_finite() && self.min_dist >= 0.) {
            return Err(Error::InvalidConfig("min_dist must be finite and non-negative"));
        }
        Ok(())
    }
}

/// A point visited by the march, with the field value there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub point: Point3<f32>,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarchResult {
    // never empty
    steps: SmallVec<[Sample; 4]>,
    diverged: bool,
}

impl MarchResult {
    /// Every sample, in marching order.
    pub fn steps(&self) -> &[Sample] {
        &self.steps
    }

    /// The final sample.
    pub fn last(&self) -> &Sample {
        &self.steps[self.steps.len() - 1]
    }

    /// The sample before the final one, or the final one when the march only took a single step.
    pub fn prior(&self) -> &Sample {
        &self.steps[self.steps.len().saturating_sub(2)]
    }

    /// The earliest sample with the smallest distance. For a march that starts moving away from
    /// the shape this is the last position before it did.
    pub fn closest(&self) -> &Sample {
        self.steps[1..].iter().fold(&self.steps[0], |best, sample| {
            if sample.distance < best.distance {
                sample
            } else {
                best
            }
        })
    }

    /// True when some step ended further from the surface than the step before it.
    pub fn diverged(&self) -> bool {
        self.diverged
    }
}

/// Sphere trace from `origin` along `direction`, stepping by the field value each time.
pub fn march(
    origin: &Point3<f32>,
    direction: &Vector3<f32>,
    shape: &Shape,
    config: &MarchConfig,
) -> Result<MarchResult> {
    config.validate()?;
    origin.ensure_finite("origin")?;
    let direction = math::direction(direction)?;

    let mut steps: SmallVec<[Sample; 4]> = SmallVec::new();
    let mut diverged = false;
    let mut pos = *origin;

    for step in 0..config.max_steps {
        let distance = shape.distance(&pos);
        if !distance.is_finite() {
            return Err(Error::NonFinite("march distance"));
        }
        trace!("march step {}: {:?} at distance {}", step, pos, distance);

        if let Some(prev) = steps.last() {
            diverged |= distance > prev.distance;
        }
        steps.push(Sample {
            point: pos,
            distance,
        });

        if distance <= config.min_dist {
            break;
        }

        pos += direction.scale(distance);
    }

    if diverged {
        debug!(
            "march from {:?} along {:?} moved away from the shape",
            origin, direction
        );
    }

    Ok(MarchResult { steps, diverged })
}

#[cfg(test)]
use crate::shape::Prim;

#[cfg(test)]
fn segment(length: f32) -> Shape {
    Shape::local(Prim::segment(length).unwrap())
}

#[test]
fn test_head_on() {
    let shape = segment(1.);
    let res = march(
        &Point3::new(0., 3., 0.),
        &Vector3::new(0., -1., 0.),
        &shape,
        &MarchConfig::default(),
    )
    .unwrap();

    // the first step lands exactly on the segment
    assert_eq!(res.steps().len(), 2);
    assert_eq!(res.prior().distance, 3.);
    assert_eq!(res.last().distance, 0.);
    assert_eq!(res.last().point, Point3::origin());
    assert!(!res.diverged());
}

#[test]
fn test_oblique_convergence() {
    let shape = segment(4.);
    let origin = Point3::new(0., 2., 0.);
    let res = march(
        &origin,
        &Vector3::new(0.5, -1., 0.),
        &shape,
        &MarchConfig::default(),
    )
    .unwrap();

    assert_eq!(res.steps().len(), 4);
    assert_eq!(res.steps()[0].distance, 2.);
    for pair in res.steps().windows(2) {
        assert!(pair[1].distance <= pair[0].distance);
    }
    assert!(res.last().distance < 2.);
    assert!(res.last().distance < res.prior().distance);
    assert_eq!(res.closest(), res.last());
    assert!(!res.diverged());
}

#[test]
fn test_divergent_march() {
    let shape = segment(1.);
    let origin = Point3::new(0., 0.5, 0.);
    let res = march(
        &origin,
        &Vector3::new(0., 0., 1.),
        &shape,
        &MarchConfig::default(),
    )
    .unwrap();

    assert_eq!(res.steps().len(), 4);
    assert!(res.diverged());
    assert_eq!(res.closest().point, origin);
    assert_eq!(res.closest().distance, 0.5);
    assert!(res.last().distance > res.prior().distance);
}

#[test]
fn test_single_step() {
    let shape = segment(1.);
    let config = MarchConfig {
        max_steps: 1,
        ..MarchConfig::default()
    };
    let res = march(&Point3::new(0., 1., 0.), &Vector3::new(0., -1., 0.), &shape, &config).unwrap();
    assert_eq!(res.steps().len(), 1);
    assert_eq!(res.last(), res.prior());
    assert_eq!(res.last().distance, 1.);
}

#[test]
fn test_early_exit() {
    let shape = segment(4.);
    let config = MarchConfig {
        max_steps: 100,
        min_dist: 0.01,
    };
    let res = march(&Point3::new(0., 2., 0.), &Vector3::new(0.5, -1., 0.), &shape, &config).unwrap();
    assert!(res.steps().len() < 100);
    assert!(res.last().distance <= 0.01);
}

#[test]
fn test_invalid_inputs() {
    let shape = segment(1.);
    let up = Vector3::new(0., 1., 0.);

    let config = MarchConfig {
        max_steps: 0,
        ..MarchConfig::default()
    };
    assert!(matches!(
        march(&Point3::origin(), &up, &shape, &config),
        Err(Error::InvalidConfig(_))
    ));

    let config = MarchConfig::default();
    assert_eq!(
        march(&Point3::new(f32::NAN, 0., 0.), &up, &shape, &config),
        Err(Error::NonFinite("origin"))
    );
    assert_eq!(
        march(&Point3::origin(), &Vector3::zeros(), &shape, &config),
        Err(Error::DegenerateDirection)
    );
}
