use nalgebra::Point3;

use crate::{
    error::{Error, Result},
    transform::{ApplyTransform, Frame},
};

/// Primitive light shapes, centered at the origin of their local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prim {
    /// A segment along local X, `length` long.
    Segment { length: f32 },

    /// A zero-thickness rectangle in the local XZ plane, `length` along X and `width` along Z.
    Rectangle { length: f32, width: f32 },

    /// A ring of radius `range` in the local XZ plane.
    Torus { range: f32 },
}

fn check(param: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() && value >= 0. {
        Ok(value)
    } else {
        Err(Error::InvalidShape { param, value })
    }
}

impl Prim {
    pub fn segment(length: f32) -> Result<Self> {
        Ok(Prim::Segment {
            length: check("length", length)?,
        })
    }

    pub fn rectangle(length: f32, width: f32) -> Result<Self> {
        Ok(Prim::Rectangle {
            length: check("length", length)?,
            width: check("width", width)?,
        })
    }

    pub fn torus(range: f32) -> Result<Self> {
        Ok(Prim::Torus {
            range: check("range", range)?,
        })
    }
}

/// A primitive placed in the world by a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub prim: Prim,
    pub frame: Frame,
}

impl Shape {
    pub fn new(prim: Prim, frame: Frame) -> Self {
        Self { prim, frame }
    }

    /// A primitive sitting in the identity frame.
    pub fn local(prim: Prim) -> Self {
        Self::new(prim, Frame::new())
    }

    /// World-space end points of the shape's X extent, left then right. A ring has no end
    /// points.
    pub fn endpoints(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let half = match self.prim {
            Prim::Segment { length } | Prim::Rectangle { length, .. } => length / 2.,
            Prim::Torus { .. } => return None,
        };
        let p0 = Point3::new(-half, 0., 0.).apply(&self.frame);
        let p1 = Point3::new(half, 0., 0.).apply(&self.frame);
        Some((p0, p1))
    }
}

#[cfg(test)]
use approx::assert_relative_eq;

#[test]
fn test_validation() {
    assert!(Prim::segment(0.).is_ok());
    assert!(Prim::rectangle(2., 0.).is_ok());
    assert_eq!(
        Prim::segment(-1.),
        Err(Error::InvalidShape {
            param: "length",
            value: -1.
        })
    );
    assert!(matches!(
        Prim::rectangle(1., f32::NAN),
        Err(Error::InvalidShape { param: "width", .. })
    ));
    assert!(Prim::torus(f32::INFINITY).is_err());
}

#[test]
fn test_endpoints() {
    let frame = Frame::new()
        .translate(&Point3::new(0., 1., 0.))
        .rotate_euler(0., 90., 0.);
    let shape = Shape::new(Prim::segment(2.).unwrap(), frame);
    let (p0, p1) = shape.endpoints().unwrap();
    assert_relative_eq!(p0, Point3::new(0., 1., 1.), epsilon = 1e-6);
    assert_relative_eq!(p1, Point3::new(0., 1., -1.), epsilon = 1e-6);

    let quad = Shape::local(Prim::rectangle(3., 1.).unwrap());
    assert_eq!(
        quad.endpoints(),
        Some((Point3::new(-1.5, 0., 0.), Point3::new(1.5, 0., 0.)))
    );

    let ring = Shape::local(Prim::torus(2.).unwrap());
    assert_eq!(ring.endpoints(), None);
}
