use approx::AbsDiffEq;
use nalgebra::{Point3, Vector2, Vector3};

use crate::{
    math::{dot2, max_zero},
    shape::{Prim, Shape},
    transform::ApplyTransform,
};

impl Prim {
    /// The unsigned squared distance from a local-space point to the primitive. The segment and
    /// rectangle fields are zero on their whole footprint, there is no interior.
    pub fn field_squared(&self, p: &Point3<f32>) -> f32 {
        match *self {
            Prim::Segment { length } => box_squared(p, &Vector3::new(length / 2., 0., 0.)),

            Prim::Rectangle { length, width } => {
                box_squared(p, &Vector3::new(length / 2., 0., width / 2.))
            }

            Prim::Torus { range } => {
                let q = Vector2::new(p.coords.xz().norm() - range, p.y);
                q.dot(&q)
            }
        }
    }

    #[inline]
    pub fn field(&self, p: &Point3<f32>) -> f32 {
        self.field_squared(p).sqrt()
    }
}

/// Squared distance to an axis aligned box, zero inside it.
#[inline]
fn box_squared(p: &Point3<f32>, half_extents: &Vector3<f32>) -> f32 {
    dot2(&max_zero(&(p.coords.abs() - half_extents)))
}

/// Squared field of `shape` at a point already in its local frame.
#[inline]
pub fn field_squared(local: &Point3<f32>, shape: &Shape) -> f32 {
    shape.prim.field_squared(local)
}

/// Linear field of `shape` at a point already in its local frame.
#[inline]
pub fn field(local: &Point3<f32>, shape: &Shape) -> f32 {
    shape.prim.field(local)
}

impl Shape {
    /// The field at a world-space point. Local distances are scaled by the frame's smallest
    /// scale so that sphere tracing never steps past the surface because of the frame.
    pub fn distance(&self, world: &Point3<f32>) -> f32 {
        field(&world.invert(&self.frame), self) * self.frame.scale_factor()
    }
}

/// The closest point on a segment to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub distance: f32,
    pub point: Point3<f32>,
}

/// Project `p` onto the segment `a..b`, clamping to the end points. A segment with `a == b` is
/// treated as the single point `a`.
pub fn project_on_segment(p: &Point3<f32>, a: &Point3<f32>, b: &Point3<f32>) -> Projection {
    let n = b - a;
    let n2 = dot2(&n);

    let point = if n2 <= f32::default_epsilon() {
        *a
    } else {
        let t = ((p - a).dot(&n) / n2).clamp(0., 1.);
        a + n * t
    };

    Projection {
        distance: (p - point).norm(),
        point,
    }
}

#[cfg(test)]
use {crate::transform::Frame, approx::assert_relative_eq};

#[test]
fn test_segment_zero_on_axis() {
    for &length in &[0., 0.5, 1., 4.] {
        let seg = Prim::segment(length).unwrap();
        for i in 0..=10 {
            let x = -length / 2. + length * (i as f32) / 10.;
            assert_eq!(seg.field(&Point3::new(x, 0., 0.)), 0.);
        }
    }
}

#[test]
fn test_segment_field() {
    let seg = Prim::segment(1.).unwrap();
    assert_eq!(seg.field(&Point3::new(0., 1., 0.)), 1.0);
    assert_eq!(seg.field_squared(&Point3::new(1.5, 0., 0.)), 1.0);
    assert_eq!(seg.field_squared(&Point3::new(-1.5, 2., 0.)), 5.0);
}

#[test]
fn test_point_segment() {
    let seg = Prim::segment(0.).unwrap();
    assert_eq!(seg.field(&Point3::origin()), 0.);
    assert_eq!(seg.field(&Point3::new(3., 4., 0.)), 5.);
}

#[test]
fn test_rectangle_field() {
    let rect = Prim::rectangle(2., 1.).unwrap();
    assert_eq!(rect.field_squared(&Point3::origin()), 0.);
    assert_eq!(rect.field_squared(&Point3::new(0.9, 0., -0.4)), 0.);
    assert_eq!(rect.field_squared(&Point3::new(2., 0., 0.5)), 1.);
    assert_eq!(rect.field_squared(&Point3::new(0., -3., 0.)), 9.);
}

#[test]
fn test_torus_field() {
    let torus = Prim::torus(2.).unwrap();
    assert_eq!(torus.field(&Point3::new(2., 0., 0.)), 0.);
    assert_eq!(torus.field(&Point3::new(0., 0., -2.)), 0.);
    assert_eq!(torus.field(&Point3::origin()), 2.);
    assert_relative_eq!(torus.field(&Point3::new(2., 1., 0.)), 1.);
    assert_relative_eq!(torus.field(&Point3::new(5., 4., 0.)), 5.);
}

#[test]
fn test_field_free_functions() {
    let shape = Shape::local(Prim::rectangle(2., 1.).unwrap());
    let p = Point3::new(2., 0., 0.5);
    assert_eq!(field_squared(&p, &shape), 1.);
    assert_eq!(field(&p, &shape), 1.);
}

#[test]
fn test_world_distance() {
    let frame = Frame::new()
        .translate(&Point3::new(0., 2., 0.))
        .rotate_euler(0., 0., 90.);
    let shape = Shape::new(Prim::segment(2.).unwrap(), frame);

    // the segment now runs along world Y, from y = 1 to y = 3
    assert_relative_eq!(shape.distance(&Point3::new(0., 2.5, 0.)), 0., epsilon = 1e-6);
    assert_relative_eq!(shape.distance(&Point3::new(1., 2., 0.)), 1., epsilon = 1e-6);
    assert_relative_eq!(shape.distance(&Point3::new(0., 4., 0.)), 1., epsilon = 1e-6);
}

#[test]
fn test_scaled_distance_is_conservative() {
    let frame = Frame::new().scale(&Vector3::new(2., 1., 1.)).unwrap();
    let shape = Shape::new(Prim::segment(1.).unwrap(), frame);

    // the world segment spans x in [-1, 1]
    assert_eq!(shape.distance(&Point3::new(0.8, 0., 0.)), 0.);
    let d = shape.distance(&Point3::new(3., 0., 0.));
    assert!(d <= 2.);
    assert_relative_eq!(d, 1.);
}

#[test]
fn test_project_on_segment() {
    let a = Point3::new(-1., 0., 0.);
    let b = Point3::new(1., 0., 0.);

    let proj = project_on_segment(&Point3::new(0.5, 2., 0.), &a, &b);
    assert_relative_eq!(proj.point, Point3::new(0.5, 0., 0.));
    assert_relative_eq!(proj.distance, 2.);

    let proj = project_on_segment(&Point3::new(4., 4., 0.), &a, &b);
    assert_eq!(proj.point, b);
    assert_relative_eq!(proj.distance, 5.);

    let proj = project_on_segment(&Point3::new(-3., 0., 0.), &a, &b);
    assert_eq!(proj.point, a);
    assert_relative_eq!(proj.distance, 2.);
}

#[test]
fn test_project_on_degenerate_segment() {
    let a = Point3::new(1., 1., 1.);
    let proj = project_on_segment(&Point3::new(1., 1., 3.), &a, &a);
    assert_eq!(proj.point, a);
    assert_eq!(proj.distance, 2.);
    assert!(proj.distance.is_finite());
}
