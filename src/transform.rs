use nalgebra::{Matrix4, Point3, Unit, UnitQuaternion, Vector3};

use crate::{
    error::{Error, Result},
    math::{self, Finite},
};

/// The local frame of a light shape: a position, a rotation and a per-axis scale, applied as
/// scale, then rotation, then translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    position: Point3<f32>,
    rotation: UnitQuaternion<f32>,
    scale: Vector3<f32>,

    matrix: Matrix4<f32>,
    inverse: Matrix4<f32>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// The identity frame, centered at the world origin.
    pub fn new() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1., 1., 1.),
            matrix: Matrix4::identity(),
            inverse: Matrix4::identity(),
        }
    }

    /// Move the frame's origin to `position`.
    pub fn translate(mut self, position: &Point3<f32>) -> Self {
        self.position = *position;
        self.rebuild();
        self
    }

    /// Compose an axis-angle rotation after the current rotation.
    pub fn rotate(mut self, axisangle: &Vector3<f32>) -> Self {
        self.rotation = UnitQuaternion::new(*axisangle) * self.rotation;
        self.rebuild();
        self
    }

    /// Replace the rotation with Euler angles in degrees, applied around z, then x, then y.
    pub fn rotate_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        let rx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), math::deg_to_rad(x));
        let ry = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), math::deg_to_rad(y));
        let rz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), math::deg_to_rad(z));
        self.rotation = ry * rx * rz;
        self.rebuild();
        self
    }

    /// Set a per-axis scale. Every component must be finite and non-zero so that the frame stays
    /// invertible.
    pub fn scale(mut self, scale: &Vector3<f32>) -> Result<Self> {
        scale.ensure_finite("scale")?;
        if let Some(&value) = scale.iter().find(|c| **c == 0.) {
            return Err(Error::InvalidShape {
                param: "scale",
                value,
            });
        }
        self.scale = *scale;
        self.rebuild();
        Ok(self)
    }

    /// Append a uniform scaling to this frame.
    pub fn uniform_scale(self, amount: f32) -> Result<Self> {
        self.scale(&Vector3::new(amount, amount, amount))
    }

    fn rebuild(&mut self) {
        let t = Matrix4::new_translation(&self.position.coords);
        let r = self.rotation.to_homogeneous();
        let s = Matrix4::new_nonuniform_scaling(&self.scale);
        self.matrix = t * r * s;

        let inv_s = Matrix4::new_nonuniform_scaling(&self.scale.map(|c| 1. / c));
        let inv_r = self.rotation.inverse().to_homogeneous();
        let inv_t = Matrix4::new_translation(&-self.position.coords);
        self.inverse = inv_s * inv_r * inv_t;
    }

    pub fn position(&self) -> &Point3<f32> {
        &self.position
    }

    pub fn scale_vector(&self) -> &Vector3<f32> {
        &self.scale
    }

    /// The smallest absolute scale component, the least the frame stretches a local distance.
    /// Local field values are multiplied by this to get a world distance that never overshoots.
    pub fn scale_factor(&self) -> f32 {
        self.scale.iter().fold(f32::INFINITY, |acc, c| acc.min(c.abs()))
    }

    pub fn right(&self) -> Unit<Vector3<f32>> {
        self.rotation * Vector3::x_axis()
    }

    pub fn up(&self) -> Unit<Vector3<f32>> {
        self.rotation * Vector3::y_axis()
    }

    pub fn forward(&self) -> Unit<Vector3<f32>> {
        self.rotation * Vector3::z_axis()
    }

    pub fn local_to_world(&self) -> &Matrix4<f32> {
        &self.matrix
    }

    pub fn world_to_local(&self) -> &Matrix4<f32> {
        &self.inverse
    }
}

pub trait ApplyTransform {
    /// Map from the frame's local space into world space.
    fn apply(&self, frame: &Frame) -> Self;

    /// Map from world space into the frame's local space.
    fn invert(&self, frame: &Frame) -> Self;
}

impl ApplyTransform for Point3<f32> {
    #[inline]
    fn apply(&self, frame: &Frame) -> Self {
        frame.matrix.transform_point(self)
    }

    #[inline]
    fn invert(&self, frame: &Frame) -> Self {
        frame.inverse.transform_point(self)
    }
}

impl ApplyTransform for Vector3<f32> {
    #[inline]
    fn apply(&self, frame: &Frame) -> Self {
        frame.matrix.transform_vector(self)
    }

    #[inline]
    fn invert(&self, frame: &Frame) -> Self {
        frame.inverse.transform_vector(self)
    }
}

#[cfg(test)]
use approx::assert_relative_eq;

#[test]
fn test_translate() {
    let t = Frame::new().translate(&Point3::new(1., 0., 0.));
    let p = Point3::new(1., 0., 0.);
    assert_eq!(p.invert(&t), Point3::origin());
    assert_eq!(p, p.apply(&t).invert(&t));
}

#[test]
fn test_scaling() {
    let t = Frame::new().uniform_scale(10.0).unwrap();
    let p = Point3::new(1., 0., 0.);
    assert_eq!(p.apply(&t), Point3::new(10., 0., 0.));
    assert_eq!(p, p.apply(&t).invert(&t));
    assert_eq!(t.scale_factor(), 10.0);
}

#[test]
fn test_nonuniform_scaling() {
    let t = Frame::new().scale(&Vector3::new(2., 0.5, -4.)).unwrap();
    assert_eq!(t.scale_factor(), 0.5);
    let p = Point3::new(1., 1., 1.);
    assert_relative_eq!(p, p.apply(&t).invert(&t), epsilon = 1e-6);

    assert_eq!(
        Frame::new().scale(&Vector3::new(1., 0., 1.)),
        Err(Error::InvalidShape {
            param: "scale",
            value: 0.
        })
    );
}

#[test]
fn test_rotation() {
    let t = Frame::new().rotate(&Vector3::new(std::f32::consts::PI, 0., 0.));
    let p = Point3::new(0., 1., 0.);
    assert_relative_eq!(p.apply(&t), Point3::new(0., -1., 0.), epsilon = 1e-6);
    assert_relative_eq!(p, p.apply(&t).invert(&t), epsilon = 1e-6);
}

#[test]
fn test_composition() {
    let t = Frame::new()
        .uniform_scale(10.0)
        .unwrap()
        .translate(&Point3::new(1., 0., 0.));
    let p = Point3::new(1., 0., 1.);
    assert_eq!(p.apply(&t), Point3::new(11., 0., 10.));
    assert_eq!(p, p.apply(&t).invert(&t));
}

#[test]
fn test_basis() {
    let t = Frame::new().rotate_euler(0., 90., 0.);
    assert_relative_eq!(
        t.right().into_inner(),
        Vector3::new(0., 0., -1.),
        epsilon = 1e-6
    );
    assert_relative_eq!(t.up().into_inner(), Vector3::new(0., 1., 0.), epsilon = 1e-6);
    assert_relative_eq!(
        t.forward().into_inner(),
        Vector3::new(1., 0., 0.),
        epsilon = 1e-6
    );
}

#[test]
fn test_world_to_local_is_inverse() {
    let t = Frame::new()
        .translate(&Point3::new(1., 2., 3.))
        .rotate_euler(30., 45., 60.)
        .scale(&Vector3::new(1., 2., 3.))
        .unwrap();
    assert_relative_eq!(
        t.local_to_world() * t.world_to_local(),
        nalgebra::Matrix4::identity(),
        epsilon = 1e-5
    );
}
