use std::{collections::BTreeMap, fmt, str::FromStr};

use nalgebra::{Matrix4, Vector3};

use crate::{
    error::{Error, Result},
    shape::{Prim, Shape},
    transform::Frame,
};

/// The shape selector understood by the shading stage. The discriminants are the values
/// published as `_LightMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LightMode {
    /// Declared by the shading stage, but without any geometry.
    Cross = 0,
    Torus = 1,
    Quad = 2,
    Line = 3,
}

impl FromStr for LightMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cross" => Ok(LightMode::Cross),
            "torus" => Ok(LightMode::Torus),
            "quad" | "rectangle" => Ok(LightMode::Quad),
            "line" | "segment" => Ok(LightMode::Line),
            other => Err(format!("unknown light mode `{}`", other)),
        }
    }
}

/// A one-way destination for named shader parameters.
pub trait UniformSink {
    fn set_vector(&mut self, name: &str, value: &Vector3<f32>);
    fn set_float(&mut self, name: &str, value: f32);
    fn set_matrix(&mut self, name: &str, value: &Matrix4<f32>);
    fn set_int(&mut self, name: &str, value: i32);
}

/// The parameters of an area light, as configured by its host.
#[derive(Debug, Clone, PartialEq)]
pub struct LightParams {
    pub mode: LightMode,
    pub length: f32,
    pub width: f32,
    pub range: f32,
    pub luminance: f32,
    pub affect_diffuse: bool,
    pub affect_specular: bool,
    pub frame: Frame,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            mode: LightMode::Line,
            length: 1.,
            width: 0.,
            range: 2.,
            luminance: 200.,
            affect_diffuse: false,
            affect_specular: false,
            frame: Frame::new(),
        }
    }
}

impl LightParams {
    /// The shape whose distance field this light's mode describes.
    pub fn shape(&self) -> Result<Shape> {
        let prim = match self.mode {
            LightMode::Line => Prim::segment(self.length)?,
            LightMode::Quad => Prim::rectangle(self.length, self.width)?,
            LightMode::Torus => Prim::torus(self.range)?,
            LightMode::Cross => return Err(Error::UnsupportedShapeKind(self.mode)),
        };
        Ok(Shape::new(prim, self.frame.clone()))
    }

    /// Push every shader parameter for this light into `sink`. Extents are published in world
    /// units: range and length follow the frame's X scale, width its Y scale.
    pub fn publish<S: UniformSink + ?Sized>(&self, sink: &mut S) {
        let frame = &self.frame;
        let scale = frame.scale_vector();

        sink.set_vector("_LightPosition", &frame.position().coords);
        sink.set_vector("_LightRight", &frame.right());
        sink.set_vector("_LightUp", &frame.up());
        sink.set_vector("_LightForward", &frame.forward());
        sink.set_float("_Luminance", self.luminance);
        sink.set_float("_Range", self.range * scale.x);
        sink.set_float("_Length", self.length * scale.x);
        sink.set_float("_Width", self.width * scale.y);
        sink.set_matrix("_LightModelMatrix", frame.world_to_local());
        sink.set_int("_LightMode", self.mode as i32);
        sink.set_int("_AffectDiffuse", self.affect_diffuse as i32);
        sink.set_int("_AffectSpecular", self.affect_specular as i32);
    }
}

/// A published shader parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Uniform {
    Vector(Vector3<f32>),
    Float(f32),
    Matrix(Matrix4<f32>),
    Int(i32),
}

impl fmt::Display for Uniform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uniform::Vector(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Uniform::Float(x) => write!(f, "{}", x),
            Uniform::Matrix(m) => {
                let rows: Vec<String> = m
                    .row_iter()
                    .map(|row| {
                        let cols: Vec<String> = row.iter().map(|c| c.to_string()).collect();
                        format!("[{}]", cols.join(", "))
                    })
                    .collect();
                write!(f, "[{}]", rows.join(", "))
            }
            Uniform::Int(i) => write!(f, "{}", i),
        }
    }
}

/// A sink that records the latest value of every parameter, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformMap {
    values: BTreeMap<String, Uniform>,
}

impl UniformMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Uniform> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Uniform)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl UniformSink for UniformMap {
    fn set_vector(&mut self, name: &str, value: &Vector3<f32>) {
        self.values.insert(name.to_string(), Uniform::Vector(*value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.values.insert(name.to_string(), Uniform::Float(value));
    }

    fn set_matrix(&mut self, name: &str, value: &Matrix4<f32>) {
        self.values.insert(name.to_string(), Uniform::Matrix(*value));
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.values.insert(name.to_string(), Uniform::Int(value));
    }
}

#[cfg(test)]
use {approx::assert_relative_eq, nalgebra::Point3};

#[test]
fn test_mode_from_str() {
    assert_eq!("line".parse(), Ok(LightMode::Line));
    assert_eq!("Quad".parse(), Ok(LightMode::Quad));
    assert_eq!("segment".parse(), Ok(LightMode::Line));
    assert_eq!("torus".parse(), Ok(LightMode::Torus));
    assert!("sphere".parse::<LightMode>().is_err());
}

#[test]
fn test_shape_for_mode() {
    let mut params = LightParams {
        length: 2.,
        width: 1.,
        range: 3.,
        ..LightParams::default()
    };
    assert_eq!(params.shape().unwrap().prim, Prim::Segment { length: 2. });

    params.mode = LightMode::Quad;
    assert_eq!(
        params.shape().unwrap().prim,
        Prim::Rectangle {
            length: 2.,
            width: 1.
        }
    );

    params.mode = LightMode::Torus;
    assert_eq!(params.shape().unwrap().prim, Prim::Torus { range: 3. });

    params.mode = LightMode::Cross;
    assert_eq!(
        params.shape(),
        Err(Error::UnsupportedShapeKind(LightMode::Cross))
    );

    params.mode = LightMode::Line;
    params.length = -1.;
    assert!(matches!(params.shape(), Err(Error::InvalidShape { .. })));
}

#[test]
fn test_publish() {
    let frame = Frame::new()
        .translate(&Point3::new(1., 2., 3.))
        .scale(&Vector3::new(2., 3., 1.))
        .unwrap();
    let params = LightParams {
        mode: LightMode::Quad,
        length: 1.5,
        width: 0.5,
        range: 4.,
        luminance: 100.,
        affect_diffuse: true,
        affect_specular: false,
        frame,
    };

    let mut map = UniformMap::new();
    params.publish(&mut map);

    assert_eq!(map.len(), 12);
    assert_eq!(
        map.get("_LightPosition"),
        Some(&Uniform::Vector(Vector3::new(1., 2., 3.)))
    );
    assert_eq!(
        map.get("_LightRight"),
        Some(&Uniform::Vector(Vector3::new(1., 0., 0.)))
    );
    assert_eq!(map.get("_Luminance"), Some(&Uniform::Float(100.)));
    assert_eq!(map.get("_Range"), Some(&Uniform::Float(8.)));
    assert_eq!(map.get("_Length"), Some(&Uniform::Float(3.)));
    assert_eq!(map.get("_Width"), Some(&Uniform::Float(1.5)));
    assert_eq!(map.get("_LightMode"), Some(&Uniform::Int(2)));
    assert_eq!(map.get("_AffectDiffuse"), Some(&Uniform::Int(1)));
    assert_eq!(map.get("_AffectSpecular"), Some(&Uniform::Int(0)));

    match map.get("_LightModelMatrix") {
        Some(Uniform::Matrix(m)) => {
            let local = m.transform_point(&Point3::new(3., 5., 4.));
            assert_relative_eq!(local, Point3::new(1., 1., 1.), epsilon = 1e-6);
        }
        other => panic!("unexpected model matrix {:?}", other),
    }
}

#[test]
fn test_uniform_display() {
    assert_eq!(Uniform::Int(3).to_string(), "3");
    assert_eq!(Uniform::Float(0.5).to_string(), "0.5");
    assert_eq!(
        Uniform::Vector(Vector3::new(1., -2., 0.)).to_string(),
        "(1, -2, 0)"
    );
}
