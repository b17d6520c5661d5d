//! Distance fields for analytic light shapes, and the recovery of the nearest surface point and
//! its outward normal from field samples alone.

pub mod batch;
pub mod error;
pub mod field;
pub mod gradient;
pub mod march;
pub mod math;
pub mod shape;
pub mod solve;
pub mod transform;
pub mod uniforms;

pub use error::{Error, Result};
pub use shape::{Prim, Shape};
pub use solve::{solve, SolveConfig, SurfaceSample};
pub use transform::Frame;
