use thiserror::Error;

use crate::uniforms::LightMode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A shape dimension was negative, NaN or infinite.
    #[error("invalid shape parameter `{param}`: {value}")]
    InvalidShape { param: &'static str, value: f32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A query input contained NaN or an infinity.
    #[error("non-finite input: {0}")]
    NonFinite(&'static str),

    /// The approach direction had no length to normalize.
    #[error("approach direction is degenerate")]
    DegenerateDirection,

    /// The finite-difference gradient was too small to normalize.
    #[error("degenerate gradient at ({x}, {y}, {z})")]
    DegenerateGradient { x: f32, y: f32, z: f32 },

    #[error("light mode {0:?} has no distance field")]
    UnsupportedShapeKind(LightMode),
}
