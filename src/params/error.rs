use std::{
    error::Error,
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};

/// The specific result type for parameter set validation.
pub type Result<T> = std::result::Result<T, ParamsErr>;

/// Error returned whenever two parameter sets (or a tensor and its buffer) can't be matched
/// one against the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamsErr {
    MissingKey {
        key: String,
    },
    UnexpectedKey {
        key: String,
    },
    ShapeMismatch {
        key: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    InvalidShape {
        shape: Vec<usize>,
        len: usize,
    },
}

impl Display for ParamsErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsErr::MissingKey { key } => write!(f, "parameter `{key}` is missing"),
            ParamsErr::UnexpectedKey { key } => write!(f, "unexpected parameter `{key}`"),
            ParamsErr::ShapeMismatch { key, got, expected } => write!(
                f,
                "parameter `{key}` has shape {got:?}, expected {expected:?}"
            ),
            ParamsErr::InvalidShape { shape, len } => write!(
                f,
                "shape {shape:?} doesn't describe a buffer of {len} values"
            ),
        }
    }
}

impl Error for ParamsErr {}
