use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::{initialization::InitErr, optimization::SizeMismatchErr, params::ParamsErr};

/// The result type used by the numeric collaborator.
pub type Result<T> = std::result::Result<T, ModelErr>;

/// The model module's error type.
#[derive(Debug)]
pub enum ModelErr {
    Params(ParamsErr),
    Optimizer(SizeMismatchErr),
    Init(InitErr),
    InvalidArchitecture(String),
    InputMismatch { got: usize, expected: usize },
    LabelOutOfRange { label: usize, classes: usize },
}

impl Display for ModelErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelErr::Params(e) => write!(f, "{e}"),
            ModelErr::Optimizer(e) => write!(f, "{e}"),
            ModelErr::Init(e) => write!(f, "{e}"),
            ModelErr::InvalidArchitecture(msg) => write!(f, "invalid architecture: {msg}"),
            ModelErr::InputMismatch { got, expected } => {
                write!(f, "input has {got} features, the model expects {expected}")
            }
            ModelErr::LabelOutOfRange { label, classes } => {
                write!(f, "label {label} is out of range for {classes} classes")
            }
        }
    }
}

impl Error for ModelErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelErr::Params(e) => Some(e),
            ModelErr::Optimizer(e) => Some(e),
            ModelErr::Init(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParamsErr> for ModelErr {
    fn from(value: ParamsErr) -> Self {
        Self::Params(value)
    }
}

impl From<SizeMismatchErr> for ModelErr {
    fn from(value: SizeMismatchErr) -> Self {
        Self::Optimizer(value)
    }
}

impl From<InitErr> for ModelErr {
    fn from(value: InitErr) -> Self {
        Self::Init(value)
    }
}
