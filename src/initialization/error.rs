use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::{uniform::Error as UniformError, NormalError};

/// The specific result type for parameter initialization.
pub type Result<T> = std::result::Result<T, InitErr>;

/// Error returned when a random parameter generator can't be built from the given
/// distribution values.
#[derive(Debug)]
pub struct InitErr(String);

impl From<NormalError> for InitErr {
    fn from(value: NormalError) -> Self {
        Self(value.to_string())
    }
}

impl From<UniformError> for InitErr {
    fn from(value: UniformError) -> Self {
        Self(value.to_string())
    }
}

impl Display for InitErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid initialization: {}", self.0)
    }
}

impl Error for InitErr {}
