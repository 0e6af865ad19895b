use std::{
    error::Error,
    fmt::{self, Display},
};

/// Returned by an `Optimizer` whenever the gradient and the parameters it should update
/// have different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatchErr {
    pub grad: usize,
    pub params: usize,
}

impl Display for SizeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "optimizer error: gradient of length {} for {} parameters",
            self.grad, self.params
        )
    }
}

impl Error for SizeMismatchErr {}
