mod error;
mod set;
mod tensor;

pub use error::{ParamsErr, Result};
pub use set::ParameterSet;
pub use tensor::Tensor;
