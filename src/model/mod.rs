mod error;
pub mod loss;
#[allow(clippy::module_inception)]
mod model;
mod sequential;

pub use error::{ModelErr, Result};
pub use model::Model;
pub use sequential::Sequential;
