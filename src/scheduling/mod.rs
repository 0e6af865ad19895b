mod registry;
mod round;
mod scheduler;
pub mod selection;

pub use registry::{Availability, Registry};
pub use round::{Round, RoundState};
pub use scheduler::RoundScheduler;
