mod error;
mod local;
#[allow(clippy::module_inception)]
mod participant;
mod update;

pub use error::{ParticipantErr, Result};
pub use local::LocalParticipant;
pub use participant::Participant;
pub use update::{LocalPlan, ParticipantId, Update};
