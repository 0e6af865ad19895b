mod msg;
mod virtual_worker;

pub use msg::Msg;
pub use virtual_worker::{RemoteParticipant, VirtualWorker};
