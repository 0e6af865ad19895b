use serde::{Deserialize, Serialize};

use crate::{
    params::ParameterSet,
    participant::{LocalPlan, ParticipantErr, Update},
};

/// The messages exchanged between the orchestrator side and a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Msg {
    Train {
        params: ParameterSet,
        plan: LocalPlan,
    },
    Update(Update),
    Err(ParticipantErr),
    Disconnect,
}

impl Msg {
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Train { .. } => "train",
            Msg::Update(_) => "update",
            Msg::Err(_) => "err",
            Msg::Disconnect => "disconnect",
        }
    }

    /// Serializes the message into its wire form.
    pub fn encode(&self) -> Result<String, ParticipantErr> {
        serde_json::to_string(self).map_err(|e| ParticipantErr::Transport(e.to_string()))
    }

    /// Parses a message from its wire form.
    pub fn decode(payload: &str) -> Result<Self, ParticipantErr> {
        serde_json::from_str(payload).map_err(|e| ParticipantErr::Transport(e.to_string()))
    }
}
