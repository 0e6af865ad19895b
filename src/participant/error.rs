use std::{
    error::Error,
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};

use crate::{model::ModelErr, params::ParamsErr};

/// The participant module's result type.
pub type Result<T> = std::result::Result<T, ParticipantErr>;

/// Failures of a single participant during a round.
///
/// None of them is fatal to the federation: the participant is left out of the round it
/// failed in. The type is serializable so it can travel back through a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ParticipantErr {
    EmptyShard,
    ParameterMismatch(ParamsErr),
    TrainingTimeout { elapsed_ms: u64 },
    Cancelled,
    Model(String),
    Transport(String),
    Panicked(String),
}

impl ParticipantErr {
    /// A short stable name for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ParticipantErr::EmptyShard => "empty_shard",
            ParticipantErr::ParameterMismatch(_) => "parameter_mismatch",
            ParticipantErr::TrainingTimeout { .. } => "training_timeout",
            ParticipantErr::Cancelled => "cancelled",
            ParticipantErr::Model(_) => "model",
            ParticipantErr::Transport(_) => "transport",
            ParticipantErr::Panicked(_) => "panicked",
        }
    }
}

impl Display for ParticipantErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantErr::EmptyShard => f.write_str("the participant's shard is empty"),
            ParticipantErr::ParameterMismatch(e) => write!(f, "parameter mismatch: {e}"),
            ParticipantErr::TrainingTimeout { elapsed_ms } => {
                write!(f, "training timed out after {elapsed_ms}ms")
            }
            ParticipantErr::Cancelled => f.write_str("training was cancelled"),
            ParticipantErr::Model(msg) => write!(f, "model error: {msg}"),
            ParticipantErr::Transport(msg) => write!(f, "transport error: {msg}"),
            ParticipantErr::Panicked(msg) => write!(f, "training task panicked: {msg}"),
        }
    }
}

impl Error for ParticipantErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParticipantErr::ParameterMismatch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelErr> for ParticipantErr {
    fn from(value: ModelErr) -> Self {
        match value {
            ModelErr::Params(e) => Self::ParameterMismatch(e),
            other => Self::Model(other.to_string()),
        }
    }
}

impl From<ParamsErr> for ParticipantErr {
    fn from(value: ParamsErr) -> Self {
        Self::ParameterMismatch(value)
    }
}
