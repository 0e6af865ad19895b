use std::{error::Error, fmt};

use crate::{params::ParamsErr, participant::ParticipantId};

/// The aggregation module's result type.
pub type Result<T> = std::result::Result<T, AggregateErr>;

/// The reasons a set of updates can't be combined into a new global model.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateErr {
    /// Nothing to combine, the previous global model must not be reused in its place.
    NoUpdates,
    /// Every update reported zero samples, so no weights can be derived.
    ZeroSamples,
    ParameterMismatch {
        participant: ParticipantId,
        source: ParamsErr,
    },
}

impl fmt::Display for AggregateErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoUpdates => f.write_str("no updates to aggregate"),
            Self::ZeroSamples => f.write_str("the updates carry zero samples in total"),
            Self::ParameterMismatch {
                participant,
                source,
            } => write!(f, "update from {participant} is incompatible: {source}"),
        }
    }
}

impl Error for AggregateErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ParameterMismatch { source, .. } => Some(source),
            _ => None,
        }
    }
}
