use std::{error::Error, fmt, io};

use crate::{aggregation::AggregateErr, model::ModelErr};

/// The crate wide result type.
pub type Result<T> = std::result::Result<T, FedErr>;

/// All the errors that can surface from a federation.
///
/// Participant level failures never reach this type, they're downgraded to an exclusion
/// from the round they happened in.
#[derive(Debug)]
pub enum FedErr {
    /// Invalid configuration, caught before any round runs.
    InvalidConfig(String),
    /// Less successful updates than `min_participants` in a round attempt.
    QuorumNotMet {
        round: usize,
        got: usize,
        needed: usize,
    },
    /// The aggregator refused the collected updates.
    Aggregation { round: usize, source: AggregateErr },
    /// Every attempt of a round failed, this halts the federation.
    RetriesExhausted {
        round: usize,
        attempts: usize,
        last: Box<FedErr>,
    },
    /// The aggregated model could not be evaluated.
    Evaluation(ModelErr),
    Io(io::Error),
    Json(serde_json::Error),
}

impl FedErr {
    /// Whether the error only fails the current round attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QuorumNotMet { .. } | Self::Aggregation { .. } | Self::Evaluation(_)
        )
    }
}

impl fmt::Display for FedErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::QuorumNotMet { round, got, needed } => write!(
                f,
                "round {round}: quorum not met, got {got} update(s) but {needed} are required"
            ),
            Self::Aggregation { round, source } => {
                write!(f, "round {round}: aggregation failed: {source}")
            }
            Self::RetriesExhausted {
                round,
                attempts,
                last,
            } => write!(
                f,
                "round {round} failed after {attempts} attempt(s), last error: {last}"
            ),
            Self::Evaluation(e) => write!(f, "evaluation failed: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for FedErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Aggregation { source, .. } => Some(source),
            Self::RetriesExhausted { last, .. } => Some(last.as_ref()),
            Self::Evaluation(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FedErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for FedErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
