use serde::Serialize;

use super::Result;
use crate::{
    params::ParameterSet,
    participant::{ParticipantId, Update},
};

/// A recoverable anomaly found while aggregating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationWarning {
    /// The participant sent more than one update, only the last one to arrive was used.
    DuplicateUpdate { participant: ParticipantId },
}

/// The outcome of combining a round's updates.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub params: ParameterSet,
    /// The participants whose update was used, in ascending order.
    pub contributors: Vec<ParticipantId>,
    pub warnings: Vec<AggregationWarning>,
    pub total_samples: usize,
}

/// Combines the updates of a round into a new global parameter set.
pub trait Aggregator: Send + Sync {
    /// Combines `updates`, given in arrival order, into a new parameter set.
    ///
    /// # Arguments
    /// * `updates` - The round's updates, consumed by the call.
    ///
    /// # Returns
    /// The combined parameters or an error if they can't be combined.
    fn combine(&self, updates: Vec<Update>) -> Result<Aggregate>;
}
