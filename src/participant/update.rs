use std::{
    fmt::{self, Display},
    num::NonZeroUsize,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{optimization::OptimizerConfig, params::ParameterSet};

/// Stable identity of a participant within a federation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ParticipantId(pub usize);

impl Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a participant is asked to do in a round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalPlan {
    pub round: usize,
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    pub optimizer: OptimizerConfig,
    pub seed: u64,
    /// Log the training loss every `log_interval` batches, zero disables it.
    pub log_interval: usize,
}

impl LocalPlan {
    /// Derives the shuffling seed of one participant for this round.
    pub fn shuffle_seed(&self, participant: ParticipantId) -> u64 {
        self.seed ^ ((participant.0 as u64) << 32) ^ self.round as u64
    }
}

/// The result of a participant's local training, consumed exactly once by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    participant: ParticipantId,
    params: ParameterSet,
    sample_count: usize,
    duration: Duration,
    train_loss: Option<f32>,
}

impl Update {
    /// Creates a new `Update`.
    ///
    /// # Arguments
    /// * `participant` - The participant that produced it.
    /// * `params` - The full parameter set after local training.
    /// * `sample_count` - The amount of samples in the participant's shard, its weight when averaging.
    /// * `duration` - Wall clock time spent training.
    pub fn new(
        participant: ParticipantId,
        params: ParameterSet,
        sample_count: usize,
        duration: Duration,
    ) -> Self {
        Self {
            participant,
            params,
            sample_count,
            duration,
            train_loss: None,
        }
    }

    /// Attaches the mean training loss of the last local epoch.
    pub fn with_train_loss(mut self, loss: f32) -> Self {
        self.train_loss = Some(loss);
        self
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn train_loss(&self) -> Option<f32> {
        self.train_loss
    }
}
