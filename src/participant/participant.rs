use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{LocalPlan, ParticipantId, Result, Update};
use crate::params::ParameterSet;

/// A member of the federation holding a private shard of the training data.
///
/// Implementations decide how the request reaches the data: an in-process call, a
/// serialized message to a worker task or a real network round-trip. The orchestration
/// core only sees this trait.
#[async_trait]
pub trait Participant: Send + Sync {
    /// The participant's stable identity.
    fn id(&self) -> ParticipantId;

    /// A human readable name for logs.
    fn name(&self) -> &str;

    /// Trains a local replica of the model starting from `params`.
    ///
    /// # Arguments
    /// * `params` - The global parameters broadcast for this round.
    /// * `plan` - Epochs, batch size and optimizer to use.
    /// * `cancel` - Cancelled when the round's deadline elapses.
    ///
    /// # Returns
    /// The `Update` with the resulting parameters, or a `ParticipantErr`.
    async fn train_local(
        &self,
        params: Arc<ParameterSet>,
        plan: LocalPlan,
        cancel: CancellationToken,
    ) -> Result<Update>;
}
