use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use tokio_util::sync::CancellationToken;

use super::{LocalPlan, Participant, ParticipantErr, ParticipantId, Result, Update};
use crate::{
    data::{DataLoader, Dataset},
    model::Model,
    params::ParameterSet,
};

/// A participant living in the same process as the orchestrator.
///
/// Every call to `train_local` works on a fresh replica of the model prototype, the
/// replica is discarded once its parameters are returned.
pub struct LocalParticipant<M: Model + Clone> {
    id: ParticipantId,
    name: String,
    shard: Arc<Dataset>,
    model: M,
}

impl<M: Model + Clone> LocalParticipant<M> {
    /// Creates a new `LocalParticipant`.
    ///
    /// # Arguments
    /// * `id` - The participant's identity.
    /// * `name` - A name for logs.
    /// * `shard` - The private training data, never exported.
    /// * `model` - A model with the federation's architecture, its parameters are overwritten each round.
    pub fn new(id: ParticipantId, name: impl Into<String>, shard: Dataset, model: M) -> Self {
        Self {
            id,
            name: name.into(),
            shard: Arc::new(shard),
            model,
        }
    }
}

#[async_trait]
impl<M: Model + Clone + 'static> Participant for LocalParticipant<M> {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn train_local(
        &self,
        params: Arc<ParameterSet>,
        plan: LocalPlan,
        cancel: CancellationToken,
    ) -> Result<Update> {
        if self.shard.is_empty() {
            return Err(ParticipantErr::EmptyShard);
        }

        let mut model = self.model.clone();
        model.load_parameters(&params)?;

        let id = self.id;
        let shard = Arc::clone(&self.shard);
        let sample_count = shard.len();
        let start = Instant::now();

        let (model, loss) = tokio::task::spawn_blocking(move || {
            let loss = train_epochs(id, &mut model, &shard, &plan, &cancel)?;
            Ok::<_, ParticipantErr>((model, loss))
        })
        .await
        .map_err(|e| ParticipantErr::Panicked(e.to_string()))??;

        let duration = start.elapsed();
        info!(
            participant = id.0,
            round = plan.round,
            samples = sample_count,
            loss = loss,
            elapsed_ms = duration.as_millis() as u64;
            "local training finished"
        );

        Ok(Update::new(id, model.parameters(), sample_count, duration).with_train_loss(loss))
    }
}

/// Runs `plan.epochs` passes over the shard and returns the mean loss of the last one.
fn train_epochs<M: Model>(
    id: ParticipantId,
    model: &mut M,
    shard: &Dataset,
    plan: &LocalPlan,
    cancel: &CancellationToken,
) -> Result<f32> {
    let mut rng = StdRng::seed_from_u64(plan.shuffle_seed(id));
    let mut optimizer = plan.optimizer.build();
    let mut loader = DataLoader::new(shard, plan.batch_size.get());
    let batches = loader.num_batches();
    let mut last_loss = 0.;

    for epoch in 1..=plan.epochs.get() {
        loader.shuffle(&mut rng);

        let mut total = 0.;
        let mut seen = 0;

        for (batch_idx, batch) in loader.by_ref().enumerate() {
            if cancel.is_cancelled() {
                return Err(ParticipantErr::Cancelled);
            }

            let loss = model.apply_gradient_step(&batch, optimizer.as_mut())?;
            total += loss * batch.len() as f32;
            seen += batch.len();

            if plan.log_interval > 0 && batch_idx % plan.log_interval == 0 {
                debug!(
                    participant = id.0,
                    round = plan.round,
                    epoch = epoch,
                    loss = loss;
                    "train epoch {epoch} [{}/{} ({:.0}%)]",
                    seen,
                    shard.len(),
                    100. * batch_idx as f32 / batches as f32,
                );
            }
        }

        last_loss = total / seen.max(1) as f32;
    }

    Ok(last_loss)
}
