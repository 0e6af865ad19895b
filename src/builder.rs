use std::sync::Arc;

use log::{info, warn};
use tokio::task::JoinHandle;

use crate::{
    aggregation::FedAvg,
    config::FederationConfig,
    data::Dataset,
    error::{FedErr, Result},
    evaluation::Evaluator,
    model::Model,
    orchestrator::Orchestrator,
    participant::{LocalParticipant, Participant, ParticipantId},
    report::ReportSink,
    transport::{RemoteParticipant, VirtualWorker},
};

/// How the orchestrator reaches the participants' data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Direct in-process calls.
    #[default]
    Local,
    /// Serialized messages to a worker task per participant.
    Virtual,
}

/// Rejects datasets the model can't be trained or evaluated on.
fn check_fits<M: Model>(model: &M, dataset: &Dataset, which: &str) -> Result<()> {
    if dataset.num_features() != model.num_inputs() {
        return Err(FedErr::InvalidConfig(format!(
            "the {which} set has {} features but the model takes {}",
            dataset.num_features(),
            model.num_inputs()
        )));
    }

    if dataset.num_classes() > model.num_classes() {
        return Err(FedErr::InvalidConfig(format!(
            "the {which} set has {} classes but the model scores {}",
            dataset.num_classes(),
            model.num_classes()
        )));
    }

    Ok(())
}

/// A ready to run federation.
pub struct Federation {
    pub orchestrator: Orchestrator,
    workers: Vec<(RemoteParticipant, JoinHandle<()>)>,
}

impl Federation {
    /// Stops the virtual workers, if any, and waits for them to finish.
    pub async fn shutdown(self) {
        let Self {
            orchestrator,
            workers,
        } = self;
        drop(orchestrator);

        for (remote, handle) in workers {
            if let Err(e) = remote.disconnect().await {
                warn!(participant = remote.id().0; "failed to disconnect: {e}");
            }

            if let Err(e) = handle.await {
                warn!(participant = remote.id().0; "worker task failed: {e}");
            }
        }
    }
}

/// Sets up a federation: splits the training set into private shards, one per named
/// participant, and wires the participants, the initial model and the evaluator into an
/// `Orchestrator`.
pub struct FederationBuilder<M: Model + Clone + 'static> {
    config: FederationConfig,
    model: M,
    names: Vec<String>,
    transport: Transport,
    sinks: Vec<Box<dyn ReportSink>>,
}

impl<M: Model + Clone + 'static> FederationBuilder<M> {
    /// Creates a new `FederationBuilder`.
    ///
    /// # Arguments
    /// * `config` - The federation options.
    /// * `model` - The initial global model, its architecture is shared by every replica.
    pub fn new(config: FederationConfig, model: M) -> Self {
        Self {
            config,
            model,
            names: Vec::new(),
            transport: Transport::default(),
            sinks: Vec::new(),
        }
    }

    /// Adds a participant, ids are assigned in insertion order starting at zero.
    pub fn participant(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn participants<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Builds the federation.
    ///
    /// # Arguments
    /// * `train_set` - The data to partition, each shard is only handed to its participant.
    /// * `test_set` - The held out data global models are evaluated on.
    ///
    /// # Returns
    /// The federation or `FedErr::InvalidConfig`.
    ///
    /// # Panics
    /// With `Transport::Virtual`, if called outside of a tokio runtime.
    pub fn build(self, train_set: &Dataset, test_set: Dataset) -> Result<Federation> {
        let Self {
            config,
            model,
            names,
            transport,
            sinks,
        } = self;
        config.validate()?;

        check_fits(&model, train_set, "training")?;
        check_fits(&model, &test_set, "test")?;

        let shards = config.partition.split(train_set, names.len(), config.seed)?;

        let mut participants: Vec<Arc<dyn Participant>> = Vec::with_capacity(names.len());
        let mut workers = Vec::new();

        for (i, (name, shard)) in names.into_iter().zip(shards).enumerate() {
            info!(participant = i, samples = shard.len(); "assigned shard to {name}");
            let local = LocalParticipant::new(ParticipantId(i), name, shard, model.clone());

            match transport {
                Transport::Local => participants.push(Arc::new(local)),
                Transport::Virtual => {
                    let (remote, handle) = VirtualWorker::spawn(Arc::new(local));
                    participants.push(Arc::new(remote.clone()));
                    workers.push((remote, handle));
                }
            }
        }

        let initial = model.parameters();
        let evaluator = Evaluator::new(model, Arc::new(test_set), config.test_batch_size);

        let mut orchestrator = Orchestrator::new(
            config,
            participants,
            initial,
            Box::new(FedAvg::new()),
            Box::new(evaluator),
        )?;

        for sink in sinks {
            orchestrator.add_sink(sink);
        }

        Ok(Federation {
            orchestrator,
            workers,
        })
    }
}
