use std::sync::Arc;

use log::info;

use crate::{
    aggregation::Aggregator,
    config::FederationConfig,
    error::Result,
    evaluation::Evaluate,
    params::ParameterSet,
    participant::{Participant, ParticipantId},
    report::{ReportSink, Reporter},
    scheduling::{Registry, Round, RoundScheduler},
};

/// The canonical parameters of a federation and the round that produced them, round 0
/// being the initial model.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalModel {
    pub params: Arc<ParameterSet>,
    pub round: usize,
}

/// What `Orchestrator::run` hands back.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub global: GlobalModel,
    pub history: Vec<Round>,
}

/// Owns the participants, the global model and the round counter of a federation.
///
/// Rounds run strictly one after the other: the global model is only replaced once a round
/// is done, before the next one broadcasts it.
pub struct Orchestrator {
    registry: Registry,
    scheduler: RoundScheduler,
    evaluator: Box<dyn Evaluate>,
    reporter: Reporter,
    global: GlobalModel,
    history: Vec<Round>,
}

impl Orchestrator {
    /// Creates a new `Orchestrator`.
    ///
    /// # Arguments
    /// * `config` - The federation options, validated here.
    /// * `participants` - Every member of the federation, with unique ids.
    /// * `initial` - The parameters of the initial global model.
    /// * `aggregator` - Combines the updates of every round.
    /// * `evaluator` - Scores every new global model.
    ///
    /// # Returns
    /// The orchestrator or `FedErr::InvalidConfig`.
    pub fn new(
        config: FederationConfig,
        participants: Vec<Arc<dyn Participant>>,
        initial: ParameterSet,
        aggregator: Box<dyn Aggregator>,
        evaluator: Box<dyn Evaluate>,
    ) -> Result<Self> {
        config.validate()?;

        let mut registry = Registry::new(config.max_consecutive_failures);
        for participant in participants {
            registry.register(participant)?;
        }

        Ok(Self {
            registry,
            scheduler: RoundScheduler::new(config, aggregator),
            evaluator,
            reporter: Reporter::new(),
            global: GlobalModel {
                params: Arc::new(initial),
                round: 0,
            },
            history: Vec::new(),
        })
    }

    /// Adds a destination for the per-attempt round reports.
    pub fn add_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.reporter.add_sink(sink);
    }

    /// Runs `num_rounds` rounds one after the other.
    ///
    /// # Returns
    /// The final global model and the full round history, or the first fatal error. A
    /// round that exhausts its retries leaves the global model as it was before it.
    pub async fn run(&mut self, num_rounds: usize) -> Result<Outcome> {
        info!(
            rounds = num_rounds,
            participants = self.registry.len(),
            params = self.global.params.num_params();
            "starting federation"
        );

        for _ in 0..num_rounds {
            let index = self.global.round + 1;
            let round = self
                .scheduler
                .run_round(
                    index,
                    &self.global.params,
                    &mut self.registry,
                    self.evaluator.as_mut(),
                    &mut self.reporter,
                )
                .await?;

            if let Some(params) = round.params() {
                self.global = GlobalModel {
                    params: Arc::clone(params),
                    round: index,
                };
            }

            self.history.push(round);
        }

        Ok(Outcome {
            global: self.global.clone(),
            history: self.history.clone(),
        })
    }

    /// Makes an unreachable participant selectable again.
    ///
    /// # Returns
    /// false if no participant has that id.
    pub fn reinstate(&mut self, id: ParticipantId) -> bool {
        self.registry.reinstate(id)
    }

    pub fn global(&self) -> &GlobalModel {
        &self.global
    }

    /// The completed rounds, oldest first.
    pub fn history(&self) -> &[Round] {
        &self.history
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &FederationConfig {
        self.scheduler.config()
    }
}
