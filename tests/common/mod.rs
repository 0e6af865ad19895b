#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use fedavg_orchestration::{
    model::ModelErr, participant, Evaluate, FedAvg, FederationConfig, LocalPlan, Metrics,
    Orchestrator, ParameterSet, Participant, ParticipantErr, ParticipantId, ReportSink,
    RoundReport, Tensor, Update,
};
use tokio_util::sync::CancellationToken;

/// What a scripted participant does when asked to train.
#[derive(Debug, Clone)]
pub enum Step {
    Respond { value: f32, samples: usize },
    Fail(ParticipantErr),
    /// Never answers, only stops once the round deadline cancels it.
    Hang,
}

/// A participant replaying a fixed script, one step per call, then its fallback forever.
pub struct Scripted {
    id: ParticipantId,
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
}

impl Scripted {
    pub fn new(id: usize, steps: Vec<Step>, fallback: Step) -> Self {
        Self {
            id: ParticipantId(id),
            steps: Mutex::new(steps.into()),
            fallback,
        }
    }

    pub fn always(id: usize, step: Step) -> Self {
        Self::new(id, vec![], step)
    }

    pub fn respond(id: usize, value: f32, samples: usize) -> Self {
        Self::always(id, Step::Respond { value, samples })
    }
}

#[async_trait]
impl Participant for Scripted {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn name(&self) -> &str {
        "scripted"
    }

    async fn train_local(
        &self,
        _params: Arc<ParameterSet>,
        _plan: LocalPlan,
        cancel: CancellationToken,
    ) -> participant::Result<Update> {
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Respond { value, samples } => Ok(Update::new(
                self.id,
                scalar(value),
                samples,
                Duration::ZERO,
            )),
            Step::Fail(e) => Err(e),
            Step::Hang => {
                cancel.cancelled().await;
                Err(ParticipantErr::Cancelled)
            }
        }
    }
}

/// Scores a model by its single parameter, so reports show which value won the round.
pub struct ValueAsLoss;

impl Evaluate for ValueAsLoss {
    fn evaluate(&mut self, params: &ParameterSet) -> Result<Metrics, ModelErr> {
        let w = params.require("w")?.values()[0];
        Ok(Metrics {
            loss: w as f64,
            accuracy: 1.0,
        })
    }
}

/// Keeps every report it receives.
#[derive(Clone, Default)]
pub struct Recorder(pub Arc<Mutex<Vec<RoundReport>>>);

impl Recorder {
    pub fn reports(&self) -> Vec<RoundReport> {
        self.0.lock().unwrap().clone()
    }
}

impl ReportSink for Recorder {
    fn record(&mut self, report: &RoundReport) -> fedavg_orchestration::Result<()> {
        self.0.lock().unwrap().push(report.clone());
        Ok(())
    }
}

pub fn scalar(value: f32) -> ParameterSet {
    let mut params = ParameterSet::new();
    params.insert("w", Tensor::scalar(value));
    params
}

pub fn value_of(params: &ParameterSet) -> f32 {
    params.get("w").unwrap().values()[0]
}

/// An orchestrator over scripted participants starting from `w = 0`.
pub fn orchestrator(config: FederationConfig, participants: Vec<Scripted>) -> (Orchestrator, Recorder) {
    let participants = participants
        .into_iter()
        .map(|p| Arc::new(p) as Arc<dyn Participant>)
        .collect();

    let mut orchestrator = Orchestrator::new(
        config,
        participants,
        scalar(0.),
        Box::new(FedAvg::new()),
        Box::new(ValueAsLoss),
    )
    .unwrap();

    let recorder = Recorder::default();
    orchestrator.add_sink(Box::new(recorder.clone()));
    (orchestrator, recorder)
}
