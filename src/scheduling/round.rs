use std::{fmt, sync::Arc, time::Duration};

use serde::Serialize;

use crate::{
    aggregation::AggregationWarning,
    evaluation::Metrics,
    params::ParameterSet,
    participant::{ParticipantErr, ParticipantId},
};

/// The lifecycle of a round attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    Pending,
    Broadcasting,
    Training,
    Collecting,
    Aggregating,
    Evaluating,
    Done,
    Failed,
}

impl RoundState {
    /// The state that follows on success, None for terminal states.
    pub fn next(self) -> Option<Self> {
        use RoundState::*;

        match self {
            Pending => Some(Broadcasting),
            Broadcasting => Some(Training),
            Training => Some(Collecting),
            Collecting => Some(Aggregating),
            Aggregating => Some(Evaluating),
            Evaluating => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RoundState::Done | RoundState::Failed)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundState::Pending => "pending",
            RoundState::Broadcasting => "broadcasting",
            RoundState::Training => "training",
            RoundState::Collecting => "collecting",
            RoundState::Aggregating => "aggregating",
            RoundState::Evaluating => "evaluating",
            RoundState::Done => "done",
            RoundState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One attempt at a federated round.
///
/// A completed `Round` is append-only history: it keeps who was selected, whose update
/// went into the aggregate, who failed and why, the resulting parameters and their
/// metrics.
#[derive(Debug, Clone)]
pub struct Round {
    index: usize,
    attempt: usize,
    state: RoundState,
    quorum_met: bool,
    selected: Vec<ParticipantId>,
    contributors: Vec<ParticipantId>,
    failed: Vec<(ParticipantId, ParticipantErr)>,
    warnings: Vec<AggregationWarning>,
    params: Option<Arc<ParameterSet>>,
    metrics: Option<Metrics>,
    duration: Duration,
}

impl Round {
    pub(crate) fn new(index: usize, attempt: usize) -> Self {
        Self {
            index,
            attempt,
            state: RoundState::Pending,
            quorum_met: false,
            selected: Vec::new(),
            contributors: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
            params: None,
            metrics: None,
            duration: Duration::ZERO,
        }
    }

    /// Moves to `next`, which must be the successor of the current state.
    pub(crate) fn advance(&mut self, next: RoundState) {
        debug_assert_eq!(
            self.state.next(),
            Some(next),
            "illegal round transition {} -> {next}",
            self.state
        );
        self.state = next;

        // aggregation is only reached with enough updates
        if next == RoundState::Aggregating {
            self.quorum_met = true;
        }
    }

    pub(crate) fn fail(&mut self, duration: Duration) {
        debug_assert!(!self.state.is_terminal());
        self.state = RoundState::Failed;
        self.duration = duration;
    }

    pub(crate) fn set_selected(&mut self, selected: Vec<ParticipantId>) {
        self.selected = selected;
    }

    pub(crate) fn set_failed(&mut self, failed: Vec<(ParticipantId, ParticipantErr)>) {
        self.failed = failed;
    }

    pub(crate) fn set_aggregate(
        &mut self,
        params: Arc<ParameterSet>,
        contributors: Vec<ParticipantId>,
        warnings: Vec<AggregationWarning>,
    ) {
        self.params = Some(params);
        self.contributors = contributors;
        self.warnings = warnings;
    }

    pub(crate) fn finish(&mut self, metrics: Metrics, duration: Duration) {
        self.advance(RoundState::Done);
        self.metrics = Some(metrics);
        self.duration = duration;
    }

    /// The round's index, starting at 1.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The attempt number within the round, starting at 1.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn quorum_met(&self) -> bool {
        self.quorum_met
    }

    pub fn selected(&self) -> &[ParticipantId] {
        &self.selected
    }

    pub fn contributors(&self) -> &[ParticipantId] {
        &self.contributors
    }

    pub fn failed(&self) -> &[(ParticipantId, ParticipantErr)] {
        &self.failed
    }

    pub fn warnings(&self) -> &[AggregationWarning] {
        &self.warnings
    }

    /// The aggregated parameters, only set once aggregation succeeded.
    pub fn params(&self) -> Option<&Arc<ParameterSet>> {
        self.params.as_ref()
    }

    pub fn metrics(&self) -> Option<Metrics> {
        self.metrics
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
