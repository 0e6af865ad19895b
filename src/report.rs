use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::{info, warn};
use serde::Serialize;

use crate::{
    aggregation::AggregationWarning,
    error::Result,
    participant::ParticipantId,
    scheduling::{Round, RoundState},
};

/// A participant left out of a round attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedParticipant {
    pub participant: ParticipantId,
    pub reason: &'static str,
    pub detail: String,
}

/// The per-attempt record handed to every report sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub round_index: usize,
    pub attempt: usize,
    pub state: RoundState,
    pub selected_participants: Vec<ParticipantId>,
    pub contributors: Vec<ParticipantId>,
    pub failed: Vec<FailedParticipant>,
    pub quorum_met: bool,
    /// Recoverable anomalies found while aggregating, such as duplicate updates.
    pub warnings: Vec<AggregationWarning>,
    pub test_loss: Option<f64>,
    pub test_accuracy: Option<f64>,
    pub duration_ms: u64,
}

impl From<&Round> for RoundReport {
    fn from(round: &Round) -> Self {
        let metrics = round.metrics();

        Self {
            round_index: round.index(),
            attempt: round.attempt(),
            state: round.state(),
            selected_participants: round.selected().to_vec(),
            contributors: round.contributors().to_vec(),
            failed: round
                .failed()
                .iter()
                .map(|(participant, err)| FailedParticipant {
                    participant: *participant,
                    reason: err.kind(),
                    detail: err.to_string(),
                })
                .collect(),
            quorum_met: round.quorum_met(),
            warnings: round.warnings().to_vec(),
            test_loss: metrics.map(|m| m.loss),
            test_accuracy: metrics.map(|m| m.accuracy),
            duration_ms: round.duration().as_millis() as u64,
        }
    }
}

/// A destination for round reports.
pub trait ReportSink: Send {
    fn record(&mut self, report: &RoundReport) -> Result<()>;
}

/// Logs every report as a JSON object at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn record(&mut self, report: &RoundReport) -> Result<()> {
        let json = serde_json::to_string(report)?;
        info!(round = report.round_index, attempt = report.attempt; "round report: {json}");
        Ok(())
    }
}

/// Writes one JSON object per line, flushing after each one.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<BufWriter<File>> {
    /// Creates a sink that truncates and writes to the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> ReportSink for JsonLinesSink<W> {
    fn record(&mut self, report: &RoundReport) -> Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Fans reports out to every registered sink.
#[derive(Default)]
pub struct Reporter {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    /// Hands `round`'s report to every sink.
    ///
    /// A failing sink doesn't stop training, the failure is logged and the remaining sinks
    /// still get the report.
    pub fn emit(&mut self, round: &Round) {
        let report = RoundReport::from(round);

        for sink in &mut self.sinks {
            if let Err(e) = sink.record(&report) {
                warn!(round = report.round_index; "report sink failed: {e}");
            }
        }
    }
}
