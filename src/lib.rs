//! Round-based federated averaging.
//!
//! An [`Orchestrator`] owns a set of [`Participant`]s, each holding a private shard of the
//! training data, and a global model. Every round the [`RoundScheduler`] broadcasts the
//! global parameters to a selection of participants, lets them train locally in parallel
//! until a deadline, combines their updates with [`FedAvg`] and evaluates the result.

pub mod aggregation;
pub mod builder;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod initialization;
pub mod model;
pub mod optimization;
pub mod orchestrator;
pub mod params;
pub mod participant;
pub mod report;
pub mod scheduling;
pub mod transport;

pub use aggregation::{Aggregate, AggregateErr, Aggregator, FedAvg};
pub use builder::{Federation, FederationBuilder, Transport};
pub use config::FederationConfig;
pub use error::{FedErr, Result};
pub use evaluation::{Evaluate, Evaluator, Metrics};
pub use orchestrator::{GlobalModel, Orchestrator, Outcome};
pub use params::{ParameterSet, Tensor};
pub use participant::{LocalParticipant, LocalPlan, Participant, ParticipantErr, ParticipantId, Update};
pub use report::{JsonLinesSink, LogSink, ReportSink, RoundReport};
pub use scheduling::{Availability, Registry, Round, RoundScheduler, RoundState};
