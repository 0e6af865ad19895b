mod aggregator;
mod error;
mod fedavg;

pub use aggregator::{Aggregate, AggregationWarning, Aggregator};
pub use error::{AggregateErr, Result};
pub use fedavg::FedAvg;
