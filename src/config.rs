use std::{fs, num::NonZeroUsize, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    data::Partition,
    error::{FedErr, Result},
    optimization::OptimizerConfig,
    participant::LocalPlan,
};

/// The recognized options of a federation.
///
/// Every field has a default, so a JSON document only needs the ones it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FederationConfig {
    pub num_rounds: usize,
    pub epochs_per_round: usize,
    pub batch_size: usize,
    pub test_batch_size: usize,
    pub optimizer: OptimizerConfig,
    /// Successful updates required for a round to aggregate.
    pub min_participants: usize,
    /// Share of the selectable participants drawn every round attempt, in `(0, 1]`.
    pub sample_fraction: f64,
    /// Bound on the training phase of every round attempt.
    pub round_deadline_ms: u64,
    /// Extra attempts of a round after the first one fails.
    pub max_retries: usize,
    pub max_consecutive_failures: usize,
    /// Participants training at the same time.
    pub worker_pool_size: usize,
    pub seed: u64,
    /// Batches between training progress logs, zero disables them.
    pub log_interval: usize,
    pub partition: Partition,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            num_rounds: 10,
            epochs_per_round: 1,
            batch_size: 64,
            test_batch_size: 1000,
            optimizer: OptimizerConfig::default(),
            min_participants: 1,
            sample_fraction: 1.0,
            round_deadline_ms: 60_000,
            max_retries: 3,
            max_consecutive_failures: 3,
            worker_pool_size: 4,
            seed: 1,
            log_interval: 10,
            partition: Partition::default(),
        }
    }
}

impl FederationConfig {
    /// Parses and validates a config from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Checks every option, the first violation found is returned as `FedErr::InvalidConfig`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(FedErr::InvalidConfig(msg)) };

        if !(self.sample_fraction > 0. && self.sample_fraction <= 1.) {
            return invalid(format!(
                "sample_fraction must be in (0, 1], got {}",
                self.sample_fraction
            ));
        }

        for (name, value) in [
            ("epochs_per_round", self.epochs_per_round),
            ("batch_size", self.batch_size),
            ("test_batch_size", self.test_batch_size),
            ("min_participants", self.min_participants),
            ("max_consecutive_failures", self.max_consecutive_failures),
            ("worker_pool_size", self.worker_pool_size),
        ] {
            if value == 0 {
                return invalid(format!("{name} must be at least 1"));
            }
        }

        if self.round_deadline_ms == 0 {
            return invalid("round_deadline_ms must be at least 1".into());
        }

        let lr = self.optimizer.learning_rate();
        if !lr.is_finite() || lr <= 0. {
            return invalid(format!("the learning rate must be positive, got {lr}"));
        }

        if let OptimizerConfig::GradientDescentWithMomentum { mu, .. } = self.optimizer {
            if !(0. ..1.).contains(&mu) {
                return invalid(format!("momentum must be in [0, 1), got {mu}"));
            }
        }

        Ok(())
    }

    pub fn round_deadline(&self) -> Duration {
        Duration::from_millis(self.round_deadline_ms)
    }

    /// Total attempts a round gets before the federation gives up.
    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Builds the plan participants follow in an attempt of round `round`.
    ///
    /// # Returns
    /// The plan or `FedErr::InvalidConfig` for a zero epoch count or batch size.
    pub fn local_plan(&self, round: usize, attempt: usize) -> Result<LocalPlan> {
        let non_zero = |name: &str, value| {
            NonZeroUsize::new(value)
                .ok_or_else(|| FedErr::InvalidConfig(format!("{name} must be at least 1")))
        };

        Ok(LocalPlan {
            round,
            epochs: non_zero("epochs_per_round", self.epochs_per_round)?,
            batch_size: non_zero("batch_size", self.batch_size)?,
            optimizer: self.optimizer,
            seed: self.seed.wrapping_add(attempt as u64),
            log_interval: self.log_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = FederationConfig::from_json_str("{}").unwrap();
        assert_eq!(config, FederationConfig::default());
        assert_eq!(config.max_attempts(), 4);
    }

    #[test]
    fn partial_documents() {
        let config = FederationConfig::from_json_str(
            r#"{
                "num_rounds": 3,
                "sample_fraction": 0.5,
                "optimizer": { "kind": "gradient_descent", "lr": 0.1 },
                "partition": { "kind": "proportional", "weights": [1.0, 3.0] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.num_rounds, 3);
        assert_eq!(config.sample_fraction, 0.5);
        assert_eq!(config.optimizer, OptimizerConfig::GradientDescent { lr: 0.1 });
        assert_eq!(config.batch_size, 64);
        assert_eq!(
            config.partition,
            Partition::Proportional {
                weights: vec![1.0, 3.0]
            }
        );
    }

    #[test]
    fn sample_fraction_bounds() {
        for fraction in [0.0, -0.5, 1.5, f64::NAN] {
            let config = FederationConfig {
                sample_fraction: fraction,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(FedErr::InvalidConfig(_))));
        }
    }

    #[test]
    fn zero_sizes_and_bad_optimizers() {
        let configs = [
            FederationConfig {
                worker_pool_size: 0,
                ..Default::default()
            },
            FederationConfig {
                min_participants: 0,
                ..Default::default()
            },
            FederationConfig {
                round_deadline_ms: 0,
                ..Default::default()
            },
            FederationConfig {
                optimizer: OptimizerConfig::GradientDescent { lr: -1. },
                ..Default::default()
            },
            FederationConfig {
                optimizer: OptimizerConfig::GradientDescentWithMomentum { lr: 0.1, mu: 1.0 },
                ..Default::default()
            },
        ];

        for config in configs {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            FederationConfig::from_json_str(r#"{ "rounds": 3 }"#),
            Err(FedErr::Json(_))
        ));
    }

    #[test]
    fn plans_vary_with_the_attempt() {
        let config = FederationConfig::default();
        let first = config.local_plan(2, 1).unwrap();
        let retry = config.local_plan(2, 2).unwrap();

        assert_eq!(first.round, 2);
        assert_eq!(first.batch_size.get(), 64);
        assert_ne!(first.seed, retry.seed);
    }
}
