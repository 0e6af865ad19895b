use std::collections::BTreeMap;

use log::warn;
use rayon::prelude::*;

use super::{Aggregate, AggregateErr, AggregationWarning, Aggregator, Result};
use crate::{
    params::{ParameterSet, Tensor},
    participant::{ParticipantId, Update},
};

/// Federated averaging: every parameter becomes the mean of the participants' values
/// weighted by their sample counts.
///
/// Accumulation happens in `f64` over participant ids in ascending order, so the result
/// only depends on the set of updates and not on the order they arrived in.
#[derive(Debug, Clone, Copy, Default)]
pub struct FedAvg;

impl FedAvg {
    pub fn new() -> Self {
        Self
    }

    /// Keeps the last update of every participant, recording a warning per discarded one.
    fn dedup(updates: Vec<Update>) -> (BTreeMap<ParticipantId, Update>, Vec<AggregationWarning>) {
        let mut latest = BTreeMap::new();
        let mut warnings = Vec::new();

        for update in updates {
            let participant = update.participant();
            if latest.insert(participant, update).is_some() {
                warn!(participant = participant.0; "duplicate update, keeping the latest one");
                warnings.push(AggregationWarning::DuplicateUpdate { participant });
            }
        }

        (latest, warnings)
    }
}

impl Aggregator for FedAvg {
    fn combine(&self, updates: Vec<Update>) -> Result<Aggregate> {
        let (latest, warnings) = Self::dedup(updates);

        let Some(reference) = latest.values().next().map(Update::params) else {
            return Err(AggregateErr::NoUpdates);
        };

        for (&participant, update) in &latest {
            update
                .params()
                .check_compatible(reference)
                .map_err(|source| AggregateErr::ParameterMismatch {
                    participant,
                    source,
                })?;
        }

        let total_samples: usize = latest.values().map(Update::sample_count).sum();
        if total_samples == 0 {
            return Err(AggregateErr::ZeroSamples);
        }

        let weighted: Vec<_> = latest
            .values()
            .map(|u| (u.sample_count() as f64 / total_samples as f64, u.params()))
            .collect();

        let params: ParameterSet = reference
            .iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(key, tensor)| {
                let mut acc = vec![0f64; tensor.len()];

                for (weight, params) in &weighted {
                    // compatibility was checked above
                    let Some(t) = params.get(key) else { continue };
                    for (a, &v) in acc.iter_mut().zip(t.values()) {
                        *a += weight * v as f64;
                    }
                }

                let mut avg = Tensor::zeros(tensor.shape().to_vec());
                for (out, v) in avg.values_mut().iter_mut().zip(acc) {
                    *out = v as f32;
                }
                (key.clone(), avg)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        Ok(Aggregate {
            params,
            contributors: latest.into_keys().collect(),
            warnings,
            total_samples,
        })
    }
}
