use std::ops::Range;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use super::Dataset;
use crate::error::{FedErr, Result};

/// Splits `total` samples among `num_shards` and returns the range for `shard_id`.
///
/// Properties:
/// - Ranges are contiguous, disjoint and cover `[0..total)`.
/// - Sizes differ by at most 1 (balanced partition).
pub fn shard_range(total: usize, shard_id: usize, num_shards: usize) -> Range<usize> {
    assert!(num_shards > 0);
    assert!(shard_id < num_shards);

    let base = total / num_shards;
    let rem = total % num_shards;

    let start = shard_id * base + shard_id.min(rem);
    let extra = if shard_id < rem { 1 } else { 0 };
    let end = start + base + extra;

    start..end
}

/// How the training set is split across participants at federation setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Partition {
    /// Balanced shards.
    #[default]
    Even,
    /// Shards sized proportionally to the given weights, one per participant.
    Proportional { weights: Vec<f64> },
}

impl Partition {
    /// Shuffles the dataset with `seed` and splits it into `num_shards` private shards.
    ///
    /// # Arguments
    /// * `dataset` - The full training set.
    /// * `num_shards` - The amount of participants.
    /// * `seed` - Seed for the shuffle, a fixed seed yields the same shards.
    ///
    /// # Returns
    /// The shards in participant order or `FedErr::InvalidConfig` if the partition
    /// doesn't fit the amount of shards.
    pub fn split(&self, dataset: &Dataset, num_shards: usize, seed: u64) -> Result<Vec<Dataset>> {
        if num_shards == 0 {
            return Err(FedErr::InvalidConfig(
                "at least one participant is required to partition the dataset".into(),
            ));
        }

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let ranges = match self {
            Partition::Even => (0..num_shards)
                .map(|i| shard_range(order.len(), i, num_shards))
                .collect(),
            Partition::Proportional { weights } => {
                proportional_ranges(order.len(), weights, num_shards)?
            }
        };

        Ok(ranges
            .into_iter()
            .map(|range| dataset.select(&order[range]))
            .collect())
    }
}

fn proportional_ranges(
    total: usize,
    weights: &[f64],
    num_shards: usize,
) -> Result<Vec<Range<usize>>> {
    if weights.len() != num_shards {
        return Err(FedErr::InvalidConfig(format!(
            "partition has {} weights but there are {num_shards} participants",
            weights.len()
        )));
    }

    if weights.iter().any(|w| !w.is_finite() || *w < 0.) {
        return Err(FedErr::InvalidConfig(
            "partition weights must be finite and non negative".into(),
        ));
    }

    let sum: f64 = weights.iter().sum();
    if sum <= 0. {
        return Err(FedErr::InvalidConfig(
            "partition weights must add up to a positive value".into(),
        ));
    }

    let mut acc = 0.;
    let mut start = 0;
    let mut ranges = weights
        .iter()
        .map(|w| {
            acc += w;
            let end = ((acc / sum) * total as f64).round() as usize;
            let end = end.clamp(start, total);
            let range = start..end;
            start = end;
            range
        })
        .collect::<Vec<_>>();

    // rounding must never leave samples behind
    if let Some(last) = ranges.last_mut() {
        last.end = total;
    }

    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    fn dataset(n: usize) -> Dataset {
        let xs = Array2::from_shape_fn((n, 1), |(i, _)| i as f32);
        Dataset::new(xs, vec![0; n], 1)
    }

    #[test]
    fn shard_range_balanced() {
        // total 10, shards 3 => sizes 4,3,3
        assert_eq!(shard_range(10, 0, 3), 0..4);
        assert_eq!(shard_range(10, 1, 3), 4..7);
        assert_eq!(shard_range(10, 2, 3), 7..10);
    }

    #[test]
    fn even_split_is_disjoint_and_complete() {
        let ds = dataset(11);
        let shards = Partition::Even.split(&ds, 2, 1).unwrap();
        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].len() + shards[1].len(), 11);

        let mut seen: Vec<f32> = shards
            .iter()
            .flat_map(|s| s.features().column(0).to_vec())
            .collect();
        seen.sort_by(f32::total_cmp);
        assert_eq!(seen, (0..11).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_stable_for_a_seed() {
        let ds = dataset(20);
        let a = Partition::Even.split(&ds, 3, 42).unwrap();
        let b = Partition::Even.split(&ds, 3, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn proportional_split_sizes() {
        let ds = dataset(400);
        let partition = Partition::Proportional {
            weights: vec![1., 3.],
        };

        let shards = partition.split(&ds, 2, 0).unwrap();
        assert_eq!(shards[0].len(), 100);
        assert_eq!(shards[1].len(), 300);
    }

    #[test]
    fn proportional_split_rejects_bad_weights() {
        let ds = dataset(10);
        let wrong_len = Partition::Proportional { weights: vec![1.] };
        assert!(wrong_len.split(&ds, 2, 0).is_err());

        let zero = Partition::Proportional {
            weights: vec![0., 0.],
        };
        assert!(zero.split(&ds, 2, 0).is_err());
    }
}
