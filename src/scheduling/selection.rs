use rand::{seq::index, Rng};

use crate::participant::ParticipantId;

/// The amount of participants to select out of `available` ones.
///
/// At least one is selected whenever there is one to select. The product is rounded up,
/// ignoring the floating point error of fractions such as `0.07` that aren't exact.
pub fn selection_size(sample_fraction: f64, available: usize) -> usize {
    const EPSILON: f64 = 1e-9;

    if available == 0 {
        return 0;
    }

    let wanted = (sample_fraction * available as f64 - EPSILON).ceil() as usize;
    wanted.clamp(1, available)
}

/// Draws the participants of a round attempt.
///
/// # Arguments
/// * `available` - The selectable ids.
/// * `sample_fraction` - The share of them to select, in `(0, 1]`.
/// * `rng` - The scheduler's seeded random number generator.
///
/// # Returns
/// The selected ids in ascending order.
pub fn select<R: Rng + ?Sized>(
    available: &[ParticipantId],
    sample_fraction: f64,
    rng: &mut R,
) -> Vec<ParticipantId> {
    let amount = selection_size(sample_fraction, available.len());

    let mut selected: Vec<_> = if amount == available.len() {
        available.to_vec()
    } else {
        index::sample(rng, available.len(), amount)
            .into_iter()
            .map(|i| available[i])
            .collect()
    };

    selected.sort_unstable();
    selected
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn ids(n: usize) -> Vec<ParticipantId> {
        (0..n).map(ParticipantId).collect()
    }

    #[test]
    fn size_is_at_least_one() {
        assert_eq!(selection_size(0.01, 10), 1);
        assert_eq!(selection_size(0.25, 10), 3);
        assert_eq!(selection_size(1.0, 10), 10);
        assert_eq!(selection_size(0.5, 0), 0);
    }

    #[test]
    fn inexact_fractions_are_not_rounded_past_the_product() {
        assert_eq!(selection_size(0.07, 100), 7);
        assert_eq!(selection_size(0.29, 100), 29);
        assert_eq!(selection_size(0.57, 100), 57);
        assert_eq!(selection_size(0.7, 10), 7);
        assert_eq!(selection_size(0.071, 100), 8);
    }

    #[test]
    fn full_fraction_selects_everyone() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(select(&ids(4), 1.0, &mut rng), ids(4));
    }

    #[test]
    fn same_seed_same_selection() {
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (select(&ids(20), 0.3, &mut rng), select(&ids(20), 0.3, &mut rng))
        };

        let (first, second) = pick(42);
        assert_eq!(pick(42), (first.clone(), second));
        assert_eq!(first.len(), 6);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }
}
