use ndarray::{Array2, ArrayView2, Axis};

use super::{ModelErr, Result};

/// Row-wise numerically stable log-softmax.
pub fn log_softmax(logits: ArrayView2<f32>) -> Array2<f32> {
    let mut out = logits.to_owned();

    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
        let lse = max + row.mapv(|x| (x - max).exp()).sum().ln();
        row.mapv_inplace(|x| x - lse);
    }

    out
}

/// Summed negative log-likelihood of the true labels.
///
/// # Arguments
/// * `log_probs` - Log-probabilities, one row per sample.
/// * `labels` - The true class of every row.
pub fn nll_sum(log_probs: ArrayView2<f32>, labels: &[usize]) -> Result<f64> {
    let classes = log_probs.ncols();

    log_probs
        .axis_iter(Axis(0))
        .zip(labels)
        .try_fold(0., |acc, (row, &label)| {
            let lp = row
                .get(label)
                .ok_or(ModelErr::LabelOutOfRange { label, classes })?;
            Ok(acc - *lp as f64)
        })
}

/// Counts the rows whose highest scoring class is the true label.
pub fn correct_predictions(scores: ArrayView2<f32>, labels: &[usize]) -> usize {
    scores
        .axis_iter(Axis(0))
        .zip(labels)
        .filter(|(row, label)| argmax(row.iter().copied()) == Some(**label))
        .count()
}

fn argmax(values: impl Iterator<Item = f32>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, x)| match best {
            Some((_, b)) if b >= x => best,
            _ => Some((i, x)),
        })
        .map(|(i, _)| i)
}
