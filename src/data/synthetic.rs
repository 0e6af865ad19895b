use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::Dataset;
use crate::error::{FedErr, Result};

/// Generates a classification dataset of gaussian blobs, one blob per class.
///
/// The center of class `c` sits at distance `separation` from the origin along axis
/// `c % num_features`, on the negative side once every axis has been used once.
///
/// # Arguments
/// * `samples` - The amount of samples, labels cycle over the classes.
/// * `num_features` - The input width.
/// * `num_classes` - The amount of classes.
/// * `separation` - Distance of every center to the origin.
/// * `std_dev` - Standard deviation of every blob.
/// * `rng` - A random number generator.
///
/// # Returns
/// The dataset or an error if the blob's distribution is invalid.
pub fn gaussian_blobs<R: Rng>(
    samples: usize,
    num_features: usize,
    num_classes: usize,
    separation: f32,
    std_dev: f32,
    rng: &mut R,
) -> Result<Dataset> {
    if num_features == 0 || num_classes == 0 {
        return Err(FedErr::InvalidConfig(
            "synthetic data needs at least one feature and one class".into(),
        ));
    }

    if !(std_dev >= 0.) {
        return Err(FedErr::InvalidConfig(format!(
            "blob standard deviation must be non negative, got {std_dev}"
        )));
    }

    let noise = Normal::new(0., std_dev).map_err(|e| FedErr::InvalidConfig(e.to_string()))?;
    let labels: Vec<usize> = (0..samples).map(|i| i % num_classes).collect();

    let mut features = Array2::zeros((samples, num_features));
    for (mut row, &label) in features.rows_mut().into_iter().zip(&labels) {
        let axis = label % num_features;
        let sign = if (label / num_features) % 2 == 0 { 1. } else { -1. };

        for (j, x) in row.iter_mut().enumerate() {
            let center = if j == axis { sign * separation } else { 0. };
            *x = center + noise.sample(rng);
        }
    }

    Ok(Dataset::new(features, labels, num_classes))
}
