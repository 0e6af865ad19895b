use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{DataLoader, Dataset},
    model::{loss, Model, ModelErr},
    params::ParameterSet,
};

/// Test set metrics of a global model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean negative log-likelihood per sample.
    pub loss: f64,
    /// Fraction of correctly classified samples, in `[0, 1]`.
    pub accuracy: f64,
}

/// Scores a parameter set against held out data.
pub trait Evaluate: Send {
    fn evaluate(&mut self, params: &ParameterSet) -> Result<Metrics, ModelErr>;
}

/// Evaluates parameter sets with a model over a global test set, no training happens.
pub struct Evaluator<M: Model> {
    model: M,
    test_set: Arc<Dataset>,
    batch_size: usize,
}

impl<M: Model> Evaluator<M> {
    /// Creates a new `Evaluator`.
    ///
    /// # Arguments
    /// * `model` - A model with the same architecture as the global one.
    /// * `test_set` - The held out samples.
    /// * `batch_size` - The amount of samples per forward pass, clamped to at least one.
    pub fn new(model: M, test_set: Arc<Dataset>, batch_size: usize) -> Self {
        Self {
            model,
            test_set,
            batch_size: batch_size.max(1),
        }
    }
}

impl<M: Model> Evaluate for Evaluator<M> {
    fn evaluate(&mut self, params: &ParameterSet) -> Result<Metrics, ModelErr> {
        self.model.load_parameters(params)?;

        let total = self.test_set.len();
        if total == 0 {
            return Ok(Metrics {
                loss: 0.,
                accuracy: 0.,
            });
        }

        let mut nll = 0.;
        let mut correct = 0;

        for batch in DataLoader::new(&self.test_set, self.batch_size) {
            let log_probs = self.model.forward(batch.xs.view())?;
            nll += loss::nll_sum(log_probs.view(), &batch.ys)?;
            correct += loss::correct_predictions(log_probs.view(), &batch.ys);
        }

        let metrics = Metrics {
            loss: nll / total as f64,
            accuracy: correct as f64 / total as f64,
        };

        debug!(samples = total, correct = correct; "evaluated global model");
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{initialization::ParamInit, model::Sequential, params::Tensor};

    #[test]
    fn perfect_and_wrong_classifiers() {
        let mut rng = StdRng::seed_from_u64(0);
        let model = Sequential::new(&[2, 2], ParamInit::Const { value: 0. }, &mut rng).unwrap();

        let test_set = Dataset::new(array![[1., 0.], [0., 1.], [2., 0.]], vec![0, 1, 0], 2);
        let mut evaluator = Evaluator::new(model, Arc::new(test_set), 2);

        let mut identity = ParameterSet::new();
        identity.insert("fc0.weight", Tensor::new(vec![2, 2], vec![10., 0., 0., 10.]).unwrap());
        identity.insert("fc0.bias", Tensor::zeros(vec![2]));

        let good = evaluator.evaluate(&identity).unwrap();
        assert_eq!(good.accuracy, 1.0);
        assert!(good.loss < 1e-3);

        let mut swapped = identity.clone();
        swapped.insert("fc0.weight", Tensor::new(vec![2, 2], vec![0., 10., 10., 0.]).unwrap());

        let bad = evaluator.evaluate(&swapped).unwrap();
        assert_eq!(bad.accuracy, 0.0);
        assert!(bad.loss > good.loss);
    }

    #[test]
    fn uniform_prediction_loss() {
        let mut rng = StdRng::seed_from_u64(0);
        let model = Sequential::new(&[3, 4], ParamInit::Const { value: 0. }, &mut rng).unwrap();
        let params = model.parameters();

        let test_set = Dataset::new(array![[1., 2., 3.], [0., 0., 1.]], vec![3, 1], 4);
        let metrics = Evaluator::new(model, Arc::new(test_set), 10)
            .evaluate(&params)
            .unwrap();

        assert!((metrics.loss - 4f64.ln()).abs() < 1e-6);
    }

    #[test]
    fn mismatched_parameters_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let model = Sequential::new(&[2, 2], ParamInit::Const { value: 0. }, &mut rng).unwrap();
        let mut evaluator = Evaluator::new(model, Arc::new(Dataset::empty(2, 2)), 1);

        assert!(matches!(
            evaluator.evaluate(&ParameterSet::new()),
            Err(ModelErr::Params(_))
        ));
    }
}
