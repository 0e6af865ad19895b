use ndarray::{Array2, ArrayView2};

use super::Result;
use crate::{data::Batch, optimization::Optimizer, params::ParameterSet};

/// The numeric collaborator the federation trains.
///
/// The orchestration core only ever talks to a model through this contract, so it
/// doesn't depend on any specific architecture. Participants are shared
/// between tasks and own a model prototype, hence `Sync`.
pub trait Model: Send + Sync {
    /// The width of the inputs the model accepts.
    fn num_inputs(&self) -> usize;

    /// The amount of classes the model scores, valid labels are lower than it.
    fn num_classes(&self) -> usize;

    /// Runs the model in inference mode.
    ///
    /// # Arguments
    /// * `xs` - The inputs, one row per sample.
    ///
    /// # Returns
    /// The log-probabilities of every class, one row per sample.
    fn forward(&self, xs: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Returns a snapshot of the model's parameters.
    fn parameters(&self) -> ParameterSet;

    /// Replaces the model's parameters.
    ///
    /// # Returns
    /// An error if `params` doesn't have the same keys and shapes as the model.
    fn load_parameters(&mut self, params: &ParameterSet) -> Result<()>;

    /// Computes the gradient of the loss over a batch and lets `optimizer` apply it.
    ///
    /// # Returns
    /// The mean loss of the batch, measured before the update.
    fn apply_gradient_step(&mut self, batch: &Batch, optimizer: &mut dyn Optimizer)
        -> Result<f32>;
}
