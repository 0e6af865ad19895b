use super::SizeMismatchErr;

/// Defines the rule for updating model parameters based on calculated gradients.
pub trait Optimizer: Send {
    /// Updates the parameters stored under `key` using their gradient.
    ///
    /// # Arguments
    /// * `key` - The name of the parameter tensor, stateful optimizers keep their state per key.
    /// * `grad` - The gradient of the loss with respect to `params`.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// An error if there's a mismatch in the sizes of `grad` and `params`.
    fn update_params(
        &mut self,
        key: &str,
        grad: &[f32],
        params: &mut [f32],
    ) -> Result<(), SizeMismatchErr>;
}

impl<T: Optimizer + ?Sized> Optimizer for Box<T> {
    fn update_params(
        &mut self,
        key: &str,
        grad: &[f32],
        params: &mut [f32],
    ) -> Result<(), SizeMismatchErr> {
        (**self).update_params(key, grad, params)
    }
}
