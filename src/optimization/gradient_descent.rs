use super::{Optimizer, SizeMismatchErr};

/// Plain stochastic gradient descent.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn update_params(
        &mut self,
        _key: &str,
        grad: &[f32],
        params: &mut [f32],
    ) -> Result<(), SizeMismatchErr> {
        if grad.len() != params.len() {
            return Err(SizeMismatchErr {
                grad: grad.len(),
                params: params.len(),
            });
        }

        let lr = self.learning_rate;
        for (p, g) in params.iter_mut().zip(grad) {
            *p -= lr * g;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_against_gradient() {
        let mut optimizer = GradientDescent::new(0.1);
        let mut params = [1.0, 2.0];
        optimizer
            .update_params("w", &[1.0, -1.0], &mut params)
            .unwrap();
        assert!((params[0] - 0.9).abs() < 1e-6);
        assert!((params[1] - 2.1).abs() < 1e-6);
    }

    #[test]
    fn size_mismatch() {
        let mut optimizer = GradientDescent::new(0.1);
        let err = optimizer
            .update_params("w", &[1.0], &mut [0.0, 0.0])
            .unwrap_err();
        assert_eq!(err, SizeMismatchErr { grad: 1, params: 2 });
    }
}
