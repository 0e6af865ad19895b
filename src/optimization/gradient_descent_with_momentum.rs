use std::collections::HashMap;

use super::{Optimizer, SizeMismatchErr};

/// Gradient descent with classical momentum, the velocity is tracked per parameter key.
#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocities: HashMap<String, Vec<f32>>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - The fraction of the previous velocity kept on each step.
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocities: HashMap::new(),
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(
        &mut self,
        key: &str,
        grad: &[f32],
        params: &mut [f32],
    ) -> Result<(), SizeMismatchErr> {
        if grad.len() != params.len() {
            return Err(SizeMismatchErr {
                grad: grad.len(),
                params: params.len(),
            });
        }

        let velocity = self
            .velocities
            .entry(key.to_string())
            .or_insert_with(|| vec![0.; params.len()]);

        if velocity.len() != params.len() {
            *velocity = vec![0.; params.len()];
        }

        let (lr, mu) = (self.learning_rate, self.momentum);
        for ((p, v), g) in params.iter_mut().zip(velocity.iter_mut()).zip(grad) {
            *v = mu * *v + g;
            *p -= lr * *v;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_accumulates_per_key() {
        let mut optimizer = GradientDescentWithMomentum::new(1.0, 0.5);
        let mut w = [0.0];
        let mut b = [0.0];

        optimizer.update_params("w", &[1.0], &mut w).unwrap();
        assert_eq!(w, [-1.0]);

        // v = 0.5 * 1 + 1
        optimizer.update_params("w", &[1.0], &mut w).unwrap();
        assert_eq!(w, [-2.5]);

        optimizer.update_params("b", &[1.0], &mut b).unwrap();
        assert_eq!(b, [-1.0]);
    }
}
