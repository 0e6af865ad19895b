mod error;
mod gradient_descent;
mod gradient_descent_with_momentum;
mod optimizer;

use serde::{Deserialize, Serialize};

pub use error::SizeMismatchErr;
pub use gradient_descent::GradientDescent;
pub use gradient_descent_with_momentum::GradientDescentWithMomentum;
pub use optimizer::Optimizer;

/// The local optimizer rule participants apply after every mini-batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    GradientDescent { lr: f32 },
    GradientDescentWithMomentum { lr: f32, mu: f32 },
}

impl OptimizerConfig {
    pub fn learning_rate(&self) -> f32 {
        match *self {
            OptimizerConfig::GradientDescent { lr } => lr,
            OptimizerConfig::GradientDescentWithMomentum { lr, .. } => lr,
        }
    }

    /// Builds a fresh optimizer, without any state carried from previous rounds.
    pub fn build(&self) -> Box<dyn Optimizer> {
        match *self {
            OptimizerConfig::GradientDescent { lr } => Box::new(GradientDescent::new(lr)),
            OptimizerConfig::GradientDescentWithMomentum { lr, mu } => {
                Box::new(GradientDescentWithMomentum::new(lr, mu))
            }
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::GradientDescentWithMomentum { lr: 0.01, mu: 0.5 }
    }
}
