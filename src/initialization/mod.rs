mod constant;
mod error;
mod param_gen;
mod random;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use constant::ConstParamGen;
pub use error::{InitErr, Result};
pub use param_gen::ParamGen;
pub use random::RandParamGen;

/// The initialization scheme of a layer's weights, biases always start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamInit {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    XavierUniform,
    Kaiming,
}

impl ParamInit {
    /// Samples the `fan_out * fan_in` weights of a dense layer.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `fan_in` - The input width of the layer.
    /// * `fan_out` - The output width of the layer.
    pub fn sample_weights<R: Rng>(
        &self,
        rng: &mut R,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Vec<f32>> {
        let n = fan_in * fan_out;

        let sample = match *self {
            ParamInit::Const { value } => ConstParamGen::new(value).sample(n),
            ParamInit::Uniform { low, high } => RandParamGen::uniform(rng, low, high)?.sample(n),
            ParamInit::XavierUniform => RandParamGen::xavier_uniform(rng, fan_in, fan_out)?.sample(n),
            ParamInit::Kaiming => RandParamGen::kaiming(rng, fan_in)?.sample(n),
        };

        Ok(sample)
    }
}
