use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;

use super::{loss, Model, ModelErr, Result};
use crate::{
    data::Batch,
    initialization::ParamInit,
    optimization::Optimizer,
    params::{ParameterSet, Tensor},
};

#[derive(Debug, Clone)]
struct Dense {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

/// A stack of dense layers with ReLU activations in between and a log-softmax head,
/// trained with the negative log-likelihood loss.
///
/// The `i`-th layer exposes its parameters as `fc{i}.weight`, of shape `[out, in]`, and
/// `fc{i}.bias`, of shape `[out]`.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential` model.
    ///
    /// # Arguments
    /// * `sizes` - The widths of every layer, starting from the input and ending with the classes.
    /// * `init` - The initialization of the weights, biases start at zero.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// The model or an error if there are less than two sizes, a zero size or invalid init values.
    pub fn new<R: Rng>(sizes: &[usize], init: ParamInit, rng: &mut R) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(ModelErr::InvalidArchitecture(
                "at least an input and an output size are required".into(),
            ));
        }

        if sizes.contains(&0) {
            return Err(ModelErr::InvalidArchitecture(format!(
                "layer sizes must be positive, got {sizes:?}"
            )));
        }

        let layers = sizes
            .windows(2)
            .map(|w| {
                let (fan_in, fan_out) = (w[0], w[1]);
                let values = init.sample_weights(rng, fan_in, fan_out)?;
                let weight = Array2::from_shape_vec((fan_out, fan_in), values)
                    .map_err(|e| ModelErr::InvalidArchitecture(e.to_string()))?;

                Ok(Dense {
                    weight,
                    bias: Array1::zeros(fan_out),
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self { layers })
    }

    fn check_input(&self, xs: &ArrayView2<f32>) -> Result<()> {
        let expected = self.num_inputs();
        if xs.ncols() != expected {
            return Err(ModelErr::InputMismatch {
                got: xs.ncols(),
                expected,
            });
        }
        Ok(())
    }

    /// Runs the forward pass keeping every layer's input and pre-activation.
    fn forward_trace(&self, xs: ArrayView2<f32>) -> (Vec<Array2<f32>>, Vec<Array2<f32>>) {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut zs = Vec::with_capacity(self.layers.len());
        let mut a = xs.to_owned();

        for (i, layer) in self.layers.iter().enumerate() {
            let z = a.dot(&layer.weight.t()) + &layer.bias;
            let next = if i + 1 < self.layers.len() {
                z.mapv(|v| v.max(0.))
            } else {
                z.clone()
            };

            inputs.push(a);
            zs.push(z);
            a = next;
        }

        (inputs, zs)
    }
}

fn weight_key(i: usize) -> String {
    format!("fc{i}.weight")
}

fn bias_key(i: usize) -> String {
    format!("fc{i}.bias")
}

fn contiguous<'a>(values: Option<&'a mut [f32]>, key: &str) -> Result<&'a mut [f32]> {
    values.ok_or_else(|| ModelErr::InvalidArchitecture(format!("`{key}` is not contiguous")))
}

impl Model for Sequential {
    fn num_inputs(&self) -> usize {
        self.layers.first().map_or(0, |l| l.weight.ncols())
    }

    fn num_classes(&self) -> usize {
        self.layers.last().map_or(0, |l| l.weight.nrows())
    }

    fn forward(&self, xs: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_input(&xs)?;

        let (_, mut zs) = self.forward_trace(xs);
        let logits = zs.pop().unwrap_or_else(|| Array2::zeros((xs.nrows(), 0)));
        Ok(loss::log_softmax(logits.view()))
    }

    fn parameters(&self) -> ParameterSet {
        let mut params = ParameterSet::new();

        for (i, layer) in self.layers.iter().enumerate() {
            let (out, inp) = layer.weight.dim();
            let weight = Tensor::new(vec![out, inp], layer.weight.iter().copied().collect());
            let bias = Tensor::new(vec![out], layer.bias.to_vec());

            // shapes come from the arrays themselves
            if let (Ok(weight), Ok(bias)) = (weight, bias) {
                params.insert(weight_key(i), weight);
                params.insert(bias_key(i), bias);
            }
        }

        params
    }

    fn load_parameters(&mut self, params: &ParameterSet) -> Result<()> {
        params.check_compatible(&self.parameters())?;

        for (i, layer) in self.layers.iter_mut().enumerate() {
            let weight = params.require(&weight_key(i))?;
            let bias = params.require(&bias_key(i))?;

            layer.weight = weight.view2()?.to_owned();
            layer.bias = bias.view1().to_owned();
        }

        Ok(())
    }

    fn apply_gradient_step(
        &mut self,
        batch: &Batch,
        optimizer: &mut dyn Optimizer,
    ) -> Result<f32> {
        let xs = batch.xs.view();
        self.check_input(&xs)?;

        let n = batch.len().max(1) as f32;
        let classes = self.num_classes();
        let (inputs, zs) = self.forward_trace(xs);
        let Some(logits) = zs.last() else {
            return Ok(0.);
        };

        let log_probs = loss::log_softmax(logits.view());
        let batch_loss = loss::nll_sum(log_probs.view(), &batch.ys)? as f32 / n;

        // d(mean nll)/d(logits) = (softmax - one_hot) / n
        let mut delta = log_probs.mapv(f32::exp);
        for (mut row, &label) in delta.axis_iter_mut(Axis(0)).zip(&batch.ys) {
            if label >= classes {
                return Err(ModelErr::LabelOutOfRange { label, classes });
            }
            row[label] -= 1.;
        }
        delta.mapv_inplace(|d| d / n);

        let mut grads = Vec::with_capacity(self.layers.len());
        for i in (0..self.layers.len()).rev() {
            let grad_w = delta.t().dot(&inputs[i]);
            let grad_b = delta.sum_axis(Axis(0));

            if i > 0 {
                let mut prev = delta.dot(&self.layers[i].weight);
                prev.zip_mut_with(&zs[i - 1], |d, &z| {
                    if z <= 0. {
                        *d = 0.
                    }
                });
                delta = prev;
            }

            grads.push((i, grad_w, grad_b));
        }

        for (i, grad_w, grad_b) in grads {
            let layer = &mut self.layers[i];
            let (wk, bk) = (weight_key(i), bias_key(i));

            let grad_w: Vec<f32> = grad_w.iter().copied().collect();
            let weight = contiguous(layer.weight.as_slice_mut(), &wk)?;
            optimizer.update_params(&wk, &grad_w, weight)?;

            let grad_b = grad_b.to_vec();
            let bias = contiguous(layer.bias.as_slice_mut(), &bk)?;
            optimizer.update_params(&bk, &grad_b, bias)?;
        }

        Ok(batch_loss)
    }
}
