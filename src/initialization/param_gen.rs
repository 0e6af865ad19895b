/// A `ParamGen` generates values for the initial state of the global model.
pub trait ParamGen {
    /// Should sample exactly `n` parameters.
    ///
    /// # Arguments
    /// * `n` - The amount of values to generate.
    fn sample(&mut self, n: usize) -> Vec<f32>;
}
