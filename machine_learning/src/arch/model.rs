use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A network whose parameters live outside of it, in a single flat buffer.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Makes a forward pass through the network, caching what `backward` needs.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The model's output for `x`.
    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Makes a forward pass without touching any cached state.
    fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Back propagates `d`, the derivative of the loss with respect to the last `forward`
    /// output, **overwriting** `grad` with the gradient of every parameter.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer as long as `params`.
    /// * `d` - The derivative of the loss with respect to the output.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()>;
}
