mod builder;
mod classifier;
mod layout;

pub use builder::ClassifierBuilder;
pub use classifier::Classifier;
pub use layout::{ParamLayout, ParamSpec};

use crate::{Result, data::Batch};

/// What a single optimization step reports back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    pub loss: f32,
    pub accuracy: f32,
    pub loss_no_reg: f32,
    /// Extra scalars the model declares for every update, e.g. the gradient norm.
    pub updates: Vec<(&'static str, f32)>,
}

/// Loss and accuracy of a forward-only pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalOutput {
    pub accuracy: f32,
    pub loss: f32,
    pub loss_no_reg: f32,
}

/// The capabilities the training loop needs from a trainable model.
///
/// Parameter order and shapes are fixed for the lifetime of the model, `layout` describes how
/// `params` and the gradients are flattened.
pub trait Model {
    /// The ordered names and shapes of the trainable parameters.
    fn layout(&self) -> &ParamLayout;

    /// The current flattened parameters.
    fn params(&self) -> &[f32];

    /// Computes the gradient over `batch` and applies one optimizer step at `learning_rate`.
    ///
    /// # Returns
    /// The loss, accuracy and loss without regularization measured *before* the update, plus
    /// the model's update scalars.
    fn step(&mut self, batch: &Batch, learning_rate: f32) -> Result<StepOutput>;

    /// Measures `batch` without touching parameters nor any running statistic.
    fn evaluate(&self, batch: &Batch) -> Result<EvalOutput>;

    /// Computes the flattened gradient over `batch` without applying it.
    fn gradients(&mut self, batch: &Batch) -> Result<&[f32]>;

    /// The flattened gradient computed by the last `step` or `gradients` call.
    fn last_gradients(&self) -> &[f32];
}
