use std::ops::Range;

use machine_learning::{
    MlErr,
    arch::{
        Model as Network, Sequential, accuracy,
        loss::{LossFn, SoftmaxCrossEntropy},
    },
    optimization::Optimizer,
};

use super::{EvalOutput, Model, ParamLayout, StepOutput};
use crate::{Result, data::Batch};

/// A dense softmax classifier trained with L2 regularized cross entropy.
///
/// Owns the flat parameter and gradient buffers, the network only views them.
pub struct Classifier {
    network: Sequential,
    optimizer: Box<dyn Optimizer>,
    loss_fn: SoftmaxCrossEntropy,
    l2: f32,
    layout: ParamLayout,
    kernels: Vec<Range<usize>>,
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl Classifier {
    /// Creates a new `Classifier`.
    ///
    /// # Arguments
    /// * `network` - The network computing the logits.
    /// * `params` - The initial flat parameters, as long as the network's size.
    /// * `optimizer` - The update rule applied on each step.
    /// * `l2` - The weight of the squared kernel penalty added to the loss.
    /// * `layout` - The names and shapes of `params`.
    ///
    /// # Errors
    /// A size mismatch if `params` or `layout` do not match the network.
    pub fn new(
        network: Sequential,
        params: Vec<f32>,
        optimizer: Box<dyn Optimizer>,
        l2: f32,
        layout: ParamLayout,
    ) -> Result<Self> {
        let size = network.size();

        for (what, got) in [("initial parameters", params.len()), ("layout", layout.len())] {
            if got != size {
                return Err(MlErr::SizeMismatch {
                    what,
                    got,
                    expected: size,
                }
                .into());
            }
        }

        Ok(Self {
            kernels: network.kernel_ranges(),
            network,
            optimizer,
            loss_fn: SoftmaxCrossEntropy::new(),
            l2,
            layout,
            params,
            grad: vec![0.; size],
        })
    }

    /// `l2 · Σ w²` over every kernel.
    fn penalty(&self) -> f32 {
        if self.l2 == 0. {
            return 0.;
        }

        let sum: f32 = self
            .kernels
            .iter()
            .map(|r| self.params[r.clone()].iter().map(|w| w * w).sum::<f32>())
            .sum();

        self.l2 * sum
    }

    /// Fills `self.grad` for `batch`.
    ///
    /// # Returns
    /// The cross entropy and the accuracy at the current parameters.
    fn backprop(&mut self, batch: &Batch) -> Result<(f32, f32)> {
        if batch.is_empty() {
            return Err(MlErr::EmptyBatch.into());
        }

        let logits = self.network.forward(&self.params, batch.x.view())?;
        let cross_entropy = self.loss_fn.loss(logits.view(), batch.y.view());
        let acc = accuracy(logits.view(), batch.y.view());

        let d = self.loss_fn.loss_prime(logits.view(), batch.y.view());
        self.network.backward(&self.params, &mut self.grad, d)?;

        if self.l2 != 0. {
            let scale = 2. * self.l2;
            for r in &self.kernels {
                self.grad[r.clone()]
                    .iter_mut()
                    .zip(&self.params[r.clone()])
                    .for_each(|(g, w)| *g += scale * w);
            }
        }

        Ok((cross_entropy, acc))
    }
}

impl Model for Classifier {
    fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn step(&mut self, batch: &Batch, learning_rate: f32) -> Result<StepOutput> {
        let (loss_no_reg, accuracy) = self.backprop(batch)?;
        let loss = loss_no_reg + self.penalty();
        let grad_norm = self.grad.iter().map(|g| g * g).sum::<f32>().sqrt();

        self.optimizer.set_learning_rate(learning_rate);
        self.optimizer.update_params(&self.grad, &mut self.params)?;

        Ok(StepOutput {
            loss,
            accuracy,
            loss_no_reg,
            updates: vec![("learning_rate", learning_rate), ("grad_norm", grad_norm)],
        })
    }

    fn evaluate(&self, batch: &Batch) -> Result<EvalOutput> {
        if batch.is_empty() {
            return Err(MlErr::EmptyBatch.into());
        }

        let logits = self.network.predict(&self.params, batch.x.view())?;
        let loss_no_reg = self.loss_fn.loss(logits.view(), batch.y.view());

        Ok(EvalOutput {
            accuracy: accuracy(logits.view(), batch.y.view()),
            loss: loss_no_reg + self.penalty(),
            loss_no_reg,
        })
    }

    fn gradients(&mut self, batch: &Batch) -> Result<&[f32]> {
        self.backprop(batch)?;
        Ok(&self.grad)
    }

    fn last_gradients(&self) -> &[f32] {
        &self.grad
    }
}
