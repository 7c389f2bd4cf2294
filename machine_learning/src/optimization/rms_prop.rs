use super::{Optimizer, optimizer::check_lens};
use crate::Result;

/// RMSProp with momentum:
/// `ms = rho·ms + (1 - rho)·g²; mom = mu·mom + lr·g / sqrt(ms + eps); p -= mom`.
#[derive(Debug)]
pub struct RmsProp {
    learning_rate: f32,
    decay: f32,
    momentum: f32,
    epsilon: f32,
    mean_square: Box<[f32]>,
    moment: Box<[f32]>,
}

impl RmsProp {
    /// Creates a new `RmsProp` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The initial step size.
    /// * `decay`, `momentum`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `RmsProp` instance.
    pub fn new(len: usize, learning_rate: f32, decay: f32, momentum: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            decay,
            momentum,
            epsilon,
            mean_square: vec![1.; len].into_boxed_slice(),
            moment: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for RmsProp {
    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_lens(grad.len(), params.len(), self.moment.len())?;

        let Self {
            learning_rate: lr,
            decay: rho,
            momentum: mu,
            epsilon: eps,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.mean_square.iter_mut())
            .zip(self.moment.iter_mut())
            .for_each(|(((p, g), ms), mom)| {
                *ms = rho * *ms + (1. - rho) * g.powi(2);
                *mom = mu * *mom + lr * g / (*ms + eps).sqrt();
                *p -= *mom;
            });

        Ok(())
    }
}
