use crate::Result;

/// An optimization algorithm that turns gradients into parameter updates.
pub trait Optimizer {
    /// Replaces the step size used by the following updates.
    fn set_learning_rate(&mut self, learning_rate: f32);

    /// The step size currently in use.
    fn learning_rate(&self) -> f32;

    /// Updates `params` in place following the algorithm's learning rule.
    ///
    /// # Arguments
    /// * `grad` - The gradient of the loss with respect to `params`.
    /// * `params` - The parameters that are going to be modified.
    ///
    /// # Errors
    /// Fails if `grad`, `params` and the optimizer's state don't have the same length.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn set_learning_rate(&mut self, learning_rate: f32) {
        (**self).set_learning_rate(learning_rate)
    }

    fn learning_rate(&self) -> f32 {
        (**self).learning_rate()
    }

    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        (**self).update_params(grad, params)
    }
}

pub(super) fn check_lens(grad: usize, params: usize, state: usize) -> Result<()> {
    use crate::MlErr;

    if grad != params {
        return Err(MlErr::SizeMismatch {
            what: "optimizer gradient",
            got: grad,
            expected: params,
        });
    }

    if state != params {
        return Err(MlErr::SizeMismatch {
            what: "optimizer state",
            got: state,
            expected: params,
        });
    }

    Ok(())
}
