use std::time::{Duration, Instant};

use crate::model::EvalOutput;

/// The mutable bookkeeping of one run, owned by the training loop.
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Batches trained so far, across epochs.
    pub iteration: usize,
    /// The next free row of the parameter store.
    pub weight_rows: usize,
    pub train_eval: EvalOutput,
    pub test_eval: EvalOutput,
    started: Instant,
}

impl LoopState {
    pub fn new() -> Self {
        Self {
            iteration: 0,
            weight_rows: 0,
            train_eval: EvalOutput::default(),
            test_eval: EvalOutput::default(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The status line printed on the print cadence and once after the run.
    pub fn status_line(&self) -> String {
        format!(
            "{}: train acc = {:.4}, test acc = {:.4}, train loss = {:.4}, test loss = {:.4} ({:.2} s)",
            self.iteration,
            self.train_eval.accuracy,
            self.test_eval.accuracy,
            self.train_eval.loss_no_reg,
            self.test_eval.loss_no_reg,
            self.elapsed().as_secs_f64()
        )
    }
}

impl Default for LoopState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_reports_losses_without_regularization() {
        let mut state = LoopState::new();
        state.iteration = 40;
        state.train_eval = EvalOutput {
            accuracy: 0.5,
            loss: 9.,
            loss_no_reg: 1.25,
        };
        state.test_eval = EvalOutput {
            accuracy: 0.25,
            loss: 9.,
            loss_no_reg: 2.5,
        };

        let line = state.status_line();

        assert!(line.starts_with(
            "40: train acc = 0.5000, test acc = 0.2500, train loss = 1.2500, test loss = 2.5000 ("
        ));
        assert!(line.ends_with(" s)"));
    }
}
