use log::info;

use crate::{Result, TrainErr, cadence::Cadence};

/// The iteration counts of a run, fixed before the first batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub train_samples: usize,
    pub batch_size: usize,
    pub batches_per_epoch: usize,
    pub num_epochs: usize,
    pub total_iterations: usize,
}

impl RunPlan {
    /// Computes the plan of a run, the samples that do not fill a batch are never trained on.
    ///
    /// # Errors
    /// A config error if not even one batch fits in the training set.
    pub fn new(train_samples: usize, batch_size: usize, num_epochs: usize) -> Result<Self> {
        let batches_per_epoch = train_samples.checked_div(batch_size).unwrap_or(0);
        if batches_per_epoch == 0 {
            return Err(TrainErr::Config(format!(
                "{train_samples} training samples do not fill a batch of {batch_size}"
            )));
        }

        Ok(Self {
            train_samples,
            batch_size,
            batches_per_epoch,
            num_epochs,
            total_iterations: batches_per_epoch * num_epochs,
        })
    }

    /// The rows a parameter store needs: every due iteration plus the final state.
    pub fn weight_rows(&self, snapshot: Cadence) -> usize {
        self.total_iterations.div_ceil(snapshot.every()) + 1
    }

    /// The rows a gradient store needs: one per iteration.
    pub fn grad_rows(&self) -> usize {
        self.total_iterations
    }

    pub fn log(&self) {
        info!(
            "training batch size {}, number of iterations: {} per epoch, {} total",
            self.batch_size, self.batches_per_epoch, self.total_iterations
        );
    }
}
