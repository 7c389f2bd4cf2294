use std::time::Duration;

use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{LoopState, RunPlan};
use crate::{
    Result, TrainErr,
    cadence::Cadences,
    config::TrainConfig,
    data::BatchSource,
    eval::Evaluator,
    model::{EvalOutput, Model, StepOutput},
    schedule::LearningRateSchedule,
    snapshot::SnapshotSet,
    telemetry::TelemetrySink,
};

/// What a finished run reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub iterations: usize,
    pub weight_rows: usize,
    pub learning_rate: f32,
    pub train_eval: EvalOutput,
    pub test_eval: EvalOutput,
    pub elapsed: Duration,
}

/// Drives a model through every epoch of a run.
///
/// Each batch goes through the same fixed sequence:
/// - Capture the parameters on the snapshot cadence.
/// - Evaluate the whole training and validation sets on the eval cadence.
/// - Print the status line on the print cadence.
/// - Fetch the batch and apply one optimization step.
/// - Forward the step's scalars on the log cadence.
/// - Capture the step's gradients.
///
/// Snapshot stores and the telemetry sink belong to the caller, who releases them whether the
/// run succeeds or not.
pub struct TrainingLoop<'a> {
    plan: RunPlan,
    schedule: LearningRateSchedule,
    cadences: Cadences,
    shuffle: bool,
    rng: StdRng,
    train_eval: Evaluator,
    test_eval: Evaluator,
    snapshots: Option<&'a mut SnapshotSet>,
    sink: Option<&'a mut dyn TelemetrySink>,
}

impl<'a> TrainingLoop<'a> {
    /// Creates a new `TrainingLoop` for a training set of `train_samples` samples.
    ///
    /// # Errors
    /// A config error if a cadence is zero, the decay schedule is malformed or the training set
    /// does not fill a single batch.
    pub fn new(cfg: &TrainConfig, train_samples: usize) -> Result<Self> {
        let plan = RunPlan::new(train_samples, cfg.train_batch_size, cfg.num_epochs)?;
        let schedule = LearningRateSchedule::parse(cfg.lr, &cfg.decay_schedule)?;
        let cadences = Cadences::from_config(cfg)?;

        let rng = match cfg.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            plan,
            schedule,
            cadences,
            shuffle: cfg.shuffle,
            rng,
            train_eval: Evaluator::new("eval_train", cfg.large_batch_size),
            test_eval: Evaluator::new("eval_test", cfg.test_batch_size),
            snapshots: None,
            sink: None,
        })
    }

    /// Captures parameters and gradients into `snapshots` during the run.
    pub fn with_snapshots(mut self, snapshots: &'a mut SnapshotSet) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Forwards every scalar summary to `sink`.
    pub fn with_sink(mut self, sink: &'a mut dyn TelemetrySink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Checks that both evaluated sets fill at least one evaluation batch.
    ///
    /// # Errors
    /// A config error naming the evaluation that cannot run.
    pub fn check_eval(&self, validation_samples: usize) -> Result<()> {
        self.train_eval.check(self.plan.train_samples)?;
        self.test_eval.check(validation_samples)
    }

    /// Trains `model` on `train` for every planned epoch, consuming the loop.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `train` - The training samples, as many as the plan was made for.
    /// * `validation` - The held out samples, only ever evaluated.
    ///
    /// # Returns
    /// The summary of the finished run.
    ///
    /// # Errors
    /// A config error if the sets do not match the plan or cannot be evaluated, the first
    /// failure of a batch fetch, a step, an evaluation or a store write, and
    /// `NumericDivergence` as soon as a step's loss is not finite.
    pub fn run<M, S, V>(mut self, model: &mut M, train: &S, validation: &V) -> Result<RunSummary>
    where
        M: Model + ?Sized,
        S: BatchSource + ?Sized,
        V: BatchSource + ?Sized,
    {
        if train.len() != self.plan.train_samples {
            return Err(TrainErr::Config(format!(
                "the run was planned for {} training samples but got {}",
                self.plan.train_samples,
                train.len()
            )));
        }
        self.check_eval(validation.len())?;

        self.plan.log();

        let mut state = LoopState::new();
        let mut order: Vec<usize> = (0..train.len()).collect();

        for epoch in 0..self.plan.num_epochs {
            if self.shuffle {
                order.shuffle(&mut self.rng);
            }
            let lr = self.schedule.advance(epoch);

            for i in 0..self.plan.batches_per_epoch {
                let iteration = state.iteration;

                // 1) Parameters before this iteration's update.
                if self.cadences.snapshot.is_due(iteration) {
                    self.capture_weights(&mut state, model.params())?;
                }

                // 2) Full evaluations.
                if self.cadences.eval.is_due(iteration) {
                    self.evaluate(&mut state, &*model, train, validation)?;
                }

                // 3) Status line.
                if self.cadences.print.is_due(iteration) {
                    info!("{}", state.status_line());
                }

                // 4) Fetch and 5) step.
                let batch = train.batch(&order, i, self.plan.batch_size)?;
                let out = model.step(&batch, lr)?;
                if !out.loss.is_finite() {
                    return Err(TrainErr::NumericDivergence {
                        iteration,
                        loss: out.loss,
                    });
                }

                // 6) Step summaries.
                if self.cadences.log.is_due(iteration) {
                    self.log_step(iteration, &out)?;
                }

                // 7) Gradients of this step.
                if let Some(store) = self.snapshots.as_deref_mut().and_then(SnapshotSet::grads) {
                    store.write(iteration, model.last_gradients())?;
                }

                state.iteration += 1;
            }
        }

        self.capture_weights(&mut state, model.params())?;

        if self.cadences.eval.is_due(state.iteration) {
            self.evaluate(&mut state, &*model, train, validation)?;
        }

        info!("{}", state.status_line());

        if let Some(sink) = self.sink.as_deref_mut() {
            sink.flush()?;
        }

        Ok(RunSummary {
            iterations: state.iteration,
            weight_rows: state.weight_rows,
            learning_rate: self.schedule.current(),
            train_eval: state.train_eval,
            test_eval: state.test_eval,
            elapsed: state.elapsed(),
        })
    }

    fn capture_weights(&mut self, state: &mut LoopState, params: &[f32]) -> Result<()> {
        let Some(store) = self.snapshots.as_deref_mut().and_then(SnapshotSet::weights) else {
            return Ok(());
        };

        store.write(state.weight_rows, params)?;
        debug!(row = state.weight_rows, iteration = state.iteration; "captured parameters");
        state.weight_rows += 1;
        Ok(())
    }

    fn evaluate<M, S, V>(
        &mut self,
        state: &mut LoopState,
        model: &M,
        train: &S,
        validation: &V,
    ) -> Result<()>
    where
        M: Model + ?Sized,
        S: BatchSource + ?Sized,
        V: BatchSource + ?Sized,
    {
        let step = state.iteration;
        state.train_eval = self
            .train_eval
            .run(model, train, step, self.sink.as_deref_mut())?;
        state.test_eval = self
            .test_eval
            .run(model, validation, step, self.sink.as_deref_mut())?;

        Ok(())
    }

    fn log_step(&mut self, iteration: usize, out: &StepOutput) -> Result<()> {
        let Some(sink) = self.sink.as_deref_mut() else {
            return Ok(());
        };

        sink.scalar("train_step_acc", out.accuracy, iteration)?;
        sink.scalar("train_step_loss", out.loss, iteration)?;
        for (name, value) in &out.updates {
            sink.scalar(&format!("train_step_{name}"), *value, iteration)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::{data::InMemoryDataset, model::ClassifierBuilder, telemetry::MemorySink};

    fn dataset(n: usize) -> InMemoryDataset {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| ((i + j) % 2) as f32);
        let labels: Vec<usize> = (0..n).map(|i| i % 2).collect();
        InMemoryDataset::from_labels(x, &labels, 2).unwrap()
    }

    fn cfg() -> TrainConfig {
        TrainConfig {
            class_label_count: 2,
            train_batch_size: 4,
            large_batch_size: 8,
            num_epochs: 3,
            eval_every: 2,
            log_every: 1,
            shuffle_seed: Some(3),
            init_seed: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn runs_every_planned_iteration() {
        let cfg = cfg();
        let (train, val) = (dataset(16), dataset(6));
        let mut model = ClassifierBuilder::new().build(&cfg, 2).unwrap();
        let mut sink = MemorySink::new();

        let summary = TrainingLoop::new(&cfg, train.len())
            .unwrap()
            .with_sink(&mut sink)
            .run(&mut model, &train, &val)
            .unwrap();

        assert_eq!(summary.iterations, 12);
        assert_eq!(summary.weight_rows, 0);
        assert_eq!(sink.series("train_step_loss").len(), 12);
        // evaluated at 0, 2, ..., 10 and once more at 12
        assert_eq!(sink.series("eval_test_acc").len(), 7);
        assert_eq!(sink.series("train_step_learning_rate")[0], (0, cfg.lr));
    }

    #[test]
    fn training_set_must_match_the_plan() {
        let cfg = cfg();
        let mut model = ClassifierBuilder::new().build(&cfg, 2).unwrap();

        let training = TrainingLoop::new(&cfg, 16).unwrap();

        assert!(matches!(
            training.run(&mut model, &dataset(12), &dataset(4)),
            Err(TrainErr::Config(_))
        ));
    }

    #[test]
    fn shuffle_seed_makes_runs_reproducible() {
        let cfg = cfg();
        let (train, val) = (dataset(16), dataset(6));

        let params: Vec<Vec<f32>> = (0..2)
            .map(|_| {
                let mut model = ClassifierBuilder::new().build(&cfg, 2).unwrap();
                TrainingLoop::new(&cfg, train.len())
                    .unwrap()
                    .run(&mut model, &train, &val)
                    .unwrap();
                model.params().to_vec()
            })
            .collect();

        assert_eq!(params[0], params[1]);
    }

    #[test]
    fn every_loop_starts_from_the_configured_rate() {
        let cfg = TrainConfig {
            decay_schedule: "1".into(),
            ..cfg()
        };
        let (train, val) = (dataset(16), dataset(6));

        for _ in 0..2 {
            let mut model = ClassifierBuilder::new().build(&cfg, 2).unwrap();
            let mut sink = MemorySink::new();

            let summary = TrainingLoop::new(&cfg, train.len())
                .unwrap()
                .with_sink(&mut sink)
                .run(&mut model, &train, &val)
                .unwrap();

            let rates = sink.series("train_step_learning_rate");
            assert_eq!(rates[0], (0, cfg.lr));
            assert!((summary.learning_rate - cfg.lr * 0.1).abs() < 1e-7);
        }
    }

    #[test]
    fn unevaluable_validation_set_fails_before_any_step() {
        let cfg = TrainConfig {
            test_batch_size: 8,
            ..cfg()
        };
        let mut model = ClassifierBuilder::new().build(&cfg, 2).unwrap();
        let before = model.params().to_vec();

        let training = TrainingLoop::new(&cfg, 16).unwrap();
        assert!(training.check_eval(6).is_err());
        assert!(matches!(
            training.run(&mut model, &dataset(16), &dataset(6)),
            Err(TrainErr::Config(_))
        ));
        assert_eq!(model.params(), before);
    }
}
