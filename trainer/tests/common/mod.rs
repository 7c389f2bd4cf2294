#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use ndarray::Array2;

use trainer::{
    Result,
    data::{Batch, BatchSource, InMemoryDataset},
    model::{EvalOutput, Model, ParamLayout, ParamSpec, StepOutput},
    telemetry::TelemetrySink,
};

/// Something the loop asked of a mock.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Params,
    Gather(&'static str, usize),
    Evaluate(usize),
    Step(f32),
    Scalar(String, usize),
    LastGradients,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// A model whose parameters all grow by one on every step.
///
/// Starts at `[0, 1, .., 5]` laid out as a `2x2` kernel and a bias of 2. After the `k`-th step
/// every gradient entry is `k`.
pub struct MockModel {
    layout: ParamLayout,
    params: Vec<f32>,
    grads: Vec<f32>,
    steps: usize,
    diverge_at: Option<usize>,
    log: CallLog,
}

impl MockModel {
    pub fn new(log: CallLog) -> Self {
        let layout = ParamLayout::new(vec![
            ParamSpec::new("dense_0/kernel", vec![2, 2]),
            ParamSpec::new("dense_0/bias", vec![2]),
        ]);

        Self {
            params: (0..layout.len()).map(|i| i as f32).collect(),
            grads: vec![0.; layout.len()],
            layout,
            steps: 0,
            diverge_at: None,
            log,
        }
    }

    /// Makes the step at `iteration` report a NaN loss.
    pub fn diverging_at(mut self, iteration: usize) -> Self {
        self.diverge_at = Some(iteration);
        self
    }

    pub fn raw_params(&self) -> &[f32] {
        &self.params
    }
}

impl Model for MockModel {
    fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    fn params(&self) -> &[f32] {
        self.log.borrow_mut().push(Call::Params);
        &self.params
    }

    fn step(&mut self, _: &Batch, learning_rate: f32) -> Result<StepOutput> {
        self.log.borrow_mut().push(Call::Step(learning_rate));

        let iteration = self.steps;
        self.steps += 1;
        self.params.iter_mut().for_each(|p| *p += 1.);
        self.grads.fill(self.steps as f32);

        let loss = if self.diverge_at == Some(iteration) {
            f32::NAN
        } else {
            1. / self.steps as f32
        };

        Ok(StepOutput {
            loss,
            accuracy: 0.5,
            loss_no_reg: loss,
            updates: vec![("learning_rate", learning_rate)],
        })
    }

    fn evaluate(&self, batch: &Batch) -> Result<EvalOutput> {
        self.log.borrow_mut().push(Call::Evaluate(batch.len()));
        Ok(EvalOutput {
            accuracy: 0.5,
            loss: 1.,
            loss_no_reg: 1.,
        })
    }

    fn gradients(&mut self, _: &Batch) -> Result<&[f32]> {
        Ok(&self.grads)
    }

    fn last_gradients(&self) -> &[f32] {
        self.log.borrow_mut().push(Call::LastGradients);
        &self.grads
    }
}

/// An in-memory source that reports every gather under its name.
pub struct MockSource {
    name: &'static str,
    inner: InMemoryDataset,
    log: CallLog,
}

impl MockSource {
    /// `n` samples with the sample index as their single feature.
    pub fn new(name: &'static str, n: usize, log: CallLog) -> Self {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f32);
        let labels: Vec<usize> = (0..n).map(|i| i % 2).collect();

        Self {
            name,
            inner: InMemoryDataset::from_labels(x, &labels, 2).unwrap(),
            log,
        }
    }
}

impl BatchSource for MockSource {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn gather(&self, indices: &[usize]) -> Result<Batch> {
        self.log
            .borrow_mut()
            .push(Call::Gather(self.name, indices.len()));
        self.inner.gather(indices)
    }
}

/// A sink that records every scalar in the shared log.
pub struct RecordingSink {
    log: CallLog,
}

impl RecordingSink {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl TelemetrySink for RecordingSink {
    fn scalar(&mut self, tag: &str, _: f32, step: usize) -> Result<()> {
        self.log
            .borrow_mut()
            .push(Call::Scalar(tag.to_string(), step));
        Ok(())
    }
}
