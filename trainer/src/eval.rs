use log::debug;

use crate::{
    Result, TrainErr,
    data::BatchSource,
    model::{EvalOutput, Model},
    telemetry::TelemetrySink,
};

/// Averages forward-only evaluations over the first `sample_count` samples of `source`.
///
/// Samples are taken in identity order in `floor(sample_count / batch_size)` batches, the
/// remainder is dropped. A `batch_size` of zero evaluates all `sample_count` samples at once.
///
/// # Arguments
/// * `model` - The model to measure, never mutated.
/// * `source` - Where the samples come from.
/// * `sample_count` - How many samples to consider.
/// * `batch_size` - The amount of samples per forward pass.
///
/// # Returns
/// The mean accuracy, loss and loss without regularization over the batches.
///
/// # Errors
/// A config error if not even one batch fits, or whatever the source or model fail with.
pub fn evaluate<M, S>(
    model: &M,
    source: &S,
    sample_count: usize,
    batch_size: usize,
) -> Result<EvalOutput>
where
    M: Model + ?Sized,
    S: BatchSource + ?Sized,
{
    let (num_batches, batch_size) = batch_plan(sample_count, batch_size)?;

    let mut total = EvalOutput::default();
    for i in 0..num_batches {
        let start = i * batch_size;
        let batch = source.range(start..start + batch_size)?;
        let out = model.evaluate(&batch)?;

        total.accuracy += out.accuracy;
        total.loss += out.loss;
        total.loss_no_reg += out.loss_no_reg;
    }

    let n = num_batches as f32;
    debug!(samples = sample_count, batches = num_batches; "evaluated");

    Ok(EvalOutput {
        accuracy: total.accuracy / n,
        loss: total.loss / n,
        loss_no_reg: total.loss_no_reg / n,
    })
}

/// Resolves a zero `batch_size` to the whole set and counts the full batches.
///
/// # Returns
/// The amount of batches and the effective batch size.
///
/// # Errors
/// A config error if not even one batch fits.
pub fn batch_plan(sample_count: usize, batch_size: usize) -> Result<(usize, usize)> {
    let batch_size = if batch_size == 0 {
        sample_count
    } else {
        batch_size
    };

    match sample_count.checked_div(batch_size) {
        Some(n) if n > 0 => Ok((n, batch_size)),
        _ => Err(TrainErr::Config(format!(
            "cannot evaluate {sample_count} samples in batches of {batch_size}"
        ))),
    }
}

/// Evaluates one sample set and reports it under a tag prefix.
#[derive(Debug, Clone)]
pub struct Evaluator {
    prefix: String,
    batch_size: usize,
}

impl Evaluator {
    /// Creates a new `Evaluator` emitting `{prefix}_acc`, `{prefix}_loss` and
    /// `{prefix}_loss_no_reg`.
    pub fn new(prefix: impl Into<String>, batch_size: usize) -> Self {
        Self {
            prefix: prefix.into(),
            batch_size,
        }
    }

    /// Fails with a config error if a set of `sample_count` samples cannot fill one batch.
    pub fn check(&self, sample_count: usize) -> Result<()> {
        batch_plan(sample_count, self.batch_size)
            .map(|_| ())
            .map_err(|e| match e {
                TrainErr::Config(msg) => TrainErr::Config(format!("{}: {msg}", self.prefix)),
                e => e,
            })
    }

    /// Evaluates the whole `source` and records the result at `step` if a sink is given.
    pub fn run<M, S, T>(
        &self,
        model: &M,
        source: &S,
        step: usize,
        sink: Option<&mut T>,
    ) -> Result<EvalOutput>
    where
        M: Model + ?Sized,
        S: BatchSource + ?Sized,
        T: TelemetrySink + ?Sized,
    {
        let out = evaluate(model, source, source.len(), self.batch_size)?;

        if let Some(sink) = sink {
            let p = &self.prefix;
            sink.scalar(&format!("{p}_acc"), out.accuracy, step)?;
            sink.scalar(&format!("{p}_loss"), out.loss, step)?;
            sink.scalar(&format!("{p}_loss_no_reg"), out.loss_no_reg, step)?;
        }

        Ok(out)
    }
}
