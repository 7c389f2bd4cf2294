use std::{fs, path::Path};

use log::{info, warn};

use crate::{
    Result, TrainErr,
    cadence::Cadences,
    config::TrainConfig,
    data::{BatchSource, InMemoryDataset, load_csv},
    export::{self, FINAL_PARAMS_FILE},
    model::{ClassifierBuilder, Model, ParamLayout},
    snapshot::SnapshotSet,
    telemetry::JsonlSink,
    training::{RunPlan, RunSummary, TrainingLoop},
};

/// Loads the configured dataset and splits the validation samples off its front.
///
/// # Errors
/// A config error if no `data_path` is set, plus whatever reading the file fails with.
pub fn load_dataset(cfg: &TrainConfig) -> Result<(InMemoryDataset, InMemoryDataset)> {
    let path = cfg
        .data_path
        .as_ref()
        .ok_or_else(|| TrainErr::Config("data_path is required".into()))?;

    let dataset = load_csv(path, cfg.class_label_count, cfg.rescale)?;
    let validation_count = (dataset.len() as f32 * cfg.validation_split).round() as usize;
    let (train, validation) = dataset.split(validation_count)?;

    info!(
        "loaded {}: {} training and {} validation samples of {} features",
        path.display(),
        train.len(),
        validation.len(),
        train.input_dim()
    );

    Ok((train, validation))
}

/// Logs every parameter's name and shape followed by the total count.
pub fn log_weights(layout: &ParamLayout) {
    for spec in layout.params() {
        info!("{:<24} {:?}", spec.name, spec.shape);
    }
    info!("total trainable parameters: {}", layout.len());
}

/// Runs a whole training session: data, model, stores, loop and export.
///
/// Every configuration check runs before the output directory is touched. Stores and the
/// telemetry sink are released even if the loop fails.
///
/// # Errors
/// Any failure of the run, the first one wins.
pub fn run(cfg: &TrainConfig) -> Result<RunSummary> {
    cfg.validate()?;

    let (train, validation) = load_dataset(cfg)?;
    let mut model = ClassifierBuilder::new().build(cfg, train.input_dim())?;
    log_weights(model.layout());

    let plan = RunPlan::new(train.len(), cfg.train_batch_size, cfg.num_epochs)?;
    let cadences = Cadences::from_config(cfg)?;

    let mut training = TrainingLoop::new(cfg, train.len())?;
    training.check_eval(validation.len())?;

    let output_dir = cfg.output_dir();
    let capture = cfg.save_weights || cfg.save_training_grads;
    if output_dir.is_none() {
        if capture {
            return Err(TrainErr::Config(
                "saving weights or gradients needs an output_dir or RESULTS_DIR".into(),
            ));
        }
        warn!("no output directory configured, nothing will be written");
    }

    let mut sink = None;
    let mut snapshots = None;
    if let Some(dir) = &output_dir {
        fs::create_dir_all(dir)?;
        sink = Some(JsonlSink::create(dir)?);

        if capture {
            let weight_rows = cfg.save_weights.then(|| plan.weight_rows(cadences.snapshot));
            let grad_rows = cfg.save_training_grads.then(|| plan.grad_rows());
            snapshots = Some(SnapshotSet::create(
                dir,
                model.layout(),
                weight_rows,
                grad_rows,
            )?);
        }
    }

    if let Some(set) = snapshots.as_mut() {
        training = training.with_snapshots(set);
    }
    if let Some(sink) = sink.as_mut() {
        training = training.with_sink(sink);
    }

    let result = training.run(&mut model, &train, &validation);
    let closed = snapshots.map_or(Ok(()), SnapshotSet::close);
    let summary = result?;
    closed?;

    if let Some(dir) = &output_dir {
        export_final(dir, &model, summary.iterations)?;
    }

    info!(
        "finished {} iterations in {:.2} s",
        summary.iterations,
        summary.elapsed.as_secs_f64()
    );

    Ok(summary)
}

fn export_final<M: Model + ?Sized>(dir: &Path, model: &M, iterations: usize) -> Result<()> {
    export::save_params(
        &dir.join(FINAL_PARAMS_FILE),
        model.layout(),
        model.params(),
        iterations,
    )
}
