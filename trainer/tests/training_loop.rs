mod common;

use tempfile::tempdir;

use common::{Call, MockModel, MockSource, RecordingSink, call_log};
use trainer::{
    TrainConfig, TrainErr, TrainingLoop,
    cadence::Cadence,
    model::Model,
    snapshot::SnapshotSet,
    training::RunPlan,
};

fn base_cfg() -> TrainConfig {
    TrainConfig {
        class_label_count: 2,
        shuffle: false,
        test_batch_size: 0,
        ..Default::default()
    }
}

#[test]
fn weight_store_is_filled_exactly_to_capacity() {
    let cfg = TrainConfig {
        num_epochs: 2,
        train_batch_size: 10,
        large_batch_size: 100,
        save_every: 5,
        eval_every: 1000,
        save_weights: true,
        ..base_cfg()
    };
    let log = call_log();
    let (train, val) = (
        MockSource::new("train", 100, log.clone()),
        MockSource::new("val", 10, log.clone()),
    );
    let mut model = MockModel::new(log);
    let dir = tempdir().unwrap();

    let plan = RunPlan::new(100, 10, 2).unwrap();
    let rows = plan.weight_rows(Cadence::try_from_interval("save_every", 5).unwrap());
    assert_eq!(plan.total_iterations, 20);
    assert_eq!(rows, 5);

    let mut set = SnapshotSet::create(dir.path(), model.layout(), Some(rows), None).unwrap();
    let summary = TrainingLoop::new(&cfg, 100)
        .unwrap()
        .with_snapshots(&mut set)
        .run(&mut model, &train, &val)
        .unwrap();

    assert_eq!(summary.iterations, 20);
    assert_eq!(summary.weight_rows, 5);

    let store = set.weights().unwrap();
    assert_eq!(store.rows_written(), 5);
    // rows hold the parameters before iterations 0, 5, 10 and 15, then the final ones
    for (row, steps) in [(0, 0.), (1, 5.), (3, 15.), (4, 20.)] {
        let expected: Vec<f64> = (0..6).map(|i| i as f64 + steps).collect();
        assert_eq!(store.read_row(row).unwrap(), expected);
    }

    let params = model.raw_params().to_vec();
    assert!(matches!(
        store.write(5, &params),
        Err(TrainErr::CapacityExceeded {
            row: 5,
            capacity: 5,
            ..
        })
    ));
}

#[test]
fn weight_rows_always_match_the_store_capacity() {
    let dir = tempdir().unwrap();

    for batches in [1, 2, 3, 7] {
        for epochs in [1, 2, 3] {
            for every in [1, 2, 3, 4, 5, 7, 50] {
                let cfg = TrainConfig {
                    num_epochs: epochs,
                    train_batch_size: 2,
                    large_batch_size: 2,
                    save_every: every,
                    eval_every: 1000,
                    save_weights: true,
                    ..base_cfg()
                };
                let n = batches * 2;
                let log = call_log();
                let (train, val) = (
                    MockSource::new("train", n, log.clone()),
                    MockSource::new("val", 2, log.clone()),
                );
                let mut model = MockModel::new(log);

                let plan = RunPlan::new(n, 2, epochs).unwrap();
                let cadence = Cadence::try_from_interval("save_every", every).unwrap();
                let rows = plan.weight_rows(cadence);
                let total = batches * epochs;
                assert_eq!(rows, total.div_ceil(every) + 1);

                let case = dir.path().join(format!("{batches}_{epochs}_{every}"));
                let mut set =
                    SnapshotSet::create(&case, model.layout(), Some(rows), None).unwrap();
                let summary = TrainingLoop::new(&cfg, n)
                    .unwrap()
                    .with_snapshots(&mut set)
                    .run(&mut model, &train, &val)
                    .unwrap();

                let store = set.weights().unwrap();
                assert_eq!(
                    summary.weight_rows,
                    store.capacity(),
                    "{batches}x{epochs}, every {every}"
                );
                assert_eq!(store.rows_written(), store.capacity());
            }
        }
    }
}

#[test]
fn batch_body_runs_in_fixed_order() {
    let cfg = TrainConfig {
        num_epochs: 1,
        train_batch_size: 4,
        large_batch_size: 8,
        print_every: 1,
        eval_every: 1,
        log_every: 1,
        save_every: 1,
        lr: 0.5,
        ..base_cfg()
    };
    let log = call_log();
    let (train, val) = (
        MockSource::new("train", 8, log.clone()),
        MockSource::new("val", 2, log.clone()),
    );
    let mut model = MockModel::new(log.clone());
    let mut sink = RecordingSink::new(log.clone());
    let dir = tempdir().unwrap();
    let mut set = SnapshotSet::create(dir.path(), model.layout(), Some(3), Some(2)).unwrap();

    TrainingLoop::new(&cfg, 8)
        .unwrap()
        .with_snapshots(&mut set)
        .with_sink(&mut sink)
        .run(&mut model, &train, &val)
        .unwrap();

    let scalar = |tag: &str, step| Call::Scalar(tag.to_string(), step);
    let evals = |step| {
        vec![
            Call::Gather("train", 8),
            Call::Evaluate(8),
            scalar("eval_train_acc", step),
            scalar("eval_train_loss", step),
            scalar("eval_train_loss_no_reg", step),
            Call::Gather("val", 2),
            Call::Evaluate(2),
            scalar("eval_test_acc", step),
            scalar("eval_test_loss", step),
            scalar("eval_test_loss_no_reg", step),
        ]
    };

    let mut expected = Vec::new();
    for it in 0..2 {
        expected.push(Call::Params);
        expected.extend(evals(it));
        expected.extend([
            Call::Gather("train", 4),
            Call::Step(0.5),
            scalar("train_step_acc", it),
            scalar("train_step_loss", it),
            scalar("train_step_learning_rate", it),
            Call::LastGradients,
        ]);
    }
    expected.push(Call::Params);
    expected.extend(evals(2));

    assert_eq!(*log.borrow(), expected);
}

#[test]
fn gradients_are_captured_every_iteration() {
    let cfg = TrainConfig {
        num_epochs: 3,
        train_batch_size: 2,
        large_batch_size: 4,
        save_training_grads: true,
        ..base_cfg()
    };
    let log = call_log();
    let (train, val) = (
        MockSource::new("train", 4, log.clone()),
        MockSource::new("val", 2, log.clone()),
    );
    let mut model = MockModel::new(log);
    let dir = tempdir().unwrap();
    let mut set = SnapshotSet::create(dir.path(), model.layout(), None, Some(6)).unwrap();

    TrainingLoop::new(&cfg, 4)
        .unwrap()
        .with_snapshots(&mut set)
        .run(&mut model, &train, &val)
        .unwrap();

    let store = set.grads().unwrap();
    assert_eq!(store.rows_written(), 6);
    for row in 0..6 {
        assert_eq!(store.read_row(row).unwrap(), vec![(row + 1) as f64; 6]);
    }
}

#[test]
fn learning_rate_decays_at_listed_epochs_only() {
    let cfg = TrainConfig {
        num_epochs: 12,
        train_batch_size: 4,
        large_batch_size: 4,
        lr: 1.,
        decay_schedule: "5,10".into(),
        ..base_cfg()
    };
    let log = call_log();
    let (train, val) = (
        MockSource::new("train", 4, log.clone()),
        MockSource::new("val", 2, log.clone()),
    );
    let mut model = MockModel::new(log.clone());

    let summary = TrainingLoop::new(&cfg, 4)
        .unwrap()
        .run(&mut model, &train, &val)
        .unwrap();

    let rates: Vec<f32> = log
        .borrow()
        .iter()
        .filter_map(|c| match c {
            Call::Step(lr) => Some(*lr),
            _ => None,
        })
        .collect();

    assert_eq!(rates.len(), 12);
    for (epoch, rate) in rates.iter().enumerate() {
        let expected = match epoch {
            0..5 => 1.,
            5..10 => 0.1,
            _ => 0.01,
        };
        assert!((*rate - expected).abs() < 1e-6, "epoch {epoch}: {rate}");
    }
    assert!((summary.learning_rate - 0.01).abs() < 1e-6);
}

#[test]
fn non_finite_loss_stops_the_run() {
    let cfg = TrainConfig {
        num_epochs: 2,
        train_batch_size: 2,
        large_batch_size: 4,
        ..base_cfg()
    };
    let log = call_log();
    let (train, val) = (
        MockSource::new("train", 4, log.clone()),
        MockSource::new("val", 2, log.clone()),
    );
    let mut model = MockModel::new(log.clone()).diverging_at(3);

    let result = TrainingLoop::new(&cfg, 4)
        .unwrap()
        .run(&mut model, &train, &val);

    assert!(matches!(
        result,
        Err(TrainErr::NumericDivergence { iteration: 3, .. })
    ));
    let steps = log
        .borrow()
        .iter()
        .filter(|c| matches!(c, Call::Step(_)))
        .count();
    assert_eq!(steps, 4);
}

#[test]
fn oversized_eval_batch_is_a_config_error() {
    let cfg = TrainConfig {
        train_batch_size: 2,
        large_batch_size: 8,
        ..base_cfg()
    };
    let log = call_log();
    let (train, val) = (
        MockSource::new("train", 4, log.clone()),
        MockSource::new("val", 2, log.clone()),
    );
    let mut model = MockModel::new(log);

    assert!(matches!(
        TrainingLoop::new(&cfg, 4)
            .unwrap()
            .run(&mut model, &train, &val),
        Err(TrainErr::Config(_))
    ));
}
