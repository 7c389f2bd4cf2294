use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{Result, TrainErr};

/// Environment variable consulted when no `output_dir` is configured.
pub const RESULTS_DIR_VAR: &str = "RESULTS_DIR";

/// The network families the classifier builder knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchKind {
    Basic,
    Fc,
    FcCust,
    Lenet,
    Allcnn,
    Resnet,
    Vgg,
}

/// The optimization algorithm driving each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    Rmsprop,
    Adam,
}

/// Everything a training run needs, read from a JSON file.
///
/// Every field has a default so a config only needs to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    /// CSV file with one sample per line: features followed by an integer class label.
    pub data_path: Option<PathBuf>,
    pub class_label_count: usize,
    pub validation_split: f32,
    /// Multiplies every feature on load.
    pub rescale: f32,

    pub arch: ArchKind,
    pub num_layers: usize,
    pub hidden_units: usize,

    pub opt: OptimizerKind,
    pub lr: f32,
    pub mom: f32,
    pub l2: f32,
    /// Comma separated epochs at which the learning rate is multiplied by 0.1, `-1` for none.
    pub decay_schedule: String,

    pub num_epochs: usize,
    pub train_batch_size: usize,
    pub large_batch_size: usize,
    /// `0` evaluates the whole validation set as one batch.
    pub test_batch_size: usize,

    pub shuffle: bool,
    pub shuffle_seed: Option<u64>,
    pub init_seed: Option<u64>,

    pub print_every: usize,
    pub eval_every: usize,
    pub log_every: usize,
    pub save_every: usize,
    pub save_weights: bool,
    pub save_training_grads: bool,
    pub output_dir: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            class_label_count: 10,
            validation_split: 0.2,
            rescale: 1.,
            arch: ArchKind::Basic,
            num_layers: 3,
            hidden_units: 100,
            opt: OptimizerKind::Sgd,
            lr: 0.01,
            mom: 0.9,
            l2: 0.,
            decay_schedule: "-1".into(),
            num_epochs: 1,
            train_batch_size: 12,
            large_batch_size: 240,
            test_batch_size: 0,
            shuffle: true,
            shuffle_seed: None,
            init_seed: None,
            print_every: 100,
            eval_every: 20,
            log_every: 5,
            save_every: 1,
            save_weights: false,
            save_training_grads: false,
            output_dir: None,
        }
    }
}

impl TrainConfig {
    /// Reads and validates a config from a JSON file.
    ///
    /// # Arguments
    /// * `path` - The path of the JSON file.
    ///
    /// # Errors
    /// Returns an io error if the file cannot be read, a json error if it cannot be parsed and a
    /// config error if a value is out of range.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks every value that would otherwise make the run fail half way through.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("train_batch_size", self.train_batch_size),
            ("large_batch_size", self.large_batch_size),
            ("print_every", self.print_every),
            ("eval_every", self.eval_every),
            ("log_every", self.log_every),
            ("save_every", self.save_every),
            ("hidden_units", self.hidden_units),
        ];

        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(TrainErr::Config(format!("{name} must be positive")));
        }

        if self.class_label_count < 2 {
            return Err(TrainErr::Config(format!(
                "class_label_count must be at least 2, got {}",
                self.class_label_count
            )));
        }

        if !(self.validation_split > 0. && self.validation_split < 1.) {
            return Err(TrainErr::Config(format!(
                "validation_split must be in (0, 1), got {}",
                self.validation_split
            )));
        }

        if !self.lr.is_finite() || self.lr <= 0. {
            return Err(TrainErr::Config(format!(
                "lr must be positive, got {}",
                self.lr
            )));
        }

        if !self.l2.is_finite() || self.l2 < 0. {
            return Err(TrainErr::Config(format!(
                "l2 must be non negative, got {}",
                self.l2
            )));
        }

        if !self.rescale.is_finite() {
            return Err(TrainErr::Config("rescale must be finite".into()));
        }

        Ok(())
    }

    /// The directory every artifact is written to, falling back to `RESULTS_DIR`.
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir
            .clone()
            .or_else(|| env::var_os(RESULTS_DIR_VAR).map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_takes_defaults() {
        let cfg: TrainConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(cfg.opt, OptimizerKind::Sgd);
        assert_eq!(cfg.train_batch_size, 12);
        assert_eq!(cfg.large_batch_size, 240);
        assert_eq!(cfg.decay_schedule, "-1");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn snake_case_variants() {
        let cfg: TrainConfig =
            serde_json::from_str(r#"{"arch": "fc_cust", "opt": "rmsprop"}"#).unwrap();

        assert_eq!(cfg.arch, ArchKind::FcCust);
        assert_eq!(cfg.opt, OptimizerKind::Rmsprop);
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(serde_json::from_str::<TrainConfig>(r#"{"learning_rate": 1}"#).is_err());
    }

    #[test]
    fn zero_interval_is_a_config_error() {
        let cfg = TrainConfig {
            eval_every: 0,
            ..Default::default()
        };

        assert!(matches!(cfg.validate(), Err(TrainErr::Config(_))));
    }

    #[test]
    fn split_must_leave_training_samples() {
        let cfg = TrainConfig {
            validation_split: 1.,
            ..Default::default()
        };

        assert!(cfg.validate().is_err());
    }

    #[test]
    fn split_must_leave_validation_samples() {
        let cfg = TrainConfig {
            validation_split: 0.,
            ..Default::default()
        };

        assert!(matches!(cfg.validate(), Err(TrainErr::Config(_))));
    }
}
