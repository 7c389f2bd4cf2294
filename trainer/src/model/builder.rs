use std::{cell::RefCell, rc::Rc};

use log::info;
use machine_learning::{
    arch::{Model as Network, Sequential, activations::ActFn, layers::Dense},
    initialization,
    optimization::{Adam, GradientDescentWithMomentum, Optimizer, RmsProp},
};
use rand::{SeedableRng, rngs::StdRng};

use super::{Classifier, ParamLayout, ParamSpec};
use crate::{
    Result, TrainErr,
    config::{ArchKind, OptimizerKind, TrainConfig},
};

const FC_HIDDEN: [usize; 2] = [100, 50];

const RMSPROP_DECAY: f32 = 0.9;
const RMSPROP_EPSILON: f32 = 1e-10;
const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-8;

/// Builds `Classifier`s following a `TrainConfig`.
#[derive(Default)]
pub struct ClassifierBuilder;

impl ClassifierBuilder {
    /// Creates a new `ClassifierBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Classifier` with freshly initialized parameters.
    ///
    /// # Arguments
    /// * `cfg` - The run's configuration.
    /// * `input_dim` - The amount of features per sample.
    ///
    /// # Errors
    /// A config error for architectures without a dense implementation.
    pub fn build(&self, cfg: &TrainConfig, input_dim: usize) -> Result<Classifier> {
        let network = self.resolve_arch(cfg, input_dim)?;
        let layout = self.resolve_layout(&network);
        let params = self.resolve_params(cfg, &network)?;
        let optimizer = self.resolve_optimizer(cfg, network.size());

        Classifier::new(network, params, optimizer, cfg.l2, layout)
    }

    fn resolve_arch(&self, cfg: &TrainConfig, input_dim: usize) -> Result<Sequential> {
        if input_dim == 0 {
            return Err(TrainErr::Config("samples have no features".into()));
        }

        let hidden = match cfg.arch {
            ArchKind::Basic => Vec::new(),
            ArchKind::Fc => FC_HIDDEN.to_vec(),
            ArchKind::FcCust => vec![cfg.hidden_units; cfg.num_layers],
            other => {
                return Err(TrainErr::Config(format!(
                    "architecture {other:?} is not supported, use basic, fc or fc_cust"
                )));
            }
        };

        let dims: Vec<usize> = std::iter::once(input_dim)
            .chain(hidden)
            .chain(std::iter::once(cfg.class_label_count))
            .collect();

        let last = dims.len() - 2;
        let layers = dims.windows(2).enumerate().map(|(i, w)| {
            let act_fn = (i != last).then(ActFn::relu);
            Dense::new((w[0], w[1]), act_fn)
        });

        Ok(Sequential::new(layers))
    }

    fn resolve_layout(&self, network: &Sequential) -> ParamLayout {
        let params = network
            .layers()
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| {
                let (fan_in, fan_out) = layer.dim();
                [
                    ParamSpec::new(format!("dense_{i}/kernel"), vec![fan_in, fan_out]),
                    ParamSpec::new(format!("dense_{i}/bias"), vec![fan_out]),
                ]
            })
            .collect();

        ParamLayout::new(params)
    }

    fn resolve_params(&self, cfg: &TrainConfig, network: &Sequential) -> Result<Vec<f32>> {
        let rng = Rc::new(RefCell::new(self.generate_rng(cfg.init_seed)));
        Ok(initialization::he_normal_zero_bias(network, rng)?)
    }

    fn resolve_optimizer(&self, cfg: &TrainConfig, len: usize) -> Box<dyn Optimizer> {
        info!("using {:?} optimizer, lr = {}", cfg.opt, cfg.lr);

        match cfg.opt {
            OptimizerKind::Sgd => Box::new(GradientDescentWithMomentum::new(len, cfg.lr, cfg.mom)),
            OptimizerKind::Rmsprop => Box::new(RmsProp::new(
                len,
                cfg.lr,
                RMSPROP_DECAY,
                cfg.mom,
                RMSPROP_EPSILON,
            )),
            OptimizerKind::Adam => Box::new(Adam::new(
                len,
                cfg.lr,
                ADAM_BETA1,
                ADAM_BETA2,
                ADAM_EPSILON,
            )),
        }
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
