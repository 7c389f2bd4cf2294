mod chained;
mod constant;
mod param_gen;
mod random;

pub use chained::ChainedParamGen;
pub use constant::ConstParamGen;
pub use param_gen::ParamGen;
pub use random::RandParamGen;

use std::{cell::RefCell, rc::Rc};

use rand::Rng;

use crate::{MlErr, Result, arch::Sequential};

/// Builds the initial flat parameter buffer of `model`: he-normal kernels and zero biases.
///
/// # Arguments
/// * `model` - The model whose layout drives the generation.
/// * `rng` - The source of randomness, shared by every layer's generator.
///
/// # Errors
/// Fails if a layer's fan in makes the distribution invalid.
pub fn he_normal_zero_bias<R: Rng + 'static>(
    model: &Sequential,
    rng: Rc<RefCell<R>>,
) -> Result<Vec<f32>> {
    let mut param_gens: Vec<Box<dyn ParamGen>> = Vec::with_capacity(model.layers().len() * 2);

    for layer in model.layers() {
        let (fan_in, fan_out) = layer.dim();
        let kernel = RandParamGen::kaiming(rng.clone(), layer.kernel_size(), fan_in)?;
        param_gens.push(Box::new(kernel));
        param_gens.push(Box::new(ConstParamGen::new(0., fan_out)));
    }

    let expected = model.layers().iter().map(|l| l.size()).sum();
    let params = ChainedParamGen::new(param_gens)
        .sample(expected)
        .unwrap_or_default();

    if params.len() != expected {
        return Err(MlErr::ExhaustedParamGen {
            got: params.len(),
            expected,
        });
    }

    Ok(params)
}
