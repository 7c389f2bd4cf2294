use std::{collections::HashMap, fs, path::Path};

use log::info;
use ndarray::{ArrayD, IxDyn};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::{Result, TrainErr, model::ParamLayout};

/// The file the final parameters are exported to inside the output directory.
pub const FINAL_PARAMS_FILE: &str = "final_params.safetensors";

fn export_err(e: impl std::fmt::Display) -> TrainErr {
    TrainErr::Export(e.to_string())
}

/// Writes `params` as one `f32` tensor per layout entry.
///
/// # Arguments
/// * `path` - The file to write, replaced if it exists.
/// * `layout` - The names and shapes of the parameters.
/// * `params` - The flattened parameters.
/// * `iterations` - Recorded in the file's metadata.
///
/// # Errors
/// A row length mismatch if `params` does not follow `layout` and an export error if the
/// tensors cannot be serialized.
pub fn save_params(
    path: &Path,
    layout: &ParamLayout,
    params: &[f32],
    iterations: usize,
) -> Result<()> {
    if params.len() != layout.len() {
        return Err(TrainErr::RowLengthMismatch {
            store: FINAL_PARAMS_FILE.to_string(),
            got: params.len(),
            expected: layout.len(),
        });
    }

    let views = layout
        .iter()
        .map(|(spec, range)| {
            let bytes: &[u8] = bytemuck::cast_slice(&params[range]);
            TensorView::new(Dtype::F32, spec.shape.clone(), bytes)
                .map(|view| (spec.name.clone(), view))
                .map_err(export_err)
        })
        .collect::<Result<Vec<_>>>()?;

    let metadata = HashMap::from([("iterations".to_string(), iterations.to_string())]);
    safetensors::serialize_to_file(views, &Some(metadata), path).map_err(export_err)?;

    info!("exported {} parameters to {}", layout.len(), path.display());
    Ok(())
}

/// Reads back the tensors written by `save_params`, in layout order.
///
/// # Errors
/// An export error if the file is not a valid safetensors file or a parameter is missing or
/// not `f32`.
pub fn load_params(path: &Path, layout: &ParamLayout) -> Result<Vec<ArrayD<f32>>> {
    let bytes = fs::read(path)?;
    let tensors = SafeTensors::deserialize(&bytes).map_err(export_err)?;

    layout
        .iter()
        .map(|(spec, _)| {
            let view = tensors.tensor(&spec.name).map_err(export_err)?;
            if view.dtype() != Dtype::F32 {
                return Err(export_err(format!(
                    "{} is {:?}, expected F32",
                    spec.name,
                    view.dtype()
                )));
            }

            let data: Vec<f32> = bytemuck::pod_collect_to_vec(view.data());
            ArrayD::from_shape_vec(IxDyn(view.shape()), data).map_err(export_err)
        })
        .collect()
}
