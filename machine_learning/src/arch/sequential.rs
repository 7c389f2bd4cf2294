use std::ops::Range;

use ndarray::{Array2, ArrayView2};

use super::{Model, layers::Dense};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Dense>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// The layers of the model, input first.
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// The ranges of the flat parameter buffer that belong to each layer.
    pub fn layer_ranges(&self) -> Vec<Range<usize>> {
        let mut offset = 0;

        self.layers
            .iter()
            .map(|layer| {
                let range = offset..offset + layer.size();
                offset = range.end;
                range
            })
            .collect()
    }

    /// The ranges of the flat parameter buffer that hold kernels (weights, not biases).
    pub fn kernel_ranges(&self) -> Vec<Range<usize>> {
        self.layer_ranges()
            .into_iter()
            .zip(&self.layers)
            .map(|(range, layer)| range.start..range.start + layer.kernel_size())
            .collect()
    }

    fn check_params(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_params("sequential parameters", params.len())?;

        let ranges = self.layer_ranges();
        let mut a = x.to_owned();

        for (layer, range) in self.layers.iter_mut().zip(ranges) {
            a = layer.forward(&params[range], a.view())?;
        }

        Ok(a)
    }

    fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_params("sequential parameters", params.len())?;

        let mut a = x.to_owned();

        for (layer, range) in self.layers.iter().zip(self.layer_ranges()) {
            a = layer.predict(&params[range], a.view())?;
        }

        Ok(a)
    }

    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()> {
        self.check_params("sequential parameters", params.len())?;
        self.check_params("sequential gradient", grad.len())?;

        let ranges = self.layer_ranges();
        let mut d = d;

        for (layer, range) in self.layers.iter().zip(ranges).rev() {
            d = layer.backward(&params[range.clone()], &mut grad[range], d)?;
        }

        Ok(())
    }
}
