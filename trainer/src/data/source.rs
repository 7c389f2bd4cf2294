use std::ops::Range;

use super::Batch;
use crate::{Result, TrainErr};

/// Anything that can hand out mini-batches of a fixed sample set.
pub trait BatchSource {
    /// The total amount of samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collects the samples at `indices`, in that order, into a batch.
    ///
    /// # Errors
    /// A data error if an index is out of range or the samples cannot be produced.
    fn gather(&self, indices: &[usize]) -> Result<Batch>;

    /// The `index`-th batch of `batch_size` samples following `order`.
    ///
    /// # Arguments
    /// * `order` - A permutation of the sample indices.
    /// * `index` - Which batch of the ordering to produce.
    /// * `batch_size` - The amount of samples per batch.
    fn batch(&self, order: &[usize], index: usize, batch_size: usize) -> Result<Batch> {
        let start = index * batch_size;
        let indices = order.get(start..start + batch_size).ok_or_else(|| {
            TrainErr::Data(format!(
                "batch {index} of size {batch_size} is out of an ordering of {} samples",
                order.len()
            ))
        })?;

        self.gather(indices)
    }

    /// The samples in `range`, in identity order.
    fn range(&self, range: Range<usize>) -> Result<Batch> {
        let indices: Vec<usize> = range.collect();
        self.gather(&indices)
    }
}
