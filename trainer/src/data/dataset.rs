use ndarray::{Array2, Axis, s};

use super::{Batch, BatchSource};
use crate::{Result, TrainErr};

/// A dataset fully loaded in memory, with one-hot labels.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl InMemoryDataset {
    /// Creates a new `InMemoryDataset`.
    ///
    /// # Errors
    /// A data error if `x` and `y` do not have the same amount of rows.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(TrainErr::Data(format!(
                "got {} samples but {} labels",
                x.nrows(),
                y.nrows()
            )));
        }

        Ok(Self { x, y })
    }

    /// Creates a dataset from integer class labels, one-hot encoding them.
    ///
    /// # Errors
    /// A data error if a label is not below `num_classes` or the row counts differ.
    pub fn from_labels(x: Array2<f32>, labels: &[usize], num_classes: usize) -> Result<Self> {
        let mut y = Array2::zeros((labels.len(), num_classes));

        for (i, &label) in labels.iter().enumerate() {
            if label >= num_classes {
                return Err(TrainErr::Data(format!(
                    "sample {i} has label {label} but there are {num_classes} classes"
                )));
            }
            y[[i, label]] = 1.;
        }

        Self::new(x, y)
    }

    /// The amount of features per sample.
    pub fn input_dim(&self) -> usize {
        self.x.ncols()
    }

    pub fn num_classes(&self) -> usize {
        self.y.ncols()
    }

    /// Splits off the first `validation_count` samples as the validation set.
    ///
    /// # Returns
    /// The `(train, validation)` pair.
    pub fn split(self, validation_count: usize) -> Result<(Self, Self)> {
        let n = self.x.nrows();
        if validation_count > n {
            return Err(TrainErr::Data(format!(
                "cannot take {validation_count} validation samples out of {n}"
            )));
        }

        let validation = Self {
            x: self.x.slice(s![..validation_count, ..]).to_owned(),
            y: self.y.slice(s![..validation_count, ..]).to_owned(),
        };
        let train = Self {
            x: self.x.slice(s![validation_count.., ..]).to_owned(),
            y: self.y.slice(s![validation_count.., ..]).to_owned(),
        };

        Ok((train, validation))
    }
}

impl BatchSource for InMemoryDataset {
    fn len(&self) -> usize {
        self.x.nrows()
    }

    fn gather(&self, indices: &[usize]) -> Result<Batch> {
        if let Some(&i) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(TrainErr::Data(format!(
                "sample {i} is out of a dataset of {} samples",
                self.len()
            )));
        }

        Ok(Batch::new(
            self.x.select(Axis(0), indices),
            self.y.select(Axis(0), indices),
        ))
    }
}
