use ndarray::Array2;

/// A mini-batch: one sample per row of `x` and its one-hot label in the same row of `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub x: Array2<f32>,
    pub y: Array2<f32>,
}

impl Batch {
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Self {
        Self { x, y }
    }

    /// The amount of samples in the batch.
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
