use std::ops::Range;

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::{Result, TrainErr};

/// A named trainable parameter and its fixed shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// The amount of scalars in the parameter.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Maps a flat parameter (or gradient) buffer into named, shaped parameters.
///
/// The order of the entries is the flattening order and never changes during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamLayout {
    params: Vec<ParamSpec>,
    ranges: Vec<Range<usize>>,
}

impl ParamLayout {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        let mut offset = 0;
        let ranges = params
            .iter()
            .map(|p| {
                let range = offset..offset + p.numel();
                offset = range.end;
                range
            })
            .collect();

        Self { params, ranges }
    }

    /// The total length of a flattened vector.
    pub fn len(&self) -> usize {
        self.ranges.last().map_or(0, |r| r.end)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Iterates `(spec, range)` pairs in flattening order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamSpec, Range<usize>)> {
        self.params.iter().zip(self.ranges.iter().cloned())
    }

    /// Splits a flattened row back into one array per parameter, with its original shape.
    ///
    /// # Errors
    /// A row length mismatch if `row` is not exactly `len()` long.
    pub fn split_and_shape<T: Clone>(&self, row: &[T]) -> Result<Vec<ArrayD<T>>> {
        if row.len() != self.len() {
            return Err(TrainErr::RowLengthMismatch {
                store: "layout".into(),
                got: row.len(),
                expected: self.len(),
            });
        }

        self.iter()
            .map(|(spec, range)| {
                ArrayD::from_shape_vec(IxDyn(&spec.shape), row[range].to_vec())
                    .map_err(|e| TrainErr::Data(format!("cannot shape {}: {e}", spec.name)))
            })
            .collect()
    }
}
