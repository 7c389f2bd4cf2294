use std::{error::Error, fmt, io};

use machine_learning::MlErr;

/// The trainer's result type.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// Every way a training run can fail. None of them are retried.
#[derive(Debug)]
pub enum TrainErr {
    /// Invalid architecture, malformed decay schedule, zero batch size or interval, etc.
    Config(String),
    CapacityExceeded {
        store: String,
        row: usize,
        capacity: usize,
    },
    RowLengthMismatch {
        store: String,
        got: usize,
        expected: usize,
    },
    NumericDivergence {
        iteration: usize,
        loss: f32,
    },
    /// A batch could not be produced or the dataset could not be parsed.
    Data(String),
    Ml(MlErr),
    /// Storage or output handles could not be created or written.
    Io(io::Error),
    Json(serde_json::Error),
    Export(String),
}

impl fmt::Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::Config(e) => write!(f, "invalid configuration: {e}"),
            TrainErr::CapacityExceeded {
                store,
                row,
                capacity,
            } => write!(
                f,
                "snapshot store {store} is full: row {row} is out of its {capacity} rows"
            ),
            TrainErr::RowLengthMismatch {
                store,
                got,
                expected,
            } => write!(
                f,
                "snapshot store {store} row length mismatch: got {got}, expected {expected}"
            ),
            TrainErr::NumericDivergence { iteration, loss } => {
                write!(f, "training diverged at iteration {iteration}: loss = {loss}")
            }
            TrainErr::Data(e) => write!(f, "data error: {e}"),
            TrainErr::Ml(e) => write!(f, "model error: {e}"),
            TrainErr::Io(e) => write!(f, "io error: {e}"),
            TrainErr::Json(e) => write!(f, "json error: {e}"),
            TrainErr::Export(e) => write!(f, "export error: {e}"),
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::Ml(e) => Some(e),
            TrainErr::Io(e) => Some(e),
            TrainErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrainErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MlErr> for TrainErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<serde_json::Error> for TrainErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
