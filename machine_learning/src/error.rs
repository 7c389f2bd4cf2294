use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    EmptyBatch,
    InvalidDistribution(String),
    ExhaustedParamGen {
        got: usize,
        expected: usize,
    },
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::EmptyBatch => write!(f, "Cannot compute over an empty batch"),
            MlErr::InvalidDistribution(e) => write!(f, "Invalid parameter distribution: {e}"),
            MlErr::ExhaustedParamGen { got, expected } => write!(
                f,
                "The parameter generator ran out after {got} of {expected} parameters"
            ),
        }
    }
}

impl Error for MlErr {}
