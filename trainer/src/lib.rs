pub mod cadence;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod export;
pub mod model;
pub mod schedule;
pub mod session;
pub mod snapshot;
pub mod telemetry;
pub mod training;

pub use config::TrainConfig;
pub use error::{Result, TrainErr};
pub use training::{RunSummary, TrainingLoop};
