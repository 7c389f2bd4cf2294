mod loop_;
mod plan;
mod state;

pub use loop_::{RunSummary, TrainingLoop};
pub use plan::RunPlan;
pub use state::LoopState;
