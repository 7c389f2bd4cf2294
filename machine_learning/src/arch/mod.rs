pub mod activations;
pub mod layers;
pub mod loss;
mod metrics;
mod model;
mod sequential;

pub use metrics::accuracy;
pub use model::Model;
pub use sequential::Sequential;
