mod batch;
mod csv;
mod dataset;
mod source;

pub use batch::Batch;
pub use csv::load_csv;
pub use dataset::InMemoryDataset;
pub use source::BatchSource;
