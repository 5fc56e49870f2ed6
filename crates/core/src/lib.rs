pub mod config;
pub mod dataset;
pub mod error;
pub mod task;

pub use config::ExperimentConfig;
pub use dataset::{generate, Chunk, Dataset, DatasetShape};
pub use error::*;
pub use task::{CostModel, Task, Workload};
