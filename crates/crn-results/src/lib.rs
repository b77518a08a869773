//! crn-results: simulation output, export and run storage.

pub mod export;
pub mod hash;
pub mod store;
pub mod types;

pub use export::{ResultsFormat, write_csv, write_json, write_results};
pub use hash::compute_run_id;
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid results shape: {what}")]
    InvalidShape { what: String },

    #[error("Unknown results format: {name}")]
    UnknownFormat { name: String },
}
