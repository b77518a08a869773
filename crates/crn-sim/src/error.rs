//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while binding a model or running a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Illegal state: {what}")]
    IllegalState { what: String },

    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error("Data not found: {what}")]
    DataNotFound { what: String },

    #[error("Simulation accuracy lost: {what}")]
    Accuracy { what: String },

    #[error("Expression error: {0}")]
    Expression(#[from] crn_expr::ExprError),

    #[error("Model error: {0}")]
    Model(#[from] crn_model::ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn invalid_arg(what: impl Into<String>) -> Self {
        SimError::InvalidArg { what: what.into() }
    }

    pub(crate) fn illegal_state(what: impl Into<String>) -> Self {
        SimError::IllegalState { what: what.into() }
    }

    pub(crate) fn invalid_input(what: impl Into<String>) -> Self {
        SimError::InvalidInput { what: what.into() }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        SimError::DataNotFound { what: what.into() }
    }
}

impl From<crn_core::CrnError> for SimError {
    fn from(e: crn_core::CrnError) -> Self {
        match e {
            crn_core::CrnError::NonFinite { .. } => SimError::Accuracy {
                what: e.to_string(),
            },
        }
    }
}

impl From<crn_results::ResultsError> for SimError {
    fn from(e: crn_results::ResultsError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
