//! Model construction errors.

use crn_expr::ExprError;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error("Duplicate {kind}: {name}")]
    Duplicate { kind: &'static str, name: String },

    #[error("Data not found: {what}")]
    DataNotFound { what: String },

    #[error("Expression error: {0}")]
    Expression(#[from] ExprError),
}

impl ModelError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        ModelError::InvalidInput { what: what.into() }
    }
}
