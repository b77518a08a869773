//! Expression error types.

use thiserror::Error;

pub type ExprResult<T> = Result<T, ExprError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Reserved character '{ch}' at position {position}")]
    ReservedCharacter { ch: char, position: usize },

    #[error("Unknown symbol used as function name: {name}")]
    UnknownSymbol { name: String },

    #[error("Unable to compute the derivative of {function}")]
    NotDifferentiable { function: &'static str },

    #[error("Recursion limit exceeded while evaluating symbol: {name}")]
    RecursionLimit { name: String },

    #[error("No value bound for symbol: {name}")]
    UnboundSymbol { name: String },

    #[error("Symbol already bound: {name}")]
    AlreadyBound { name: String },
}

impl ExprError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        ExprError::Parse {
            message: message.into(),
        }
    }
}
