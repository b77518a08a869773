//! crn-expr: arithmetic expressions for rate laws.
//!
//! Provides:
//! - Tokenizer and precedence parser for the infix grammar
//!   (`+ - * / ^ %`, unary minus, function calls, parentheses)
//! - Immutable element tree with a re-parseable `Display`
//! - Evaluation against a `SymbolEvaluator`
//! - Exact symbolic partial derivatives with folding builders

pub mod builder;
pub mod deriv;
pub mod element;
pub mod error;
pub mod eval;
pub mod expression;

mod display;
mod lexer;
mod parser;

// Re-exports
pub use element::{BinaryOp, Element, Function, Symbol};
pub use error::{ExprError, ExprResult};
pub use eval::{DepthGuard, MapEvaluator, MAX_SYMBOL_DEPTH, SymbolEvaluator};
pub use expression::Expression;
