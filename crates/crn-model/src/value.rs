use std::fmt;

use crn_core::Real;
use crn_expr::{ExprResult, Expression, SymbolEvaluator};

use crate::error::ModelResult;

/// The value of a symbol: a literal number or an expression over other
/// symbols.
///
/// Values are immutable. Simulators that evaluate expression values
/// repeatedly keep their own per-step cache next to the bound arrays.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(Real),
    Expression(Expression),
}

impl Value {
    /// Parses `text`; a bare numeric literal becomes `Value::Number`.
    pub fn parse(text: &str) -> ModelResult<Self> {
        let e = Expression::parse(text)?;
        Ok(match e.as_number() {
            Some(v) => Value::Number(v),
            None => Value::Expression(e),
        })
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Value::Expression(_))
    }

    pub fn as_number(&self) -> Option<Real> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Expression(_) => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Value::Number(_) => None,
            Value::Expression(e) => Some(e),
        }
    }

    pub fn evaluate<E: SymbolEvaluator + ?Sized>(&self, evaluator: &E) -> ExprResult<Real> {
        match self {
            Value::Number(v) => Ok(*v),
            Value::Expression(e) => e.evaluate(evaluator),
        }
    }
}

impl From<Real> for Value {
    fn from(v: Real) -> Self {
        Value::Number(v)
    }
}

impl From<Expression> for Value {
    fn from(e: Expression) -> Self {
        Value::Expression(e)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Expression(e) => write!(f, "{e}"),
        }
    }
}
