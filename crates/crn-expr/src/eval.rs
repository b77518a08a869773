//! Evaluation of expression trees against a symbol table.

use std::cell::Cell;
use std::collections::HashMap;

use crate::element::{Element, Symbol};
use crate::error::{ExprError, ExprResult};
use crate::expression::Expression;

/// Maximum nesting of expression-valued symbols before evaluation gives up.
pub const MAX_SYMBOL_DEPTH: usize = 256;

/// Resolves symbol values during evaluation and differentiation.
pub trait SymbolEvaluator {
    /// Current numeric value of `symbol`.
    fn value(&self, symbol: &Symbol) -> ExprResult<f64>;

    /// The defining expression of `symbol`, if its value is an expression.
    ///
    /// Used by differentiation to apply the chain rule through
    /// intermediate expression-valued symbols.
    fn expression(&self, _symbol: &Symbol) -> Option<&Expression> {
        None
    }
}

/// Tracks how deeply expression-valued symbols are being resolved.
///
/// A circular definition (`a = b + 1`, `b = a * 2`) would otherwise recurse
/// without bound; the guard turns it into `ExprError::RecursionLimit`.
#[derive(Debug, Default)]
pub struct DepthGuard {
    depth: Cell<usize>,
}

impl Clone for DepthGuard {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl DepthGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Runs `f` one level deeper, failing once `MAX_SYMBOL_DEPTH` is reached.
    pub fn enter<T>(&self, name: &str, f: impl FnOnce() -> ExprResult<T>) -> ExprResult<T> {
        let depth = self.depth.get();
        if depth >= MAX_SYMBOL_DEPTH {
            return Err(ExprError::RecursionLimit {
                name: name.to_string(),
            });
        }
        self.depth.set(depth + 1);
        let result = f();
        self.depth.set(depth);
        result
    }
}

impl Element {
    pub fn evaluate<E: SymbolEvaluator + ?Sized>(&self, evaluator: &E) -> ExprResult<f64> {
        Ok(match self {
            Element::Number(v) => *v,
            Element::Symbol(s) => evaluator.value(s)?,
            Element::Neg(x) => -x.evaluate(evaluator)?,
            Element::Func(func, x) => func.apply(x.evaluate(evaluator)?),
            Element::Binary(op, a, b) => op.apply(a.evaluate(evaluator)?, b.evaluate(evaluator)?),
        })
    }
}

/// Name-keyed evaluator, mainly for tests and one-off evaluation.
#[derive(Clone, Debug, Default)]
pub struct MapEvaluator {
    numbers: HashMap<String, f64>,
    expressions: HashMap<String, Expression>,
    guard: DepthGuard,
}

impl MapEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set_value(name, value);
        self
    }

    pub fn with_expression(mut self, name: impl Into<String>, expression: Expression) -> Self {
        let name = name.into();
        self.numbers.remove(&name);
        self.expressions.insert(name, expression);
        self
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        self.expressions.remove(&name);
        self.numbers.insert(name, value);
    }
}

impl SymbolEvaluator for MapEvaluator {
    fn value(&self, symbol: &Symbol) -> ExprResult<f64> {
        let name = symbol.name();
        if let Some(v) = self.numbers.get(name) {
            return Ok(*v);
        }
        match self.expressions.get(name) {
            Some(e) => self.guard.enter(name, || e.evaluate(self)),
            None => Err(ExprError::UnboundSymbol {
                name: name.to_string(),
            }),
        }
    }

    fn expression(&self, symbol: &Symbol) -> Option<&Expression> {
        self.expressions.get(symbol.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(text: &str) -> Expression {
        text.parse().unwrap()
    }

    #[test]
    fn evaluates_arithmetic() {
        let ev = MapEvaluator::new().with_value("A", 3.0).with_value("k", 0.5);
        assert_eq!(expr("k * A^2").evaluate(&ev).unwrap(), 4.5);
        assert_eq!(expr("7 % 3").evaluate(&ev).unwrap(), 1.0);
        assert_eq!(expr("-A + 1").evaluate(&ev).unwrap(), -2.0);
        assert_eq!(expr("theta(A - 4)").evaluate(&ev).unwrap(), 0.0);
    }

    #[test]
    fn resolves_expression_valued_symbols() {
        let ev = MapEvaluator::new()
            .with_value("A", 2.0)
            .with_expression("twice", expr("2 * A"));
        assert_eq!(expr("twice + 1").evaluate(&ev).unwrap(), 5.0);
    }

    #[test]
    fn unbound_symbol_is_an_error() {
        let ev = MapEvaluator::new();
        assert_eq!(
            expr("x + 1").evaluate(&ev).unwrap_err(),
            ExprError::UnboundSymbol {
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn circular_definition_hits_recursion_limit() {
        let ev = MapEvaluator::new()
            .with_expression("a", expr("b + 1"))
            .with_expression("b", expr("a * 2"));
        let err = expr("a").evaluate(&ev).unwrap_err();
        assert!(matches!(err, ExprError::RecursionLimit { .. }));
        // The guard unwinds fully after the failure.
        assert_eq!(ev.guard.depth(), 0);
    }
}
