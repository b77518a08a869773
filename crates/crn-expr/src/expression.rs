//! The `Expression` wrapper around a parsed element tree.

use std::fmt;
use std::str::FromStr;

use crate::element::{Element, Symbol};
use crate::error::{ExprError, ExprResult};
use crate::eval::SymbolEvaluator;
use crate::parser;

/// An immutable arithmetic expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    root: Element,
}

impl Expression {
    pub fn parse(text: &str) -> ExprResult<Self> {
        Ok(Self {
            root: parser::parse(text)?,
        })
    }

    pub fn from_element(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }

    pub fn evaluate<E: SymbolEvaluator + ?Sized>(&self, evaluator: &E) -> ExprResult<f64> {
        self.root.evaluate(evaluator)
    }

    pub fn partial_derivative<E: SymbolEvaluator + ?Sized>(
        &self,
        wrt: &str,
        evaluator: &E,
    ) -> ExprResult<Expression> {
        Ok(Self {
            root: self.root.partial_derivative(wrt, evaluator)?,
        })
    }

    /// Distinct symbols referenced by the expression, in first-use order.
    pub fn symbols(&self) -> Vec<&Symbol> {
        let mut out: Vec<&Symbol> = Vec::new();
        self.root.visit_symbols(&mut |s| {
            if !out.iter().any(|seen| seen.name() == s.name()) {
                out.push(s);
            }
        });
        out
    }

    pub fn references(&self, name: &str) -> bool {
        let mut found = false;
        self.root.visit_symbols(&mut |s| found |= s.name() == name);
        found
    }

    /// Resolves every symbol to a slot. Fails on the first name `resolve`
    /// rejects, or if any symbol was already bound.
    pub fn bind<F>(&mut self, mut resolve: F) -> ExprResult<()>
    where
        F: FnMut(&str) -> Option<usize>,
    {
        let mut failure = None;
        self.root.visit_symbols_mut(&mut |s| {
            if failure.is_some() {
                return;
            }
            match resolve(s.name()) {
                Some(slot) if s.bind(slot) => {}
                Some(_) => {
                    failure = Some(ExprError::AlreadyBound {
                        name: s.name().to_string(),
                    })
                }
                None => {
                    failure = Some(ExprError::UnboundSymbol {
                        name: s.name().to_string(),
                    })
                }
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Clears every slot assignment.
    pub fn unbind(&mut self) {
        self.root.visit_symbols_mut(&mut Symbol::unbind);
    }

    pub fn as_number(&self) -> Option<f64> {
        self.root.as_number()
    }
}

impl FromStr for Expression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

impl From<Element> for Expression {
    fn from(root: Element) -> Self {
        Expression::from_element(root)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
