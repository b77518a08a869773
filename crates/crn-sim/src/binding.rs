//! Symbol slots and the evaluator bound expressions run against.
//!
//! Every symbol in a bound expression carries a raw slot number. The
//! `Layout` maps raw numbers onto the four storage areas: dynamic species,
//! other global symbols, the clock, and one reaction's local parameters.

use std::cell::Cell;

use crn_expr::{DepthGuard, ExprError, ExprResult, Expression, Symbol, SymbolEvaluator};
use crn_model::Value;

use crate::error::{SimError, SimResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolSlot {
    /// Index into the dynamic species values.
    Dynamic(usize),
    /// Index into the global symbol values.
    Symbol(usize),
    Time,
    /// Index into the owning reaction's local parameters.
    Local(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub num_dynamic: usize,
    pub num_symbols: usize,
}

impl Layout {
    pub fn encode(self, slot: SymbolSlot) -> usize {
        match slot {
            SymbolSlot::Dynamic(i) => i,
            SymbolSlot::Symbol(i) => self.num_dynamic + i,
            SymbolSlot::Time => self.num_dynamic + self.num_symbols,
            SymbolSlot::Local(i) => self.num_dynamic + self.num_symbols + 1 + i,
        }
    }

    pub fn decode(self, raw: usize) -> SymbolSlot {
        let time = self.num_dynamic + self.num_symbols;
        if raw < self.num_dynamic {
            SymbolSlot::Dynamic(raw)
        } else if raw < time {
            SymbolSlot::Symbol(raw - self.num_dynamic)
        } else if raw == time {
            SymbolSlot::Time
        } else {
            SymbolSlot::Local(raw - time - 1)
        }
    }
}

/// Binds every symbol of `expression`, naming `owner` when a symbol is
/// unknown.
pub(crate) fn bind_expression<F>(expression: &mut Expression, owner: &str, resolve: F) -> SimResult<()>
where
    F: FnMut(&str) -> Option<usize>,
{
    expression.bind(resolve).map_err(|err| match err {
        ExprError::UnboundSymbol { name } => {
            SimError::not_found(format!("symbol \"{name}\" used by \"{owner}\""))
        }
        other => other.into(),
    })
}

pub(crate) fn bind_value<F>(value: &mut Value, owner: &str, resolve: F) -> SimResult<()>
where
    F: FnMut(&str) -> Option<usize>,
{
    match value {
        Value::Expression(e) => bind_expression(e, owner, resolve),
        Value::Number(_) => Ok(()),
    }
}

/// Evaluates bound expressions against a simulator's current state.
///
/// Expression-valued global symbols are cached per state; `cache` is
/// cleared by the owner whenever time or a population changes.
///
/// When `initial` is non-empty a dynamic symbol reads its initial value
/// instead of `dynamic`, evaluating it if it is an expression.
pub struct BoundEvaluator<'a> {
    pub(crate) layout: Layout,
    pub(crate) dynamic: &'a [f64],
    pub(crate) initial: &'a [Value],
    pub(crate) symbols: &'a [Value],
    pub(crate) cache: &'a [Cell<Option<f64>>],
    pub(crate) locals: &'a [Value],
    pub(crate) time: f64,
    pub(crate) guard: &'a DepthGuard,
}

impl BoundEvaluator<'_> {
    pub fn slot_value(&self, slot: SymbolSlot, name: &str) -> ExprResult<f64> {
        match slot {
            SymbolSlot::Dynamic(i) => match self.initial.get(i) {
                Some(Value::Number(v)) => Ok(*v),
                Some(Value::Expression(e)) => self.guard.enter(name, || e.evaluate(self)),
                None => self.dynamic.get(i).copied().ok_or_else(|| unbound(name)),
            },
            SymbolSlot::Time => Ok(self.time),
            SymbolSlot::Symbol(i) => {
                let value = self.symbols.get(i).ok_or_else(|| unbound(name))?;
                match value {
                    Value::Number(v) => Ok(*v),
                    Value::Expression(e) => {
                        if let Some(v) = self.cache.get(i).and_then(Cell::get) {
                            return Ok(v);
                        }
                        let v = self.guard.enter(name, || e.evaluate(self))?;
                        if let Some(cell) = self.cache.get(i) {
                            cell.set(Some(v));
                        }
                        Ok(v)
                    }
                }
            }
            SymbolSlot::Local(i) => match self.locals.get(i).ok_or_else(|| unbound(name))? {
                Value::Number(v) => Ok(*v),
                Value::Expression(e) => self.guard.enter(name, || e.evaluate(self)),
            },
        }
    }
}

fn unbound(name: &str) -> ExprError {
    ExprError::UnboundSymbol {
        name: name.to_string(),
    }
}

impl SymbolEvaluator for BoundEvaluator<'_> {
    fn value(&self, symbol: &Symbol) -> ExprResult<f64> {
        let raw = symbol.slot().ok_or_else(|| unbound(symbol.name()))?;
        self.slot_value(self.layout.decode(raw), symbol.name())
    }

    fn expression(&self, symbol: &Symbol) -> Option<&Expression> {
        let value = match self.layout.decode(symbol.slot()?) {
            SymbolSlot::Symbol(i) => self.symbols.get(i)?,
            SymbolSlot::Local(i) => self.locals.get(i)?,
            SymbolSlot::Dynamic(_) | SymbolSlot::Time => return None,
        };
        value.as_expression()
    }
}
