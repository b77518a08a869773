//! Expression tree elements.

use std::fmt;

/// A named quantity referenced from an expression.
///
/// A symbol starts unbound. The simulator assigns it a slot in its flat
/// symbol table exactly once; evaluators may then resolve it by slot
/// instead of by name.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    name: String,
    slot: Option<usize>,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_some()
    }

    /// Binds the symbol to `slot`. Returns false if it was already bound.
    pub fn bind(&mut self, slot: usize) -> bool {
        if self.slot.is_some() {
            return false;
        }
        self.slot = Some(slot);
        true
    }

    pub fn unbind(&mut self) {
        self.slot = None;
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One-operand functions available in the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Abs,
    Floor,
    Ceil,
    Sqrt,
    Theta,
}

impl Function {
    pub const ALL: [Function; 13] = [
        Function::Exp,
        Function::Log,
        Function::Sin,
        Function::Cos,
        Function::Tan,
        Function::Asin,
        Function::Acos,
        Function::Atan,
        Function::Abs,
        Function::Floor,
        Function::Ceil,
        Function::Sqrt,
        Function::Theta,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Asin => "asin",
            Function::Acos => "acos",
            Function::Atan => "atan",
            Function::Abs => "abs",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Sqrt => "sqrt",
            Function::Theta => "theta",
        }
    }

    pub fn from_name(name: &str) -> Option<Function> {
        Function::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            Function::Exp => x.exp(),
            Function::Log => x.ln(),
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Asin => x.asin(),
            Function::Acos => x.acos(),
            Function::Atan => x.atan(),
            Function::Abs => x.abs(),
            Function::Floor => x.floor(),
            Function::Ceil => x.ceil(),
            Function::Sqrt => x.sqrt(),
            Function::Theta => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Two-operand operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mult,
    Add,
    Subt,
    Div,
    Pow,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Mult => '*',
            BinaryOp::Add => '+',
            BinaryOp::Subt => '-',
            BinaryOp::Div => '/',
            BinaryOp::Pow => '^',
            BinaryOp::Mod => '%',
        }
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Mult => a * b,
            BinaryOp::Add => a + b,
            BinaryOp::Subt => a - b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Mod => a % b,
        }
    }
}

/// A node of the expression tree.
///
/// Leaves (`Number`, `Symbol`) carry no operands; every other variant
/// owns exactly the operands its operator needs.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Number(f64),
    Symbol(Symbol),
    Neg(Box<Element>),
    Func(Function, Box<Element>),
    Binary(BinaryOp, Box<Element>, Box<Element>),
}

impl Element {
    pub fn symbol(name: impl Into<String>) -> Self {
        Element::Symbol(Symbol::new(name))
    }

    pub fn func(function: Function, operand: Element) -> Self {
        Element::Func(function, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, lhs: Element, rhs: Element) -> Self {
        Element::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Element::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_number() == Some(0.0)
    }

    pub fn is_one(&self) -> bool {
        self.as_number() == Some(1.0)
    }

    /// Calls `f` for every symbol leaf, left to right.
    pub fn visit_symbols<'a>(&'a self, f: &mut dyn FnMut(&'a Symbol)) {
        match self {
            Element::Number(_) => {}
            Element::Symbol(s) => f(s),
            Element::Neg(x) | Element::Func(_, x) => x.visit_symbols(f),
            Element::Binary(_, a, b) => {
                a.visit_symbols(f);
                b.visit_symbols(f);
            }
        }
    }

    pub fn visit_symbols_mut(&mut self, f: &mut dyn FnMut(&mut Symbol)) {
        match self {
            Element::Number(_) => {}
            Element::Symbol(s) => f(s),
            Element::Neg(x) | Element::Func(_, x) => x.visit_symbols_mut(f),
            Element::Binary(_, a, b) => {
                a.visit_symbols_mut(f);
                b.visit_symbols_mut(f);
            }
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            Element::Number(_) | Element::Symbol(_) => 1,
            Element::Neg(x) | Element::Func(_, x) => 1 + x.size(),
            Element::Binary(_, a, b) => 1 + a.size() + b.size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_names_round_trip() {
        for f in Function::ALL {
            assert_eq!(Function::from_name(f.name()), Some(f));
        }
        assert_eq!(Function::from_name("gamma"), None);
    }

    #[test]
    fn theta_is_step_function() {
        assert_eq!(Function::Theta.apply(0.5), 1.0);
        assert_eq!(Function::Theta.apply(0.0), 0.0);
        assert_eq!(Function::Theta.apply(-3.0), 0.0);
    }

    #[test]
    fn symbol_binds_once() {
        let mut s = Symbol::new("A");
        assert!(s.bind(3));
        assert!(!s.bind(4));
        assert_eq!(s.slot(), Some(3));
        s.unbind();
        assert!(!s.is_bound());
    }

    #[test]
    fn visit_symbols_in_order() {
        let e = Element::binary(
            BinaryOp::Mult,
            Element::symbol("k"),
            Element::func(Function::Exp, Element::symbol("A")),
        );
        let mut names = Vec::new();
        e.visit_symbols(&mut |s| names.push(s.name().to_string()));
        assert_eq!(names, vec!["k", "A"]);
        assert_eq!(e.size(), 4);
    }
}
