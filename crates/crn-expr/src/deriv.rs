//! Symbolic partial differentiation.

use crate::builder::{
    add, call, divide, multiply, negate, number, power, square, subtract,
};
use crate::element::{BinaryOp, Element, Function};
use crate::error::{ExprError, ExprResult};
use crate::eval::{MAX_SYMBOL_DEPTH, SymbolEvaluator};

fn not_differentiable(e: &Element) -> Option<&'static str> {
    match e {
        Element::Binary(BinaryOp::Mod, ..) => Some("the modulo division operator"),
        Element::Func(Function::Abs, _) => Some("the abs() function"),
        Element::Func(Function::Floor, _) => Some("the floor() function"),
        Element::Func(Function::Ceil, _) => Some("the ceil() function"),
        Element::Func(Function::Theta, _) => Some("the theta() function"),
        _ => None,
    }
}

impl Element {
    /// Partial derivative with respect to the symbol named `wrt`.
    ///
    /// Symbols whose value is itself an expression (per `evaluator`) are
    /// differentiated through; any other symbol is a constant.
    pub fn partial_derivative<E: SymbolEvaluator + ?Sized>(
        &self,
        wrt: &str,
        evaluator: &E,
    ) -> ExprResult<Element> {
        derive(self, wrt, evaluator, 0)
    }
}

fn derive<E: SymbolEvaluator + ?Sized>(
    e: &Element,
    wrt: &str,
    ev: &E,
    depth: usize,
) -> ExprResult<Element> {
    if let Some(function) = not_differentiable(e) {
        return Err(ExprError::NotDifferentiable { function });
    }

    Ok(match e {
        Element::Number(_) => number(0.0),
        Element::Symbol(s) => {
            if s.name() == wrt {
                number(1.0)
            } else if let Some(defn) = ev.expression(s) {
                if depth >= MAX_SYMBOL_DEPTH {
                    return Err(ExprError::RecursionLimit {
                        name: s.name().to_string(),
                    });
                }
                derive(defn.root(), wrt, ev, depth + 1)?
            } else {
                number(0.0)
            }
        }
        Element::Neg(x) => negate(derive(x, wrt, ev, depth)?),
        Element::Func(function, x) => {
            let dx = derive(x, wrt, ev, depth)?;
            if dx.is_zero() {
                return Ok(number(0.0));
            }
            let x = (**x).clone();
            match function {
                Function::Exp => multiply(dx, call(Function::Exp, x)),
                Function::Log => divide(dx, x),
                Function::Sin => multiply(call(Function::Cos, x), dx),
                Function::Cos => negate(multiply(call(Function::Sin, x), dx)),
                Function::Tan => divide(dx, square(call(Function::Cos, x))),
                Function::Asin => divide(dx, call(Function::Sqrt, subtract(number(1.0), square(x)))),
                Function::Acos => negate(divide(
                    dx,
                    call(Function::Sqrt, subtract(number(1.0), square(x))),
                )),
                Function::Atan => divide(dx, add(number(1.0), square(x))),
                Function::Sqrt => divide(dx, multiply(number(2.0), call(Function::Sqrt, x))),
                Function::Abs | Function::Floor | Function::Ceil | Function::Theta => {
                    return Err(ExprError::NotDifferentiable {
                        function: function.name(),
                    });
                }
            }
        }
        Element::Binary(op, a, b) => {
            let da = derive(a, wrt, ev, depth)?;
            let db = derive(b, wrt, ev, depth)?;
            let (a, b) = ((**a).clone(), (**b).clone());
            match op {
                BinaryOp::Add => add(da, db),
                BinaryOp::Subt => subtract(da, db),
                BinaryOp::Mult => add(multiply(da, b), multiply(a, db)),
                BinaryOp::Div => divide(
                    subtract(multiply(da, b.clone()), multiply(a, db)),
                    square(b),
                ),
                BinaryOp::Pow => derive_power(a, b, da, db),
                BinaryOp::Mod => {
                    return Err(ExprError::NotDifferentiable {
                        function: "the modulo division operator",
                    });
                }
            }
        }
    })
}

/// d(x^y) = x^(y-1) * (y' * x * ln(x) + x' * y)
fn derive_power(x: Element, y: Element, dx: Element, dy: Element) -> Element {
    match (dx.is_zero(), dy.is_zero()) {
        (true, true) => number(0.0),
        (false, true) => {
            let reduced = power(x, subtract(y.clone(), number(1.0)));
            multiply(multiply(y, dx), reduced)
        }
        (true, false) => {
            let log_x = call(Function::Log, x.clone());
            multiply(multiply(dy, log_x), power(x, y))
        }
        (false, false) => {
            let log_x = call(Function::Log, x.clone());
            let factor = add(multiply(multiply(dy, x.clone()), log_x), multiply(dx, y.clone()));
            multiply(factor, power(x, subtract(y, number(1.0))))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Expression, ExprError, MapEvaluator};

    fn d(text: &str, wrt: &str) -> String {
        let e: Expression = text.parse().unwrap();
        e.partial_derivative(wrt, &MapEvaluator::new())
            .unwrap()
            .to_string()
    }

    #[test]
    fn simple_rules() {
        assert_eq!(d("3", "x"), "0.0");
        assert_eq!(d("x", "x"), "1.0");
        assert_eq!(d("y", "x"), "0.0");
        assert_eq!(d("k * x", "x"), "k");
        assert_eq!(d("x + y", "x"), "1.0");
        assert_eq!(d("x^3", "x"), "3.0*(x^2.0)");
        assert_eq!(d("exp(x)", "x"), "exp(x)");
        assert_eq!(d("log(x)", "x"), "1.0/x");
    }

    #[test]
    fn constant_inside_non_differentiable_still_fails() {
        let e: Expression = "abs(y) * x".parse().unwrap();
        assert_eq!(
            e.partial_derivative("x", &MapEvaluator::new()).unwrap_err(),
            ExprError::NotDifferentiable {
                function: "the abs() function"
            }
        );
    }

    #[test]
    fn non_differentiable_codes() {
        for text in ["x % 2", "abs(x)", "floor(x)", "ceil(x)", "theta(x)"] {
            let e: Expression = text.parse().unwrap();
            let err = e.partial_derivative("x", &MapEvaluator::new()).unwrap_err();
            assert!(matches!(err, ExprError::NotDifferentiable { .. }), "{text}");
        }
    }

    #[test]
    fn chain_rule_through_expression_symbol() {
        let ev = MapEvaluator::new()
            .with_value("x", 3.0)
            .with_expression("sq", "x * x".parse().unwrap());
        let e: Expression = "2 * sq".parse().unwrap();
        let de = e.partial_derivative("x", &ev).unwrap();
        assert_eq!(de.evaluate(&ev).unwrap(), 12.0);
    }
}
