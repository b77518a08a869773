use crn_expr::{BinaryOp, Element, Expression, Function, MapEvaluator};
use proptest::prelude::*;

const H: f64 = 1e-5;

fn central_difference(e: &Expression, x: f64, y: f64) -> f64 {
    let at = |x: f64| {
        let ev = MapEvaluator::new().with_value("x", x).with_value("y", y);
        e.evaluate(&ev).unwrap()
    };
    (at(x + H) - at(x - H)) / (2.0 * H)
}

fn symbolic(e: &Expression, x: f64, y: f64) -> f64 {
    let ev = MapEvaluator::new().with_value("x", x).with_value("y", y);
    e.partial_derivative("x", &ev).unwrap().evaluate(&ev).unwrap()
}

fn close(numeric: f64, exact: f64) -> bool {
    (numeric - exact).abs() <= 1e-5 * (1.0 + exact.abs())
}

/// One expression per differentiable element code, with arguments kept
/// inside each function's domain for x in [-1.5, 1.5] and y in [0.5, 2].
const CASES: &[&str] = &[
    "3 * x + y",
    "x - y * x",
    "-x",
    "x * y * x",
    "(x + 3) / (y + x * x)",
    "x ^ 3",
    "y ^ x",
    "(x * x + 1) ^ (x + 2)",
    "exp(2 * x)",
    "log(x * x + y)",
    "sin(x * y)",
    "cos(x ^ 2)",
    "tan(x / 2)",
    "asin(x / 2)",
    "acos(x / 2)",
    "atan(3 * x)",
    "sqrt(x * x + y)",
];

proptest! {
    #[test]
    fn derivative_matches_central_difference(x in -1.5f64..1.5, y in 0.5f64..2.0) {
        for text in CASES {
            let e = Expression::parse(text).unwrap();
            let numeric = central_difference(&e, x, y);
            let exact = symbolic(&e, x, y);
            prop_assert!(close(numeric, exact), "{text} at x={x}, y={y}: {numeric} vs {exact}");
        }
    }

    #[test]
    fn random_smooth_trees_differentiate(root in smooth_tree(), x in -1.0f64..1.0, y in 0.5f64..2.0) {
        let e = Expression::from_element(root);
        let numeric = central_difference(&e, x, y);
        let exact = symbolic(&e, x, y);
        prop_assume!(numeric.is_finite() && exact.is_finite() && exact.abs() < 1e6);
        prop_assert!(close(numeric, exact), "{e} at x={x}: {numeric} vs {exact}");
    }
}

fn smooth_tree() -> impl Strategy<Value = Element> {
    let leaf = prop_oneof![
        (-1.0f64..1.0).prop_map(Element::Number),
        Just(Element::symbol("x")),
        Just(Element::symbol("y")),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Element::Neg(Box::new(e))),
            (
                prop::sample::select(vec![Function::Sin, Function::Cos, Function::Atan]),
                inner.clone()
            )
                .prop_map(|(f, e)| Element::func(f, e)),
            (
                prop::sample::select(vec![BinaryOp::Add, BinaryOp::Subt, BinaryOp::Mult]),
                inner.clone(),
                inner
            )
                .prop_map(|(op, a, b)| Element::binary(op, a, b)),
        ]
    })
}

#[test]
fn derivative_with_respect_to_absent_symbol_is_zero() {
    let e = Expression::parse("k * A * B").unwrap();
    let d = e.partial_derivative("C", &MapEvaluator::new()).unwrap();
    assert_eq!(d.as_number(), Some(0.0));
}

#[test]
fn mass_action_derivative() {
    let e = Expression::parse("k * A^2 * B").unwrap();
    let ev = MapEvaluator::new()
        .with_value("k", 0.5)
        .with_value("A", 4.0)
        .with_value("B", 3.0);
    let d_a = e.partial_derivative("A", &ev).unwrap().evaluate(&ev).unwrap();
    let d_b = e.partial_derivative("B", &ev).unwrap().evaluate(&ev).unwrap();
    assert_eq!(d_a, 0.5 * 2.0 * 4.0 * 3.0);
    assert_eq!(d_b, 0.5 * 16.0);
}
