use crn_expr::{BinaryOp, Element, Expression, Function, MapEvaluator};
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = Element> {
    prop_oneof![
        (0.0f64..100.0).prop_map(Element::Number),
        prop::sample::select(vec!["x", "y", "k_1", "A"]).prop_map(Element::symbol),
    ]
}

fn tree() -> impl Strategy<Value = Element> {
    leaf().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Element::Neg(Box::new(e))),
            (prop::sample::select(Function::ALL.to_vec()), inner.clone())
                .prop_map(|(f, e)| Element::func(f, e)),
            (
                prop::sample::select(vec![
                    BinaryOp::Mult,
                    BinaryOp::Add,
                    BinaryOp::Subt,
                    BinaryOp::Div,
                    BinaryOp::Pow,
                    BinaryOp::Mod,
                ]),
                inner.clone(),
                inner
            )
                .prop_map(|(op, a, b)| Element::binary(op, a, b)),
        ]
    })
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

proptest! {
    #[test]
    fn display_then_parse_evaluates_identically(
        root in tree(),
        x in -10.0f64..10.0,
        y in -10.0f64..10.0,
        k in 0.0f64..5.0,
        a in 0.0f64..1000.0,
    ) {
        let original = Expression::from_element(root);
        let text = original.to_string();
        let reparsed = Expression::parse(&text)
            .map_err(|e| TestCaseError::fail(format!("{text}: {e}")))?;

        let ev = MapEvaluator::new()
            .with_value("x", x)
            .with_value("y", y)
            .with_value("k_1", k)
            .with_value("A", a);
        let lhs = original.evaluate(&ev).unwrap();
        let rhs = reparsed.evaluate(&ev).unwrap();
        prop_assert!(same(lhs, rhs), "{text}: {lhs} != {rhs}");

        // A second round trip is textually stable.
        prop_assert_eq!(reparsed.to_string(), Expression::parse(&reparsed.to_string()).unwrap().to_string());
    }
}

#[test]
fn rate_law_round_trip() {
    let text = "Vmax*S/(Km+S) - k2*P^2*exp(-t/tau)";
    let e = Expression::parse(text).unwrap();
    let again = Expression::parse(&e.to_string()).unwrap();
    let ev = MapEvaluator::new()
        .with_value("Vmax", 2.0)
        .with_value("S", 10.0)
        .with_value("Km", 5.0)
        .with_value("k2", 0.01)
        .with_value("P", 3.0)
        .with_value("t", 1.0)
        .with_value("tau", 2.0);
    let expected = 2.0 * 10.0 / 15.0 - 0.01 * 9.0 * (-0.5f64).exp();
    assert!((e.evaluate(&ev).unwrap() - expected).abs() < 1e-12);
    assert_eq!(e.evaluate(&ev).unwrap(), again.evaluate(&ev).unwrap());
}

#[test]
fn non_finite_constants_survive_round_trip() {
    let ev = MapEvaluator::new().with_value("x", 2.0);
    for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
        let e = Expression::from_element(Element::binary(
            BinaryOp::Add,
            Element::symbol("x"),
            Element::Number(value),
        ));
        let text = e.to_string();
        let again = Expression::parse(&text).unwrap();
        assert_eq!(again.symbols().len(), 1, "{text}");
        assert!(same(again.evaluate(&ev).unwrap(), value), "{text}");
    }
}
