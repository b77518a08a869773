//! Tree builders that fold constants and drop identity terms.
//!
//! These keep derivative trees compact: `0*x` becomes `0`, `1*x` becomes
//! `x`, `x+0` becomes `x`, and operations on two numbers are evaluated.

use crate::element::{BinaryOp, Element, Function};

pub fn number(v: f64) -> Element {
    Element::Number(v)
}

pub fn add(a: Element, b: Element) -> Element {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => number(x + y),
        (Some(x), _) if x == 0.0 => b,
        (_, Some(y)) if y == 0.0 => a,
        _ => Element::binary(BinaryOp::Add, a, b),
    }
}

pub fn subtract(a: Element, b: Element) -> Element {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => number(x - y),
        (_, Some(y)) if y == 0.0 => a,
        (Some(x), _) if x == 0.0 => negate(b),
        _ => Element::binary(BinaryOp::Subt, a, b),
    }
}

pub fn multiply(a: Element, b: Element) -> Element {
    if a.is_zero() || b.is_zero() {
        return number(0.0);
    }
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => number(x * y),
        (Some(x), _) if x == 1.0 => b,
        (_, Some(y)) if y == 1.0 => a,
        _ => Element::binary(BinaryOp::Mult, a, b),
    }
}

pub fn divide(a: Element, b: Element) -> Element {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) if y != 0.0 => number(x / y),
        (Some(x), _) if x == 0.0 => number(0.0),
        (_, Some(y)) if y == 1.0 => a,
        _ => Element::binary(BinaryOp::Div, a, b),
    }
}

pub fn power(base: Element, exponent: Element) -> Element {
    match (base.as_number(), exponent.as_number()) {
        (Some(x), Some(y)) => number(x.powf(y)),
        (_, Some(y)) if y == 0.0 => number(1.0),
        (_, Some(y)) if y == 1.0 => base,
        _ => Element::binary(BinaryOp::Pow, base, exponent),
    }
}

pub fn square(a: Element) -> Element {
    power(a, number(2.0))
}

pub fn negate(a: Element) -> Element {
    match a {
        Element::Number(v) => number(-v),
        Element::Neg(inner) => *inner,
        other => Element::Neg(Box::new(other)),
    }
}

pub fn call(function: Function, a: Element) -> Element {
    match a.as_number() {
        Some(x) => number(function.apply(x)),
        None => Element::func(function, a),
    }
}
