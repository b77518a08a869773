use std::fmt;

use crate::element::Element;

/// Operands print bare only when re-parsing cannot regroup them.
fn needs_parens(e: &Element) -> bool {
    match e {
        Element::Symbol(_) | Element::Func(..) => false,
        Element::Number(v) => v.is_finite() && v.is_sign_negative(),
        Element::Neg(_) | Element::Binary(..) => true,
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, e: &Element) -> fmt::Result {
    if needs_parens(e) {
        write!(f, "({e})")
    } else {
        write!(f, "{e}")
    }
}

/// Non-finite values print as the division that produces them.
fn write_number(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("(0.0/0.0)")
    } else if v.is_infinite() {
        let sign = if v < 0.0 { "-" } else { "" };
        write!(f, "({sign}1.0/0.0)")
    } else {
        write!(f, "{v:?}")
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Number(v) => write_number(f, *v),
            Element::Symbol(s) => f.write_str(s.name()),
            Element::Neg(x) => {
                f.write_str("-")?;
                write_operand(f, x)
            }
            Element::Func(func, x) => write!(f, "{}({x})", func.name()),
            Element::Binary(op, a, b) => {
                write_operand(f, a)?;
                write!(f, "{}", op.symbol())?;
                write_operand(f, b)
            }
        }
    }
}
