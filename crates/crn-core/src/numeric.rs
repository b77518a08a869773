use crate::CrnError;

/// Floating point type used for times and populations.
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CrnError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CrnError::NonFinite { what, value: v })
    }
}

/// True when `v` is too large for adding or removing a single molecule
/// to change its value.
pub fn exceeds_integer_precision(v: Real) -> bool {
    v > 1.0 && v - 1.0 == v
}

/// Falling factorial `n (n-1) ... (n-k+1)`; zero when `n < k`.
pub fn falling_factorial(n: Real, k: u32) -> Real {
    if n < k as Real {
        return 0.0;
    }
    let mut acc = 1.0;
    for i in 0..k {
        acc *= n - i as Real;
    }
    acc
}

/// Sum of a slice, accumulated from the back like the propensity sweeps.
pub fn sum(values: &[Real]) -> Real {
    values.iter().rev().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn integer_precision_limit() {
        assert!(!exceeds_integer_precision(1.0e6));
        assert!(exceeds_integer_precision(1.0e17));
        assert!(!exceeds_integer_precision(0.5));
    }

    #[test]
    fn falling_factorial_small_cases() {
        assert_eq!(falling_factorial(5.0, 0), 1.0);
        assert_eq!(falling_factorial(5.0, 1), 5.0);
        assert_eq!(falling_factorial(5.0, 2), 20.0);
        assert_eq!(falling_factorial(1.0, 2), 0.0);
        assert_eq!(falling_factorial(2.0, 2), 2.0);
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn falling_factorial_never_exceeds_power(n in 0u32..500, k in 1u32..5) {
                let x = n as Real;
                let ff = falling_factorial(x, k);
                prop_assert!(ff >= 0.0);
                prop_assert!(ff <= x.powi(k as i32) + 1e-9);
            }
        }
    }
}
