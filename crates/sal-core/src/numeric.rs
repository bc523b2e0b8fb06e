use crate::CoreError;

/// Floating point type used throughout the cascade.
pub type Real = f64;

/// Absolute/relative tolerance pair.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Finite and `>= 0`.
pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v < 0.0 {
        return Err(CoreError::Negative { what, value: v });
    }
    Ok(v)
}

/// Replace NaN entries with the previous finite value, leading NaNs with `initial`.
pub fn forward_fill(values: &[Real], initial: Real) -> Vec<Real> {
    let mut last = initial;
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                last
            } else {
                last = v;
                v
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_non_negative_rejects_negative() {
        assert_eq!(ensure_non_negative(0.0, "rate").unwrap(), 0.0);
        assert!(matches!(
            ensure_non_negative(-0.1, "rate"),
            Err(CoreError::Negative { what: "rate", .. })
        ));
        assert!(ensure_non_negative(Real::INFINITY, "rate").is_err());
    }

    #[test]
    fn forward_fill_carries_last_value() {
        let filled = forward_fill(&[Real::NAN, 1.0, Real::NAN, 3.0, Real::NAN], 0.0);
        assert_eq!(filled, vec![0.0, 1.0, 1.0, 3.0, 3.0]);
    }
}
