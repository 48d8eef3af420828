//! Bracketing and open root finders over callables
//!
//! All three are bounded by `max_iter`. Running out of iterations is not a
//! failure: the best estimate so far is returned.

use crate::error::RootFindingError;

/// Derivative magnitude below which a Newton step is refused
pub const MIN_DERIVATIVE: f64 = 1e-15;

/// Bisection on `[a, b]`; requires `f(a) * f(b) <= 0`
pub fn bisection(
    f: impl Fn(f64) -> f64,
    mut a: f64,
    mut b: f64,
    tol: f64,
    max_iter: usize,
) -> Result<f64, RootFindingError> {
    let mut fa = f(a);
    let fb = f(b);
    if fa * fb > 0.0 {
        return Err(RootFindingError::NoSignChange { fa, fb });
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }

    for _ in 0..max_iter {
        let c = (a + b) / 2.0;
        let fc = f(c);
        if fc == 0.0 || (b - a).abs() < tol || fc.abs() < tol {
            return Ok(c);
        }
        if fa * fc < 0.0 {
            b = c;
        } else {
            a = c;
            fa = fc;
        }
    }
    Ok((a + b) / 2.0)
}

/// Newton-Raphson from `x0` with an explicit derivative
pub fn newton(
    f: impl Fn(f64) -> f64,
    df: impl Fn(f64) -> f64,
    x0: f64,
    tol: f64,
    max_iter: usize,
) -> Result<f64, RootFindingError> {
    let mut x = x0;
    for _ in 0..max_iter {
        let fx = f(x);
        if fx.abs() < tol {
            return Ok(x);
        }
        let dfx = df(x);
        if dfx.abs() < MIN_DERIVATIVE {
            return Err(RootFindingError::ZeroDerivative { x });
        }
        let next = x - fx / dfx;
        if (next - x).abs() < tol {
            return Ok(next);
        }
        x = next;
    }
    Ok(x)
}

/// Secant iteration from the two starting points `x0`, `x1`
pub fn secant(
    f: impl Fn(f64) -> f64,
    mut x0: f64,
    mut x1: f64,
    tol: f64,
    max_iter: usize,
) -> Result<f64, RootFindingError> {
    for _ in 0..max_iter {
        let f0 = f(x0);
        let f1 = f(x1);
        if (f1 - f0).abs() < MIN_DERIVATIVE {
            return Err(RootFindingError::StalledSecant { x: x1 });
        }
        let x2 = x1 - f1 * (x1 - x0) / (f1 - f0);
        if (x2 - x1).abs() < tol {
            return Ok(x2);
        }
        x0 = x1;
        x1 = x2;
    }
    Ok(x1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cubic(x: f64) -> f64 {
        x * x * x - 2.0 * x - 5.0
    }

    const ROOT: f64 = 2.094_551_481_542_327;

    #[test]
    fn test_bisection() {
        let x = bisection(cubic, 2.0, 3.0, 1e-12, 200).unwrap();
        assert_abs_diff_eq!(x, ROOT, epsilon = 1e-10);
    }

    #[test]
    fn test_bisection_needs_bracket() {
        let err = bisection(cubic, 3.0, 4.0, 1e-12, 100).unwrap_err();
        assert!(matches!(err, RootFindingError::NoSignChange { .. }));
    }

    #[test]
    fn test_bisection_iteration_cap_returns_midpoint() {
        let x = bisection(cubic, 2.0, 3.0, 0.0, 1).unwrap();
        assert_eq!(x, 2.25);
    }

    #[test]
    fn test_bisection_root_on_endpoint() {
        assert_eq!(bisection(|x| x, 0.0, 1.0, 1e-12, 200).unwrap(), 0.0);
        assert_eq!(bisection(|x| x - 1.0, 0.0, 1.0, 1e-12, 200).unwrap(), 1.0);
        assert_eq!(bisection(|x| x - 0.5, 0.0, 1.0, 0.0, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_newton() {
        let x = newton(cubic, |x| 3.0 * x * x - 2.0, 2.0, 1e-12, 50).unwrap();
        assert_abs_diff_eq!(x, ROOT, epsilon = 1e-10);
    }

    #[test]
    fn test_newton_flat_start() {
        let err = newton(|x| x * x + 1.0, |x| 2.0 * x, 0.0, 1e-12, 50).unwrap_err();
        assert_eq!(err, RootFindingError::ZeroDerivative { x: 0.0 });
    }

    #[test]
    fn test_secant() {
        let x = secant(cubic, 2.0, 3.0, 1e-12, 50).unwrap();
        assert_abs_diff_eq!(x, ROOT, epsilon = 1e-10);
        assert!(matches!(
            secant(|_| 1.0, 0.0, 1.0, 1e-12, 50),
            Err(RootFindingError::StalledSecant { .. })
        ));
    }
}
