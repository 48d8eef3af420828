//! Sandboxed formula evaluator
//!
//! A formula is tokenized, parsed into a typed tree over a closed
//! vocabulary (the coordinate variables, a fixed function list, numeric
//! literals, `pi` and `e`) and evaluated directly. Anything outside that
//! vocabulary is rejected at parse time.
//!
//! Evaluation fails soft: a runtime math error yields `0.0` and is kept
//! for the caller to display, so a sampling loop can keep going.

mod ast;
mod lexer;
mod parser;

use std::cell::Cell;

use tracing::debug;

pub use ast::{BinaryOp, Expr, Function, Function2, Point, Variable};

use crate::error::{EvaluationError, ParseError};

/// A parsed formula, ready to be evaluated at any point
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    root: Expr,
    last_error: Cell<Option<EvaluationError>>,
}

/// Parse `formula`, accepting only the variables named in `bound`.
///
/// Every name in `bound` must belong to the coordinate vocabulary
/// (`x, y, z, r, rho, theta, phi`).
pub fn parse(formula: &str, bound: &[&str]) -> Result<CompiledExpression, ParseError> {
    let mut variables = Vec::with_capacity(bound.len());
    for name in bound {
        let var =
            Variable::from_name(name).ok_or_else(|| ParseError::InvalidVariable((*name).into()))?;
        variables.push(var);
    }
    compile(formula, &variables)
}

/// Parse `formula` with the whole coordinate vocabulary bound
pub fn parse_formula(formula: &str) -> Result<CompiledExpression, ParseError> {
    compile(formula, &Variable::ALL)
}

fn compile(formula: &str, bound: &[Variable]) -> Result<CompiledExpression, ParseError> {
    let tokens = lexer::tokenize(formula)?;
    let root = parser::Parser::new(&tokens, bound).parse()?;
    debug!("Compiled formula '{}' ({} tokens)", formula, tokens.len());

    Ok(CompiledExpression {
        source: formula.to_owned(),
        root,
        last_error: Cell::new(None),
    })
}

impl CompiledExpression {
    /// The formula text this expression was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Expr {
        &self.root
    }

    pub fn references(&self, var: Variable) -> bool {
        self.root.references(var)
    }

    /// Evaluate without recording anything
    pub fn try_evaluate(&self, point: Point) -> Result<f64, EvaluationError> {
        let value = self.root.eval(&point)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvaluationError::NonFinite)
        }
    }

    /// Evaluate at `(x, y, z)` with the caller-supplied `r`.
    ///
    /// Returns `0.0` on a runtime math error and remembers the error.
    pub fn evaluate(&self, x: f64, y: f64, z: f64, r: f64) -> f64 {
        self.evaluate_at(Point::new(x, y, z, r))
    }

    pub fn evaluate_at(&self, point: Point) -> f64 {
        match self.try_evaluate(point) {
            Ok(value) => value,
            Err(e) => {
                self.last_error.set(Some(e));
                0.0
            }
        }
    }

    /// Most recent runtime error, if any evaluation failed since the last `take_error`
    pub fn last_error(&self) -> Option<EvaluationError> {
        self.last_error.get()
    }

    pub fn take_error(&self) -> Option<EvaluationError> {
        self.last_error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_coordinates() {
        let f = parse_formula("x*y+z*r").unwrap();
        assert_eq!(f.evaluate(2.0, 3.0, 0.0, 13f64.sqrt()), 6.0);
    }

    #[test]
    fn test_pythagorean_identity() {
        let f = parse_formula("sin(x)^2+cos(x)^2").unwrap();
        for i in -20..=20 {
            let x = i as f64 * 0.37;
            assert!((f.evaluate(x, 0.0, 0.0, 0.0) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_repeatable() {
        let f = parse_formula("exp(-rho^2) * cos(3theta) + atan2(y, x) / pi").unwrap();
        let p = Point::new(0.3, -0.7, 1.1, 0.5);
        let first = f.evaluate_at(p);
        for _ in 0..10 {
            assert_eq!(f.evaluate_at(p).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn test_implicit_multiplication() {
        let f = parse_formula("2x(y+1)").unwrap_err();
        // `x(` is a call on a variable, not sugar
        assert!(matches!(f, ParseError::UnexpectedToken { .. }));

        let g = parse_formula("2x + (x+1)(x-1) + 3PI").unwrap();
        let x = 1.5;
        let expected = 2.0 * x + (x + 1.0) * (x - 1.0) + 3.0 * std::f64::consts::PI;
        assert!((g.evaluate(x, 0.0, 0.0, 0.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_runtime_error_fails_soft() {
        let f = parse_formula("1/x + ln(y)").unwrap();
        assert_eq!(f.evaluate(0.0, 1.0, 0.0, 0.0), 0.0);
        assert_eq!(f.last_error(), Some(EvaluationError::DivisionByZero));

        // a good sample afterwards does not clear the recorded message
        assert_eq!(f.evaluate(1.0, 1.0, 0.0, 0.0), 1.0);
        assert!(f.take_error().is_some());
        assert!(f.last_error().is_none());

        assert_eq!(f.evaluate(1.0, -1.0, 0.0, 0.0), 0.0);
        assert!(matches!(
            f.last_error(),
            Some(EvaluationError::Domain { function: "ln", .. })
        ));
    }

    #[test]
    fn test_bound_variables() {
        let f = parse("r^2", &["r"]).unwrap();
        assert_eq!(f.evaluate(9.0, 9.0, 9.0, 3.0), 9.0);
        assert!(!f.references(Variable::X));

        assert!(matches!(
            parse("x + r", &["r"]),
            Err(ParseError::UnknownSymbol { .. })
        ));
        assert_eq!(
            parse("1", &["w"]).unwrap_err(),
            ParseError::InvalidVariable("w".into())
        );
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        let err = parse_formula("system(x)").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownSymbol {
                name: "system".into(),
                position: 0
            }
        );
    }

    #[test]
    fn test_heaviside_charge_profile() {
        let q = parse("h(2-r)", &["r", "x"]).unwrap();
        assert_eq!(q.evaluate(0.0, 0.0, 0.0, 1.0), 1.0);
        assert_eq!(q.evaluate(0.0, 0.0, 0.0, 2.5), 0.0);
    }
}
