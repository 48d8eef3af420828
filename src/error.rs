//! Error taxonomy for the numeric core
//!
//! Nothing here is fatal: parse failures abort a single formula submission,
//! evaluation failures are recorded per sample, and solver/root-finding
//! failures come back as explicit "no solution" values.

use thiserror::Error;

/// Formula rejected before compilation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("formula is empty")]
    Empty,

    #[error("unknown symbol '{name}' at position {position}")]
    UnknownSymbol { name: String, position: usize },

    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: String, position: usize },

    #[error("unexpected '{found}' at position {position}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        position: usize,
    },

    #[error("formula ended unexpectedly, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("{function}() takes {expected} argument(s), got {found}")]
    WrongArity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("'{0}' cannot be bound as a variable (use x, y, z, r, rho, theta or phi)")]
    InvalidVariable(String),
}

/// Runtime math failure inside an otherwise valid formula.
///
/// `Copy` so a compiled expression can record the last failure without
/// allocating on the evaluation path.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EvaluationError {
    #[error("{function}(x): {reason}")]
    Domain {
        function: &'static str,
        reason: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

/// Iterative root finder gave up without a solution
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RootFindingError {
    #[error("f(a) and f(b) have the same sign ({fa:e}, {fb:e})")]
    NoSignChange { fa: f64, fb: f64 },

    #[error("derivative vanished at x = {x}")]
    ZeroDerivative { x: f64 },

    #[error("secant stalled: f(x0) and f(x1) are equal near x = {x}")]
    StalledSecant { x: f64 },
}

/// Symmetric-geometry solver input that cannot be transformed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("comparison curves are an overlay and cannot drive a transform")]
    ComparisonIsOverlay,

    #[error("need at least {min} sample points, got {found}")]
    TooFewPoints { min: usize, found: usize },

    #[error("sample range must be positive, got {0}")]
    InvalidExtent(f64),

    #[error("clamp limit must be positive, got {0}")]
    InvalidClamp(f64),

    #[error("known samples have {found} points, solver expects {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),
}
