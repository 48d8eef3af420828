//! emfields: numeric engine for exploring classical electrostatics
//!
//! This crate provides:
//! - A sandboxed formula evaluator over the coordinates `x, y, z, r`
//!   (plus derived `rho, theta, phi`)
//! - 1D/2D sample grids with finite-difference calculus and quadrature
//! - Root finders over callables
//! - Gauss's law solvers for spherical, cylindrical and planar symmetry
//! - Scalar and vector field engines on plane slices of 3D space
//!
//! Units are natural: `div E = rho`, `E = -grad V`.

pub mod differential;
pub mod error;
pub mod expression;
pub mod fields;
pub mod gauss;
pub mod grid;
pub mod interpolation;
pub mod quadrature;
pub mod roots;

pub use error::{EvaluationError, ParseError, RootFindingError, SolverError};
pub use expression::{parse, parse_formula, CompiledExpression, Point, Variable};
pub use fields::{
    FieldConfig, Plane, Probe, ScalarField, ScalarFieldEngine, VectorField, VectorFieldEngine,
};
pub use gauss::{
    FieldSample, GaussConfig, GaussSolver, KnownQuantity, QuantityRanges, SymmetryKind,
};
pub use grid::{Grid1D, Grid2D};

/// Parse `formula` and evaluate it once at `(x, y, z)` with `r = sqrt(x² + y²)`.
///
/// Unlike sampling, a runtime math error is returned rather than recorded.
pub fn evaluate_once(formula: &str, x: f64, y: f64, z: f64) -> anyhow::Result<f64> {
    let expr = parse_formula(formula)?;
    let r = (x * x + y * y).sqrt();
    Ok(expr.try_evaluate(Point::new(x, y, z, r))?)
}
