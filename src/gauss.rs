//! Gauss's law in symmetric geometries
//!
//! Given one of charge density, potential or field sampled along a radial
//! (spherical, cylindrical) or linear (planar) axis, reconstructs the
//! other two. Units are chosen so that `div E = rho` and `E = -dV/dr`.
//!
//! The axis holds `num_points` samples over `[0, max_extent]`. Quantities
//! obtained by dividing by a power of `r` or by differentiating have no
//! usable value at the origin sample; it is filled in by quadratic
//! extrapolation from samples 2, 3 and 4.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SolverError;
use crate::expression::{parse, CompiledExpression};
use crate::grid::Grid1D;

/// Smallest axis that still supports origin extrapolation
pub const MIN_POINTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetryKind {
    Spherical,
    Cylindrical,
    Planar,
}

impl SymmetryKind {
    /// Power of the coordinate in the flux area element (r², r, 1)
    fn area_power(self) -> i32 {
        match self {
            SymmetryKind::Spherical => 2,
            SymmetryKind::Cylindrical => 1,
            SymmetryKind::Planar => 0,
        }
    }

    /// Name of the axis coordinate as a user would type it
    pub fn coordinate(self) -> &'static str {
        match self {
            SymmetryKind::Spherical | SymmetryKind::Cylindrical => "r",
            SymmetryKind::Planar => "x",
        }
    }
}

/// Which curve the user supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownQuantity {
    Charge,
    Potential,
    Field,
    /// Overlay curve drawn next to the results; never a transform input
    Comparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussConfig {
    /// Upper end of the sampled axis
    pub max_extent: f64,
    /// Number of samples, origin included
    pub num_points: usize,
    /// Input samples are clamped to ±clamp before integration
    pub clamp: f64,
}

impl Default for GaussConfig {
    fn default() -> Self {
        Self {
            max_extent: 10.0,
            num_points: 200,
            clamp: 1e6,
        }
    }
}

/// Charge, potential and field on one shared axis
#[derive(Debug, Clone, Serialize)]
pub struct FieldSample {
    pub symmetry: SymmetryKind,
    pub known: KnownQuantity,
    pub axis: Grid1D,
    pub charge: Grid1D,
    pub potential: Grid1D,
    pub field: Grid1D,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantityRanges {
    pub charge: (f64, f64),
    pub potential: (f64, f64),
    pub field: (f64, f64),
}

impl FieldSample {
    pub fn ranges(&self) -> QuantityRanges {
        QuantityRanges {
            charge: self.charge.min_max(),
            potential: self.potential.min_max(),
            field: self.field.min_max(),
        }
    }

    /// One `[coordinate, charge, potential, field]` row per sample
    pub fn columns(&self) -> Vec<[f64; 4]> {
        (1..=self.axis.len())
            .map(|i| {
                [
                    self.axis.get(i),
                    self.charge.get(i),
                    self.potential.get(i),
                    self.field.get(i),
                ]
            })
            .collect()
    }
}

/// `3 f(2) - 3 f(3) + f(4)` written into sample 1
fn extrapolate_origin(values: &mut Grid1D) {
    let origin = 3.0 * values.get(2) - 3.0 * values.get(3) + values.get(4);
    values.set(1, origin);
}

pub struct GaussSolver {
    config: GaussConfig,
}

impl GaussSolver {
    pub fn new(config: GaussConfig) -> Result<Self, SolverError> {
        if config.num_points < MIN_POINTS {
            return Err(SolverError::TooFewPoints {
                min: MIN_POINTS,
                found: config.num_points,
            });
        }
        if !(config.max_extent.is_finite() && config.max_extent > 0.0) {
            return Err(SolverError::InvalidExtent(config.max_extent));
        }
        if !(config.clamp > 0.0) {
            return Err(SolverError::InvalidClamp(config.clamp));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &GaussConfig {
        &self.config
    }

    /// Distance between neighbouring samples
    pub fn spacing(&self) -> f64 {
        self.config.max_extent / (self.config.num_points - 1) as f64
    }

    pub fn axis(&self) -> Grid1D {
        let h = self.spacing();
        Grid1D::from_fn(self.config.num_points, |i| (i - 1) as f64 * h)
    }

    /// Parse a formula in the axis coordinate (`r` or `x`, both accepted)
    pub fn parse(&self, formula: &str) -> Result<CompiledExpression, SolverError> {
        Ok(parse(formula, &["r", "x"])?)
    }

    /// Sample `expr` along the axis, clamping to `±clamp`.
    ///
    /// For charge input an origin sample that had to be clamped (or failed
    /// to evaluate) is replaced by extrapolation from its neighbours.
    pub fn sample(&self, expr: &CompiledExpression, known: KnownQuantity) -> Grid1D {
        let clamp = self.config.clamp;
        let axis = self.axis();
        let mut origin_bad = false;
        // drop anything left over from an earlier pass
        expr.take_error();

        let mut values = Grid1D::from_fn(axis.len(), |i| {
            let s = axis.get(i);
            let raw = expr.evaluate(s, 0.0, 0.0, s);
            if i == 1 {
                origin_bad = raw.abs() > clamp || expr.last_error().is_some();
            }
            raw.clamp(-clamp, clamp)
        });

        if let Some(e) = expr.take_error() {
            warn!("Evaluating '{}' failed at one or more samples: {}", expr.source(), e);
        }
        if known == KnownQuantity::Charge && origin_bad {
            extrapolate_origin(&mut values);
        }
        values
    }

    /// Derive the two complementary quantities from `samples`.
    ///
    /// Differentiated arrays are zero at the last sample. With potential
    /// input this zeroes `E(N)`, so the charge at `N - 1` is an edge
    /// artefact and should not be read as data.
    pub fn transform(
        &self,
        symmetry: SymmetryKind,
        known: KnownQuantity,
        samples: &Grid1D,
    ) -> Result<FieldSample, SolverError> {
        let n = self.config.num_points;
        if samples.len() != n {
            return Err(SolverError::LengthMismatch {
                expected: n,
                found: samples.len(),
            });
        }
        debug!(
            "Gauss transform: {:?} symmetry, {:?} known, {} points over [0, {}]",
            symmetry, known, n, self.config.max_extent
        );

        let clamp = self.config.clamp;
        let mut input = samples.clone();
        for i in 1..=n {
            input.set(i, input.get(i).clamp(-clamp, clamp));
        }

        let axis = self.axis();
        let h = self.spacing();

        let (charge, potential, field) = match known {
            KnownQuantity::Comparison => return Err(SolverError::ComparisonIsOverlay),
            KnownQuantity::Charge => {
                let field = field_from_charge(symmetry, &input, &axis, h);
                let potential = potential_from_field(&field, h);
                (input, potential, field)
            }
            KnownQuantity::Potential => {
                let field = field_from_potential(&input, h);
                let charge = charge_from_field(symmetry, &field, &axis, h);
                (charge, input, field)
            }
            KnownQuantity::Field => {
                let charge = charge_from_field(symmetry, &input, &axis, h);
                let potential = potential_from_field(&input, h);
                (charge, potential, input)
            }
        };

        Ok(FieldSample {
            symmetry,
            known,
            axis,
            charge,
            potential,
            field,
        })
    }

    /// Parse, sample and transform in one go
    pub fn solve(
        &self,
        symmetry: SymmetryKind,
        known: KnownQuantity,
        formula: &str,
    ) -> Result<FieldSample, SolverError> {
        let expr = self.parse(formula)?;
        let samples = self.sample(&expr, known);
        self.transform(symmetry, known, &samples)
    }

    /// Sample an overlay curve on the solver's axis
    pub fn sample_comparison(&self, formula: &str) -> Result<Grid1D, SolverError> {
        let expr = self.parse(formula)?;
        Ok(self.sample(&expr, KnownQuantity::Comparison))
    }
}

/// `E(r) = (1/r^p) ∫ rho s^p ds`; planar input is centred so the slab's
/// field is antisymmetric about its midpoint
fn field_from_charge(symmetry: SymmetryKind, charge: &Grid1D, axis: &Grid1D, h: f64) -> Grid1D {
    let p = symmetry.area_power();

    if symmetry == SymmetryKind::Planar {
        let mut field = charge.running_integral(h);
        let total = field.get(field.len());
        field.add_scalar(-total / 2.0);
        return field;
    }

    let weighted = Grid1D::from_fn(charge.len(), |i| charge.get(i) * axis.get(i).powi(p));
    let enclosed = weighted.running_integral(h);
    let mut field = Grid1D::from_fn(charge.len(), |i| {
        if i == 1 {
            0.0
        } else {
            enclosed.get(i) / axis.get(i).powi(p)
        }
    });
    extrapolate_origin(&mut field);
    field
}

/// `E = -dV/dr`
fn field_from_potential(potential: &Grid1D, h: f64) -> Grid1D {
    let mut field = Grid1D::from_fn(potential.len(), |i| -potential.d_dx(i, h));
    extrapolate_origin(&mut field);
    field
}

/// `rho = (1/r^p) d(r^p E)/dr`
fn charge_from_field(symmetry: SymmetryKind, field: &Grid1D, axis: &Grid1D, h: f64) -> Grid1D {
    let p = symmetry.area_power();
    let flux = Grid1D::from_fn(field.len(), |i| field.get(i) * axis.get(i).powi(p));
    let mut charge = Grid1D::from_fn(field.len(), |i| {
        if i == 1 {
            0.0
        } else {
            flux.d_dx(i, h) / axis.get(i).powi(p)
        }
    });
    extrapolate_origin(&mut charge);
    charge
}

/// `V(r) = -∫ E ds` from the origin
fn potential_from_field(field: &Grid1D, h: f64) -> Grid1D {
    let integral = field.running_integral(h);
    Grid1D::from_fn(integral.len(), |i| -integral.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver(max_extent: f64, num_points: usize) -> GaussSolver {
        GaussSolver::new(GaussConfig {
            max_extent,
            num_points,
            ..GaussConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_axis_shared_by_all_outputs() {
        let s = solver(10.0, 200);
        for known in [KnownQuantity::Charge, KnownQuantity::Potential, KnownQuantity::Field] {
            let out = s.solve(SymmetryKind::Cylindrical, known, "exp(-r)").unwrap();
            assert_eq!(out.axis.len(), 200);
            assert_eq!(out.charge.len(), 200);
            assert_eq!(out.potential.len(), 200);
            assert_eq!(out.field.len(), 200);
            assert_eq!(out.axis.get(1), 0.0);
            assert!((out.axis.get(200) - 10.0).abs() < 1e-12);
            assert!((out.axis.get(2) - 10.0 / 199.0).abs() < 1e-15);
        }
    }

    #[test]
    fn test_uniform_ball() {
        let s = solver(10.0, 200);
        let out = s
            .solve(SymmetryKind::Spherical, KnownQuantity::Charge, "h(2-r)")
            .unwrap();

        for i in 2..=200 {
            let r = out.axis.get(i);
            let e = out.field.get(i);
            if r <= 1.9 {
                let exact = r / 3.0;
                assert!((e - exact).abs() / exact < 0.01, "r = {}: {} vs {}", r, e, exact);
            } else if r >= 2.5 {
                let exact = 8.0 / (3.0 * r * r);
                assert!((e - exact).abs() / exact < 0.05, "r = {}: {} vs {}", r, e, exact);
            }
        }
        assert!(out.field.get(1).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_cylinder_and_slab() {
        let s = solver(4.0, 41);
        let cyl = s.solve(SymmetryKind::Cylindrical, KnownQuantity::Charge, "1").unwrap();
        for i in 1..=41 {
            assert!((cyl.field.get(i) - cyl.axis.get(i) / 2.0).abs() < 1e-9);
        }

        let slab = s.solve(SymmetryKind::Planar, KnownQuantity::Charge, "1").unwrap();
        for i in 1..=41 {
            let x = slab.axis.get(i);
            assert!((slab.field.get(i) - (x - 2.0)).abs() < 1e-9);
            assert!((slab.potential.get(i) + (x * x / 2.0 - 2.0 * x)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_field_known_spherical() {
        let s = solver(5.0, 101);
        let out = s.solve(SymmetryKind::Spherical, KnownQuantity::Field, "r").unwrap();
        for i in 21..=100 {
            assert!((out.charge.get(i) - 3.0).abs() < 0.01);
        }
        for i in 1..=101 {
            let r = out.axis.get(i);
            assert!((out.potential.get(i) + r * r / 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_potential_known_spherical() {
        let s = solver(5.0, 101);
        let out = s
            .solve(SymmetryKind::Spherical, KnownQuantity::Potential, "-r^2/6")
            .unwrap();
        for i in 2..=100 {
            assert!((out.field.get(i) - out.axis.get(i) / 3.0).abs() < 1e-9);
        }
        assert!(out.field.get(1).abs() < 1e-9);
        for i in 11..=99 {
            assert!((out.charge.get(i) - 1.0).abs() < 0.01, "i = {}", i);
        }
    }

    #[test]
    fn test_charge_potential_round_trip() {
        let s = solver(10.0, 201);
        let forward = s
            .solve(SymmetryKind::Spherical, KnownQuantity::Charge, "exp(-r^2)")
            .unwrap();
        let back = s
            .transform(SymmetryKind::Spherical, KnownQuantity::Potential, &forward.potential)
            .unwrap();

        for i in 21..=199 {
            let diff = (back.charge.get(i) - forward.charge.get(i)).abs();
            assert!(diff < 1e-2, "i = {}: {} vs {}", i, back.charge.get(i), forward.charge.get(i));
        }
    }

    #[test]
    fn test_clamped_origin_repaired_for_charge() {
        let s = solver(1.0, 11);
        let expr = s.parse("1/r").unwrap();

        let charge = s.sample(&expr, KnownQuantity::Charge);
        let expected = 3.0 * 10.0 - 3.0 * 5.0 + 10.0 / 3.0;
        assert!((charge.get(1) - expected).abs() < 1e-9);

        let field = s.sample(&expr, KnownQuantity::Field);
        assert_eq!(field.get(1), 0.0);

        let spike = s.parse("1e9*h(0.05-r)").unwrap();
        assert_eq!(s.sample(&spike, KnownQuantity::Field).get(1), 1e6);
    }

    #[test]
    fn test_stale_error_does_not_trigger_repair() {
        let s = solver(1.0, 11);
        let expr = s.parse("1/(r-0.05)").unwrap();
        // leave a recorded failure behind
        assert_eq!(expr.evaluate(0.05, 0.0, 0.0, 0.05), 0.0);
        assert!(expr.last_error().is_some());

        let charge = s.sample(&expr, KnownQuantity::Charge);
        assert!((charge.get(1) + 20.0).abs() < 1e-9);
        assert!(expr.last_error().is_none());
    }

    #[test]
    fn test_field_known_cylindrical() {
        let s = solver(4.0, 81);
        let out = s.solve(SymmetryKind::Cylindrical, KnownQuantity::Field, "r/2").unwrap();
        for i in 2..=80 {
            assert!((out.charge.get(i) - 1.0).abs() < 1e-9, "i = {}", i);
        }
        assert!((out.charge.get(1) - 1.0).abs() < 1e-9);
        for i in 1..=81 {
            let r = out.axis.get(i);
            assert!((out.potential.get(i) + r * r / 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_potential_known_cylindrical() {
        let s = solver(4.0, 81);
        let out = s
            .solve(SymmetryKind::Cylindrical, KnownQuantity::Potential, "-r^2/4")
            .unwrap();
        for i in 2..=80 {
            assert!((out.field.get(i) - out.axis.get(i) / 2.0).abs() < 1e-9);
        }
        for i in 2..=79 {
            assert!((out.charge.get(i) - 1.0).abs() < 1e-9, "i = {}", i);
        }
        // E(N) is an edge sample, so the charge next to it is not data
        assert_eq!(out.field.get(81), 0.0);
    }

    #[test]
    fn test_planar_field_and_potential_known() {
        let s = solver(2.0, 41);

        let from_field = s.solve(SymmetryKind::Planar, KnownQuantity::Field, "x").unwrap();
        for i in 1..=40 {
            assert!((from_field.charge.get(i) - 1.0).abs() < 1e-9, "i = {}", i);
        }
        for i in 1..=41 {
            let x = from_field.axis.get(i);
            assert!((from_field.potential.get(i) + x * x / 2.0).abs() < 1e-9);
        }

        let from_potential = s
            .solve(SymmetryKind::Planar, KnownQuantity::Potential, "-x^2/2")
            .unwrap();
        for i in 1..=40 {
            let x = from_potential.axis.get(i);
            assert!((from_potential.field.get(i) - x).abs() < 1e-9);
        }
        for i in 1..=39 {
            assert!((from_potential.charge.get(i) - 1.0).abs() < 1e-9, "i = {}", i);
        }
    }

    #[test]
    fn test_comparison_is_not_a_transform() {
        let s = solver(1.0, 11);
        let overlay = s.sample_comparison("r^2").unwrap();
        assert_eq!(overlay.len(), 11);
        assert_eq!(
            s.transform(SymmetryKind::Planar, KnownQuantity::Comparison, &overlay)
                .unwrap_err(),
            SolverError::ComparisonIsOverlay
        );
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(matches!(
            GaussSolver::new(GaussConfig {
                num_points: 4,
                ..GaussConfig::default()
            }),
            Err(SolverError::TooFewPoints { .. })
        ));
        assert!(matches!(
            GaussSolver::new(GaussConfig {
                max_extent: 0.0,
                ..GaussConfig::default()
            }),
            Err(SolverError::InvalidExtent(_))
        ));
        for clamp in [-1.0, 0.0, f64::NAN] {
            assert!(matches!(
                GaussSolver::new(GaussConfig {
                    clamp,
                    ..GaussConfig::default()
                }),
                Err(SolverError::InvalidClamp(_))
            ));
        }
        let from_json: GaussConfig = serde_json::from_str(r#"{"clamp": -1.0}"#).unwrap();
        assert!(GaussSolver::new(from_json).is_err());

        let s = solver(1.0, 11);
        assert!(matches!(
            s.transform(SymmetryKind::Planar, KnownQuantity::Field, &Grid1D::zeros(3)),
            Err(SolverError::LengthMismatch { .. })
        ));
        assert!(matches!(
            s.solve(SymmetryKind::Planar, KnownQuantity::Field, "y"),
            Err(SolverError::Parse(_))
        ));
    }

    #[test]
    fn test_ranges_summarise_each_curve() {
        let s = solver(2.0, 21);
        let out = s.solve(SymmetryKind::Planar, KnownQuantity::Field, "x").unwrap();
        let ranges = out.ranges();
        assert_eq!(ranges.field, (0.0, 2.0));
        assert!((ranges.potential.0 + 2.0).abs() < 1e-9);
        assert_eq!(out.columns().len(), 21);
    }
}
