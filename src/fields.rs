//! Scalar and vector fields sampled on a plane slice of 3D space
//!
//! A slice holds one world coordinate fixed (the plane normal) and samples
//! the other two on a `size x size` grid. Column `c` maps to the first
//! in-plane axis at `min + (c - 1) h`; row `r` maps to the second at
//! `max - (r - 1) h`, so row 1 is the top edge of the plotted image.
//! Derivatives along the normal come from re-evaluating the formula just
//! off the plane.
//!
//! Vector results (gradient, components, curl) are indexed by world axis:
//! `[0]` is x, `[1]` is y, `[2]` is z, whatever the plane.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::differential::{
    curl, five_point_first, five_point_second, flatten_if_flat, in_plane_divergence,
    in_plane_gradient, laplacian,
};
use crate::error::ParseError;
use crate::expression::{parse_formula, CompiledExpression};
use crate::grid::Grid2D;

pub const MIN_SIZE: usize = 10;
pub const MAX_SIZE: usize = 80;

/// Formula a fresh scalar-field session starts from
pub const DEFAULT_SCALAR_FORMULA: &str = "x*y+z*r";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    YZ, // x = center.x
    ZX, // y = center.y
    #[default]
    XY, // z = center.z
}

impl Plane {
    /// World axis indices `(column axis, row axis, normal)`
    pub fn axes(self) -> (usize, usize, usize) {
        match self {
            Plane::YZ => (1, 2, 0),
            Plane::ZX => (2, 0, 1),
            Plane::XY => (0, 1, 2),
        }
    }

    pub fn normal(self) -> usize {
        self.axes().2
    }

    /// Plane whose normal is world axis `axis` (0 = x, 1 = y, 2 = z)
    pub fn from_normal(axis: usize) -> Option<Self> {
        match axis {
            0 => Some(Plane::YZ),
            1 => Some(Plane::ZX),
            2 => Some(Plane::XY),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Samples per grid side, kept within `[MIN_SIZE, MAX_SIZE]`
    pub size: usize,
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
    /// Step used for derivatives along the plane normal
    pub out_of_plane_step: f64,
    /// Derived grids with a smaller spread are collapsed to a constant
    pub flatness_epsilon: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            size: 30,
            min: Vector3::new(-1.0, -1.0, -1.0),
            max: Vector3::new(1.0, 1.0, 1.0),
            out_of_plane_step: 0.01,
            flatness_epsilon: 1e-10,
        }
    }
}

fn clamp_size(size: usize) -> usize {
    size.clamp(MIN_SIZE, MAX_SIZE)
}

/// Geometry of one sampled slice
#[derive(Debug, Clone, Copy)]
struct Slice {
    plane: Plane,
    size: usize,
    min: Vector3<f64>,
    max: Vector3<f64>,
    center: Vector3<f64>,
    h_col: f64,
    h_row: f64,
    h_normal: f64,
}

impl Slice {
    fn new(config: &FieldConfig, plane: Plane, center: Vector3<f64>) -> Self {
        let (i, j, _) = plane.axes();
        let cells = (config.size - 1) as f64;
        Self {
            plane,
            size: config.size,
            min: config.min,
            max: config.max,
            center,
            h_col: (config.max[i] - config.min[i]) / cells,
            h_row: (config.max[j] - config.min[j]) / cells,
            h_normal: config.out_of_plane_step,
        }
    }

    /// World point under a (possibly fractional) grid position, `offset`
    /// along the normal
    fn world_point(&self, row: f64, col: f64, offset: f64) -> Vector3<f64> {
        let (i, j, k) = self.plane.axes();
        let mut p = Vector3::zeros();
        p[i] = self.min[i] + (col - 1.0) * self.h_col;
        p[j] = self.max[j] - (row - 1.0) * self.h_row;
        p[k] = self.center[k] + offset;
        p
    }

    /// Evaluate `expr` over the slice shifted by `offset` along the normal
    fn sample(&self, expr: &CompiledExpression, offset: f64) -> Grid2D {
        let mut grid = Grid2D::zeros(self.size, self.size);
        for row in 1..=self.size {
            for col in 1..=self.size {
                let p = self.world_point(row as f64, col as f64, offset);
                let r = (p.x * p.x + p.y * p.y).sqrt();
                grid.set(row, col, expr.evaluate(p.x, p.y, p.z, r));
            }
            trace!("Sampled row {}/{} of '{}'", row, self.size, expr.source());
        }
        grid
    }

    /// Four samplings at `-2h, -h, +h, +2h` along the normal
    fn off_plane(&self, expr: &CompiledExpression) -> [Grid2D; 4] {
        let h = self.h_normal;
        [-2.0 * h, -h, h, 2.0 * h].map(|offset| self.sample(expr, offset))
    }
}

fn report_errors(expr: &CompiledExpression) {
    if let Some(e) = expr.take_error() {
        warn!("Cannot evaluate '{}' everywhere on the slice: {}", expr.source(), e);
    }
}

/// Place plane-ordered `(u, v, w)` grids at their world axis slots
fn to_world([u, v, w]: [Grid2D; 3], plane: Plane) -> [Grid2D; 3] {
    let (i, j, k) = plane.axes();
    let mut slots: [Option<Grid2D>; 3] = [None, None, None];
    slots[i] = Some(u);
    slots[j] = Some(v);
    slots[k] = Some(w);
    slots.map(|g| g.unwrap_or_else(|| Grid2D::zeros(0, 0)))
}

/// Scalar field with its derived grids
#[derive(Debug, Clone, Serialize)]
pub struct ScalarField {
    pub value: Grid2D,
    pub gradient: [Grid2D; 3],
    pub gradient_magnitude: Grid2D,
    pub laplacian: Grid2D,
}

/// Interpolated readout at a grid position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Probe {
    pub point: Vector3<f64>,
    pub value: f64,
    pub gradient: Vector3<f64>,
    pub laplacian: f64,
}

pub struct ScalarFieldEngine {
    config: FieldConfig,
    plane: Plane,
    center: Vector3<f64>,
    expr: Option<CompiledExpression>,
    field: Option<ScalarField>,
}

impl ScalarFieldEngine {
    pub fn new(mut config: FieldConfig) -> Self {
        config.size = clamp_size(config.size);
        Self {
            config,
            plane: Plane::default(),
            center: Vector3::zeros(),
            expr: None,
            field: None,
        }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn plane(&self) -> Plane {
        self.plane
    }

    pub fn center(&self) -> Vector3<f64> {
        self.center
    }

    pub fn formula(&self) -> Option<&str> {
        self.expr.as_ref().map(CompiledExpression::source)
    }

    pub fn field(&self) -> Option<&ScalarField> {
        self.field.as_ref()
    }

    /// Compile `formula` and recompute every grid; on a parse error the
    /// previous field is kept
    pub fn set_formula(&mut self, formula: &str) -> Result<&ScalarField, ParseError> {
        let expr = parse_formula(formula)?;
        let field = self.compute(&expr);
        self.expr = Some(expr);
        Ok(&*self.field.insert(field))
    }

    /// Rebuild all grids at a new side length; returns the size in effect
    pub fn resize(&mut self, size: usize) -> usize {
        self.config.size = clamp_size(size);
        self.refresh();
        self.config.size
    }

    /// Slice through `plane`, holding its normal coordinate at `value`
    pub fn define_plane(&mut self, plane: Plane, value: f64) {
        self.plane = plane;
        self.center[plane.normal()] = value;
        self.refresh();
    }

    fn refresh(&mut self) {
        if let Some(expr) = &self.expr {
            self.field = Some(self.compute(expr));
        }
    }

    fn compute(&self, expr: &CompiledExpression) -> ScalarField {
        let slice = Slice::new(&self.config, self.plane, self.center);
        debug!(
            "Scalar field '{}' on {:?} plane, {}x{}",
            expr.source(),
            slice.plane,
            slice.size,
            slice.size
        );

        let value = slice.sample(expr, 0.0);
        let [m2, m1, p1, p2] = slice.off_plane(expr);
        report_errors(expr);

        let (du, dv) = in_plane_gradient(&value, slice.h_col, slice.h_row);
        let mut dw = Grid2D::zeros(slice.size, slice.size);
        let mut d2w = Grid2D::zeros(slice.size, slice.size);
        for row in 1..=slice.size {
            for col in 1..=slice.size {
                let (a, b, c, d) = (
                    m2.get(row, col),
                    m1.get(row, col),
                    p1.get(row, col),
                    p2.get(row, col),
                );
                dw.set(row, col, five_point_first(a, b, c, d, slice.h_normal));
                d2w.set(
                    row,
                    col,
                    five_point_second(a, b, value.get(row, col), c, d, slice.h_normal),
                );
            }
        }

        let mut lap = laplacian(&d2w, &du, &dv, slice.h_col, slice.h_row);
        let mut gradient = to_world([du, dv, dw], slice.plane);

        let eps = self.config.flatness_epsilon;
        for component in gradient.iter_mut() {
            flatten_if_flat(component, eps);
        }
        flatten_if_flat(&mut lap, eps);

        let [gx, gy, gz] = &gradient;
        let gradient_magnitude = (&(&gx.map(|v| v * v) + &gy.map(|v| v * v)) + &gz.map(|v| v * v))
            .map(f64::sqrt);

        ScalarField {
            value,
            gradient,
            gradient_magnitude,
            laplacian: lap,
        }
    }

    /// World point and nearest-cell values at fractional `(row, col)`
    pub fn probe(&self, row: f64, col: f64) -> Option<Probe> {
        let field = self.field.as_ref()?;
        let slice = Slice::new(&self.config, self.plane, self.center);
        let [gx, gy, gz] = &field.gradient;
        Some(Probe {
            point: slice.world_point(row, col, 0.0),
            value: field.value.interpolate(row, col),
            gradient: Vector3::new(
                gx.interpolate(row, col),
                gy.interpolate(row, col),
                gz.interpolate(row, col),
            ),
            laplacian: field.laplacian.interpolate(row, col),
        })
    }
}

/// Vector field components with divergence and curl
#[derive(Debug, Clone, Serialize)]
pub struct VectorField {
    pub components: [Grid2D; 3],
    pub divergence: Grid2D,
    pub curl: [Grid2D; 3],
}

pub struct VectorFieldEngine {
    config: FieldConfig,
    plane: Plane,
    center: Vector3<f64>,
    exprs: [Option<CompiledExpression>; 3],
    field: Option<VectorField>,
}

impl VectorFieldEngine {
    pub fn new(mut config: FieldConfig) -> Self {
        config.size = clamp_size(config.size);
        Self {
            config,
            plane: Plane::default(),
            center: Vector3::zeros(),
            exprs: [None, None, None],
            field: None,
        }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn plane(&self) -> Plane {
        self.plane
    }

    pub fn field(&self) -> Option<&VectorField> {
        self.field.as_ref()
    }

    /// Compile `(A_x, A_y, A_z)`; a blank component is identically zero.
    ///
    /// Returns `Ok(None)` when all three are blank. Nothing changes if any
    /// component fails to parse.
    pub fn set_formulas(
        &mut self,
        formulas: [&str; 3],
    ) -> Result<Option<&VectorField>, ParseError> {
        let mut exprs = [None, None, None];
        for (slot, formula) in exprs.iter_mut().zip(formulas) {
            let formula = formula.trim();
            if !formula.is_empty() {
                *slot = Some(parse_formula(formula)?);
            }
        }
        self.exprs = exprs;
        self.refresh();
        Ok(self.field.as_ref())
    }

    pub fn resize(&mut self, size: usize) -> usize {
        self.config.size = clamp_size(size);
        self.refresh();
        self.config.size
    }

    pub fn define_plane(&mut self, plane: Plane, value: f64) {
        self.plane = plane;
        self.center[plane.normal()] = value;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.field = if self.exprs.iter().all(Option::is_none) {
            None
        } else {
            Some(self.compute())
        };
    }

    fn compute(&self) -> VectorField {
        let slice = Slice::new(&self.config, self.plane, self.center);
        let n = slice.size;
        debug!("Vector field on {:?} plane, {}x{}", slice.plane, n, n);

        let components: [Grid2D; 3] = std::array::from_fn(|axis| match &self.exprs[axis] {
            Some(expr) => slice.sample(expr, 0.0),
            None => Grid2D::zeros(n, n),
        });

        let (i, j, k) = slice.plane.axes();
        let (a_u, a_v, a_w) = (&components[i], &components[j], &components[k]);

        let mut divergence = in_plane_divergence(a_u, a_v, slice.h_col, slice.h_row);
        if let Some(expr) = &self.exprs[k] {
            let [m2, m1, p1, p2] = slice.off_plane(expr);
            for row in 1..=n {
                for col in 1..=n {
                    let daw_dw = five_point_first(
                        m2.get(row, col),
                        m1.get(row, col),
                        p1.get(row, col),
                        p2.get(row, col),
                        slice.h_normal,
                    );
                    divergence.set(row, col, divergence.get(row, col) + daw_dw);
                }
            }
        }
        for expr in self.exprs.iter().flatten() {
            report_errors(expr);
        }

        let local = curl([a_u, a_v, a_w], slice.h_col, slice.h_row, slice.h_normal);
        let mut curl = to_world(local, slice.plane);

        let eps = self.config.flatness_epsilon;
        flatten_if_flat(&mut divergence, eps);
        for component in curl.iter_mut() {
            flatten_if_flat(component, eps);
        }

        VectorField {
            components,
            divergence,
            curl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    fn scalar(formula: &str) -> ScalarFieldEngine {
        let mut engine = ScalarFieldEngine::new(FieldConfig::default());
        engine.set_formula(formula).unwrap();
        engine
    }

    #[test]
    fn test_default_formula_on_xy_plane() {
        let engine = scalar(DEFAULT_SCALAR_FORMULA);
        let field = engine.field().unwrap();
        let h = 2.0 / 29.0;

        assert_eq!(field.value.size(), (30, 30));
        // top-left corner is (x, y) = (-1, 1)
        assert_abs_diff_eq!(field.value.get(1, 1), -1.0, epsilon = 1e-12);

        let (row, col) = (8, 20);
        let x = -1.0 + (col - 1) as f64 * h;
        let y = 1.0 - (row - 1) as f64 * h;
        assert_abs_diff_eq!(field.value.get(row, col), x * y, epsilon = 1e-12);
        assert_abs_diff_eq!(field.gradient[0].get(row, col), y, epsilon = 1e-9);
        assert_abs_diff_eq!(field.gradient[1].get(row, col), x, epsilon = 1e-9);
        let r = (x * x + y * y).sqrt();
        assert_abs_diff_eq!(field.gradient[2].get(row, col), r, epsilon = 1e-9);
    }

    #[test]
    fn test_laplacian_of_radius_squared() {
        let engine = scalar("x^2+y^2+z^2");
        let lap = &engine.field().unwrap().laplacian;
        for row in 3..=28 {
            for col in 3..=28 {
                assert_abs_diff_eq!(lap.get(row, col), 6.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_flat_results_collapse() {
        let engine = scalar("z");
        let field = engine.field().unwrap();

        let (lo, hi) = field.gradient[2].min_max();
        assert_eq!(lo, hi);
        assert_abs_diff_eq!(lo, 1.0, epsilon = 1e-10);
        assert_eq!(field.gradient[0].min_max(), (0.0, 0.0));

        let (lo, hi) = field.laplacian.min_max();
        assert_eq!(lo, hi);
        assert!(lo.abs() < 1e-10);
        assert_abs_diff_eq!(field.gradient_magnitude.get(5, 5), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_resize_clamps_and_rebuilds() {
        let mut engine = scalar("x");
        assert_eq!(engine.resize(5), MIN_SIZE);
        assert_eq!(engine.field().unwrap().value.size(), (10, 10));
        assert_eq!(engine.resize(500), MAX_SIZE);
        assert_eq!(engine.field().unwrap().laplacian.size(), (80, 80));
        assert_eq!(engine.resize(42), 42);
        assert_eq!(engine.formula(), Some("x"));
    }

    #[test]
    fn test_define_plane_moves_slice() {
        let mut engine = scalar("x + 2*y");
        assert_eq!(Plane::from_normal(0), Some(Plane::YZ));
        engine.define_plane(Plane::YZ, 0.5);
        assert_eq!(engine.center(), Vector3::new(0.5, 0.0, 0.0));
        let field = engine.field().unwrap();

        // columns run along y, rows along z, x is fixed at 0.5
        let (lo, _) = field.value.min_max_in(1..=30, 1..=1);
        assert_abs_diff_eq!(lo, 0.5 - 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(field.gradient[0].get(10, 10), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(field.gradient[1].get(10, 10), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(field.gradient[2].get(10, 10), 0.0, epsilon = 1e-9);

        let probe = engine.probe(1.0, 1.0).unwrap();
        assert_eq!(probe.point, Vector3::new(0.5, -1.0, 1.0));
        assert_abs_diff_eq!(probe.value, 0.5 - 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_probe_needs_a_field() {
        let engine = ScalarFieldEngine::new(FieldConfig::default());
        assert!(engine.probe(3.0, 3.0).is_none());
    }

    #[test]
    fn test_bad_formula_keeps_previous_field() {
        let mut engine = scalar("x");
        assert!(engine.set_formula("x +* y").is_err());
        assert_eq!(engine.formula(), Some("x"));
        assert!(engine.field().is_some());
    }

    #[test]
    fn test_rotation_curl_and_divergence() {
        let mut engine = VectorFieldEngine::new(FieldConfig::default());
        let field = engine.set_formulas(["-y", "x", ""]).unwrap().unwrap();
        for row in 2..=29 {
            for col in 2..=29 {
                assert_abs_diff_eq!(field.curl[2].get(row, col), 2.0, epsilon = 1e-9);
                assert_abs_diff_eq!(field.divergence.get(row, col), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_divergence_includes_normal_component() {
        let mut engine = VectorFieldEngine::new(FieldConfig::default());
        let field = engine.set_formulas(["x", "y", "z"]).unwrap().unwrap();
        assert_abs_diff_eq!(field.divergence.get(15, 15), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(field.components[2].get(15, 15), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_blank_vector_field_is_inactive() {
        let mut engine = VectorFieldEngine::new(FieldConfig::default());
        assert!(engine.set_formulas(["", " ", ""]).unwrap().is_none());
        assert!(engine.set_formulas(["foo", "", ""]).is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: FieldConfig = serde_json::from_str(r#"{"size": 40}"#).unwrap();
        assert_eq!(config.size, 40);
        assert_eq!(config.max, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(config.out_of_plane_step, 0.01);
    }
}
