//! Finite-difference operators on sampled grids
//!
//! Grid conventions: columns run with the plotted horizontal axis, rows run
//! *against* the plotted vertical axis (row 1 is the top). A derivative
//! "along rows" is therefore minus the derivative along plotted y, and the
//! assembly functions below fold that sign in.

use crate::grid::Grid2D;

/// Central difference along columns; zero on the first and last column
pub fn d_dcol(grid: &Grid2D, row: usize, col: usize, h: f64) -> f64 {
    if col < 2 || col + 1 > grid.cols() {
        return 0.0;
    }
    (grid.get(row, col + 1) - grid.get(row, col - 1)) / (2.0 * h)
}

/// Central difference along increasing row index; zero on the first and last row
pub fn d_drow(grid: &Grid2D, row: usize, col: usize, h: f64) -> f64 {
    if row < 2 || row + 1 > grid.rows() {
        return 0.0;
    }
    (grid.get(row + 1, col) - grid.get(row - 1, col)) / (2.0 * h)
}

/// Neighbouring-column difference scaled by the out-of-plane step.
///
/// This stands in for the derivative along the plane normal in the curl:
/// it reads `col ± 1` of the same plane grid but divides by `2 * h_normal`.
/// It is not a true perpendicular difference; it is kept because plotted
/// curl output depends on it. No edge zeroing: out-of-range cells read 0.
pub fn normal_proxy(grid: &Grid2D, row: usize, col: usize, h_normal: f64) -> f64 {
    (grid.get(row, col + 1) - grid.get(row, col - 1)) / (2.0 * h_normal)
}

/// Five-point first derivative from samples at `-2h, -h, +h, +2h`
pub fn five_point_first(m2: f64, m1: f64, p1: f64, p2: f64, h: f64) -> f64 {
    (m2 - 8.0 * m1 + 8.0 * p1 - p2) / (12.0 * h)
}

/// Five-point second derivative from samples at `-2h, -h, 0, +h, +2h`
pub fn five_point_second(m2: f64, m1: f64, c: f64, p1: f64, p2: f64, h: f64) -> f64 {
    (-m2 + 16.0 * m1 - 30.0 * c + 16.0 * p1 - p2) / (12.0 * h * h)
}

/// Collapse a grid whose spread is below `epsilon` to a single constant.
///
/// Sign-straddling noise becomes `0`; otherwise the grid takes the midpoint
/// of its range. Returns whether the grid was collapsed.
pub fn flatten_if_flat(grid: &mut Grid2D, epsilon: f64) -> bool {
    let (min, max) = grid.min_max();
    if !(max - min < epsilon) {
        return false;
    }
    if min * max < 0.0 {
        grid.fill(0.0);
    } else {
        grid.fill((min + max) / 2.0);
    }
    true
}

fn build(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Grid2D {
    let mut out = Grid2D::zeros(rows, cols);
    for row in 1..=rows {
        for col in 1..=cols {
            out.set(row, col, f(row, col));
        }
    }
    out
}

/// In-plane gradient `(dF/du, dF/dv)` of a sampled scalar, `u` along columns
/// and `v` along plotted y
pub fn in_plane_gradient(f: &Grid2D, h_col: f64, h_row: f64) -> (Grid2D, Grid2D) {
    let (rows, cols) = f.size();
    let du = build(rows, cols, |r, c| d_dcol(f, r, c, h_col));
    let dv = build(rows, cols, |r, c| -d_drow(f, r, c, h_row));
    (du, dv)
}

/// Laplacian from the out-of-plane second derivative plus the in-plane
/// divergence of an already computed gradient
pub fn laplacian(
    off_plane: &Grid2D,
    grad_u: &Grid2D,
    grad_v: &Grid2D,
    h_col: f64,
    h_row: f64,
) -> Grid2D {
    let (rows, cols) = off_plane.size();
    build(rows, cols, |r, c| {
        off_plane.get(r, c) + d_dcol(grad_u, r, c, h_col) - d_drow(grad_v, r, c, h_row)
    })
}

/// Sum of the in-plane partials `dA_u/du + dA_v/dv`
pub fn in_plane_divergence(a_u: &Grid2D, a_v: &Grid2D, h_col: f64, h_row: f64) -> Grid2D {
    let (rows, cols) = a_u.size();
    build(rows, cols, |r, c| {
        d_dcol(a_u, r, c, h_col) - d_drow(a_v, r, c, h_row)
    })
}

/// Curl of `(A_u, A_v, A_w)` sampled on a plane, `w` the plane normal.
///
/// In-plane partials are central differences; partials along `w` use
/// [`normal_proxy`].
pub fn curl(a: [&Grid2D; 3], h_col: f64, h_row: f64, h_normal: f64) -> [Grid2D; 3] {
    let [a_u, a_v, a_w] = a;
    let (rows, cols) = a_u.size();

    let curl_u = build(rows, cols, |r, c| {
        let daw_dv = -d_drow(a_w, r, c, h_row);
        let dav_dw = normal_proxy(a_v, r, c, h_normal);
        daw_dv - dav_dw
    });
    let curl_v = build(rows, cols, |r, c| {
        let dau_dw = normal_proxy(a_u, r, c, h_normal);
        let daw_du = d_dcol(a_w, r, c, h_col);
        dau_dw - daw_du
    });
    let curl_w = build(rows, cols, |r, c| {
        let dav_du = d_dcol(a_v, r, c, h_col);
        let dau_dv = -d_drow(a_u, r, c, h_row);
        dav_du - dau_dv
    });

    [curl_u, curl_v, curl_w]
}

/// Derivatives of a callable at a point
pub mod callable {
    pub const DEFAULT_STEP: f64 = 1e-8;

    pub fn central(f: impl Fn(f64) -> f64, x: f64, h: f64) -> f64 {
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    pub fn forward(f: impl Fn(f64) -> f64, x: f64, h: f64) -> f64 {
        (f(x + h) - f(x)) / h
    }

    pub fn backward(f: impl Fn(f64) -> f64, x: f64, h: f64) -> f64 {
        (f(x) - f(x - h)) / h
    }

    pub fn second(f: impl Fn(f64) -> f64, x: f64, h: f64) -> f64 {
        (f(x + h) - 2.0 * f(x) + f(x - h)) / (h * h)
    }
}
