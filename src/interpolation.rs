//! Point interpolation helpers for probing sampled data between grid nodes

use crate::grid::Grid2D;

/// Straight-line interpolation through `(x0, y0)` and `(x1, y1)`
pub fn linear(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Bilinear interpolation at fractional 1-based `(col, row)`.
///
/// The cell is clamped to the grid interior, so positions outside the grid
/// extrapolate linearly from the nearest edge cell.
pub fn bilinear(col: f64, row: f64, grid: &Grid2D) -> f64 {
    if grid.rows() < 2 || grid.cols() < 2 {
        return grid.interpolate(row, col);
    }
    let i = ((col - 1.0).floor().max(0.0) as usize).min(grid.cols() - 2);
    let j = ((row - 1.0).floor().max(0.0) as usize).min(grid.rows() - 2);

    let f00 = grid.get(j + 1, i + 1);
    let f10 = grid.get(j + 1, i + 2);
    let f01 = grid.get(j + 2, i + 1);
    let f11 = grid.get(j + 2, i + 2);

    let tx = col - i as f64 - 1.0;
    let ty = row - j as f64 - 1.0;

    (1.0 - tx) * (1.0 - ty) * f00 + tx * (1.0 - ty) * f10 + (1.0 - tx) * ty * f01 + tx * ty * f11
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        assert_eq!(linear(1.5, 1.0, 10.0, 2.0, 20.0), 15.0);
        assert_eq!(linear(7.0, 1.0, 10.0, 1.0, 20.0), 10.0);
    }

    #[test]
    fn test_bilinear_reproduces_plane() {
        // f(row, col) = 2*col + 3*row is reproduced exactly
        let grid = Grid2D::from_rows(
            &(1..=4)
                .map(|r| (1..=5).map(|c| 2.0 * c as f64 + 3.0 * r as f64).collect())
                .collect::<Vec<_>>(),
        );
        let v = bilinear(2.25, 3.5, &grid);
        assert!((v - (2.0 * 2.25 + 3.0 * 3.5)).abs() < 1e-12);

        let edge = bilinear(5.0, 4.0, &grid);
        assert!((edge - 22.0).abs() < 1e-12);
    }
}
