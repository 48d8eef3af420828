//! Dense sample containers with 1-based, boundary-tolerant indexing
//!
//! Index 0 and N+1 (and anything further out) read as `0.0` and ignore
//! writes: difference stencils routinely probe one cell past the edge.

use std::ops::{Add, Mul, RangeInclusive, Sub};

use nalgebra::{DMatrix, DVector};
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Reduce values to `(min, max)`; an empty input gives `(+inf, -inf)`
fn min_max<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

/// Ordered run of samples, indexed `1..=len`
#[derive(Debug, Clone, PartialEq)]
pub struct Grid1D {
    data: DVector<f64>,
}

impl Grid1D {
    pub fn zeros(len: usize) -> Self {
        Self {
            data: DVector::zeros(len),
        }
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            data: DVector::from_vec(values),
        }
    }

    /// `len` samples of `f(i)` for `i = 1..=len`
    pub fn from_fn(len: usize, mut f: impl FnMut(usize) -> f64) -> Self {
        Self {
            data: DVector::from_fn(len, |i, _| f(i + 1)),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn in_range(&self, i: usize) -> bool {
        i >= 1 && i <= self.len()
    }

    pub fn get(&self, i: usize) -> f64 {
        if self.in_range(i) {
            self.data[i - 1]
        } else {
            0.0
        }
    }

    pub fn set(&mut self, i: usize, value: f64) {
        if self.in_range(i) {
            self.data[i - 1] = value;
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn min_max(&self) -> (f64, f64) {
        min_max(self.data.iter().copied())
    }

    pub fn add_scalar(&mut self, s: f64) {
        self.data.add_scalar_mut(s);
    }

    /// Copy `source` into this grid starting at index `start`, as far as both reach
    pub fn equate(&mut self, start: usize, source: &Grid1D) {
        if start == 0 {
            return;
        }
        for (offset, i) in (start..=self.len()).enumerate() {
            self.set(i, source.get(offset + 1));
        }
    }

    pub fn abs(&self) -> Grid1D {
        Self {
            data: self.data.abs(),
        }
    }

    /// Central difference at `i` with spacing `h`; zero at both ends
    pub fn d_dx(&self, i: usize, h: f64) -> f64 {
        if i < 2 || i + 1 > self.len() {
            return 0.0;
        }
        (self.get(i + 1) - self.get(i - 1)) / (2.0 * h)
    }

    /// Simpson's rule over `i..=j` with unit step.
    ///
    /// An odd interval count `j - i` is padded to `j + 1`, so the sum runs
    /// one sample past `j` (reading `0.0` beyond the last sample).
    pub fn simpson(&self, i: usize, j: usize) -> f64 {
        if j <= i {
            return 0.0;
        }
        let mut intervals = j - i;
        if intervals % 2 == 1 {
            intervals += 1;
        }
        let mut sum = self.get(i) + self.get(i + intervals);
        for k in 1..intervals {
            let weight = if k % 2 == 0 { 2.0 } else { 4.0 };
            sum += weight * self.get(i + k);
        }
        sum / 3.0
    }

    /// Running integral from sample 1 with spacing `h`, same length as `self`.
    ///
    /// Even interval counts use composite Simpson; odd ones finish the last
    /// three intervals with Simpson's 3/8 rule. A single interval uses the
    /// parabola through the next sample as well, so the first step is exact
    /// for quadratics. No sample past the end is ever read.
    pub fn running_integral(&self, h: f64) -> Grid1D {
        Grid1D::from_fn(self.len(), |k| self.exact_integral(1, k, h))
    }

    fn exact_integral(&self, i: usize, j: usize, h: f64) -> f64 {
        if j <= i {
            return 0.0;
        }
        let intervals = j - i;
        match intervals {
            1 if j < self.len() => {
                h * (5.0 * self.get(i) + 8.0 * self.get(j) - self.get(j + 1)) / 12.0
            }
            1 => h * (self.get(i) + self.get(j)) / 2.0,
            n if n % 2 == 0 => h * self.simpson(i, j),
            _ => {
                let m = j - 3;
                let tail = 3.0 * h / 8.0
                    * (self.get(m) + 3.0 * self.get(m + 1) + 3.0 * self.get(m + 2) + self.get(j));
                h * self.simpson(i, m) + tail
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }
}

impl Serialize for Grid1D {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for v in self.iter() {
            seq.serialize_element(&v)?;
        }
        seq.end()
    }
}

/// `rows x cols` matrix of samples, indexed `(1..=rows, 1..=cols)`.
///
/// Row 1 is the top of a plotted slice (largest y); column 1 is its left
/// edge (smallest x).
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2D {
    data: DMatrix<f64>,
}

impl Grid2D {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: DMatrix::zeros(rows, cols),
        }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            data: DMatrix::from_element(rows, cols, value),
        }
    }

    /// Build from row-major nested vectors; short rows are padded with zeros
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        Self {
            data: DMatrix::from_fn(n_rows, n_cols, |r, c| {
                rows[r].get(c).copied().unwrap_or(0.0)
            }),
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn size(&self) -> (usize, usize) {
        self.data.shape()
    }

    fn in_range(&self, row: usize, col: usize) -> bool {
        row >= 1 && row <= self.rows() && col >= 1 && col <= self.cols()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        if self.in_range(row, col) {
            self.data[(row - 1, col - 1)]
        } else {
            0.0
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        if self.in_range(row, col) {
            self.data[(row - 1, col - 1)] = value;
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Min/max over a sub-block; bounds are clipped to the grid
    pub fn min_max_in(
        &self,
        rows: RangeInclusive<usize>,
        cols: RangeInclusive<usize>,
    ) -> (f64, f64) {
        let row_lo = (*rows.start()).max(1);
        let row_hi = (*rows.end()).min(self.rows());
        let col_lo = (*cols.start()).max(1);
        let col_hi = (*cols.end()).min(self.cols());

        let cells = (row_lo..=row_hi).flat_map(|r| (col_lo..=col_hi).map(move |c| (r, c)));
        min_max(cells.map(|(r, c)| self.data[(r - 1, c - 1)]))
    }

    pub fn min_max(&self) -> (f64, f64) {
        min_max(self.data.iter().copied())
    }

    /// Value of the nearest cell to a fractional `(row, col)`, clamped to the grid
    pub fn interpolate(&self, row: f64, col: f64) -> f64 {
        if self.rows() == 0 || self.cols() == 0 {
            return 0.0;
        }
        let r = (row.round().max(1.0) as usize).min(self.rows());
        let c = (col.round().max(1.0) as usize).min(self.cols());
        self.get(r, c)
    }

    pub fn transpose(&self) -> Grid2D {
        Self {
            data: self.data.transpose(),
        }
    }

    /// Matrix product, or `None` when the inner dimensions disagree
    pub fn matmul(&self, other: &Grid2D) -> Option<Grid2D> {
        if self.cols() != other.rows() {
            return None;
        }
        Some(Self {
            data: &self.data * &other.data,
        })
    }

    /// Row-major copy, the layout a surface plot consumes
    pub fn to_row_major(&self) -> Vec<Vec<f64>> {
        self.data
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }

    pub fn map(&self, f: impl FnMut(f64) -> f64) -> Grid2D {
        Self {
            data: self.data.map(f),
        }
    }

    pub fn zip_map(&self, other: &Grid2D, mut f: impl FnMut(f64, f64) -> f64) -> Grid2D {
        Grid2D {
            data: DMatrix::from_fn(self.rows(), self.cols(), |r, c| {
                f(self.data[(r, c)], other.get(r + 1, c + 1))
            }),
        }
    }
}

impl Add for &Grid2D {
    type Output = Grid2D;

    fn add(self, rhs: &Grid2D) -> Grid2D {
        self.zip_map(rhs, |a, b| a + b)
    }
}

impl Sub for &Grid2D {
    type Output = Grid2D;

    fn sub(self, rhs: &Grid2D) -> Grid2D {
        self.zip_map(rhs, |a, b| a - b)
    }
}

impl Mul<f64> for &Grid2D {
    type Output = Grid2D;

    fn mul(self, rhs: f64) -> Grid2D {
        self.map(|v| v * rhs)
    }
}

impl Serialize for Grid2D {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows = self.to_row_major();
        let mut seq = serializer.serialize_seq(Some(rows.len()))?;
        for row in &rows {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}
