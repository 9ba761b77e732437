//! Row-Major Matrix with Column Metadata
//!
//! [`Matrix`] stores `rows × cols` values in one contiguous `Vec<f64>` in
//! row-major order. Rows are handed out as slices into that storage (views,
//! never copies), which is what the training loop and the QR solver iterate
//! over.
//!
//! Each column also carries a [`Column`] descriptor (a name and a logical
//! [`ColumnKind`]). The numeric algorithms never look at it; it exists so that
//! data loaded by a tabular reader keeps its attribute names and nominal
//! value tables while flowing through the rest of the crate.
//!
//! ## Memory Layout
//!
//! For a 2×3 matrix the data is `[r0c0, r0c1, r0c2, r1c0, r1c1, r1c2]`, so
//! `row(i)` is `data[i * cols..(i + 1) * cols]`.

use crate::error::{check_len, Error, Result};
use crate::rng::SeededRng;
use serde::{Deserialize, Serialize};

/// Logical type of a column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Continuous value.
    Real,
    /// Enumerated value; the cell stores the index into `values`.
    Nominal(Vec<String>),
    /// Timestamp stored as seconds since the Unix epoch.
    Date,
}

/// Per-column metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn real(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Real,
        }
    }
}

/// Dense `rows × cols` matrix of `f64`.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    columns: Vec<Column>,
}

fn default_columns(cols: usize) -> Vec<Column> {
    (0..cols).map(|j| Column::real(format!("attr{}", j))).collect()
}

impl Matrix {
    /// Create a zero-filled matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
            columns: default_columns(cols),
        }
    }

    /// Wrap row-major `data` as a `rows × cols` matrix.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        check_len("Matrix::from_vec", rows * cols, data.len())?;
        Ok(Self {
            rows,
            cols,
            data,
            columns: default_columns(cols),
        })
    }

    /// Build a matrix from equally long rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            check_len("Matrix::from_rows", cols, row.len())?;
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), cols, data)
    }

    /// Fill a new matrix with standard normal samples.
    pub fn random_normal(rows: usize, cols: usize, rng: &mut SeededRng) -> Self {
        let data = (0..rows * cols).map(|_| rng.normal()).collect();
        Self {
            rows,
            cols,
            data,
            columns: default_columns(cols),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    /// Row `i` as a view into the underlying storage.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Mutable view of row `i`.
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterate over all rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics, and a zero-column matrix has no cells anyway
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Copy of column `j`.
    pub fn col(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, j)).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn column(&self, j: usize) -> &Column {
        &self.columns[j]
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn set_column(&mut self, j: usize, column: Column) {
        self.columns[j] = column;
    }

    /// Swap two rows in place.
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let cols = self.cols;
        let (head, tail) = self.data.split_at_mut(hi * cols);
        head[lo * cols..(lo + 1) * cols].swap_with_slice(&mut tail[..cols]);
    }

    /// Swap two columns, including their metadata.
    pub fn swap_cols(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.columns.swap(a, b);
        for i in 0..self.rows {
            self.row_mut(i).swap(a, b);
        }
    }

    /// Set every cell of column `j` to `value`.
    pub fn fill_col(&mut self, j: usize, value: f64) {
        for i in 0..self.rows {
            self.set(i, j, value);
        }
    }

    /// Multiply every cell by `c`.
    pub fn scale(&mut self, c: f64) {
        for v in self.data.iter_mut() {
            *v *= c;
        }
    }

    pub fn transpose(&self) -> Matrix {
        let mut t = Matrix::new(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                t.set(j, i, self.get(i, j));
            }
        }
        t
    }

    /// `self * x` for a vector `x` of length `cols`.
    pub fn mul_vec(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_len("Matrix::mul_vec", self.cols, x.len())?;
        Ok(self
            .iter_rows()
            .map(|row| row.iter().zip(x).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// New matrix made of the listed rows, in the listed order.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Matrix> {
        let mut out = Matrix::new(indices.len(), self.cols);
        out.columns = self.columns.clone();
        for (dst, &src) in indices.iter().enumerate() {
            if src >= self.rows {
                return Err(Error::InvalidShape(format!(
                    "row index {} out of range for {} rows",
                    src, self.rows
                )));
            }
            out.row_mut(dst).copy_from_slice(self.row(src));
        }
        Ok(out)
    }

    /// Copy with an extra trailing column of ones (the bias trick).
    pub fn with_bias_column(&self) -> Matrix {
        let mut out = Matrix::new(self.rows, self.cols + 1);
        for i in 0..self.rows {
            out.row_mut(i)[..self.cols].copy_from_slice(self.row(i));
        }
        out.columns[..self.cols].clone_from_slice(&self.columns);
        out.columns[self.cols] = Column::real("bias");
        out.fill_col(self.cols, 1.0);
        out
    }
}
