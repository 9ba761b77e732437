//! Dense Vector Operations
//!
//! A vector in this crate is just a `Vec<f64>` (owning) or a `&[f64]` /
//! `&mut [f64]` (a view into somebody else's storage, such as one row of a
//! [`Matrix`]). Instead of wrapping the storage in a newtype, the linear
//! algebra lives on the [`VectorExt`] extension trait, so rows, layer
//! activations and gradient slices all get the same methods without copying.
//!
//! ## Conventions
//!
//! - Methods ending in `_in_place` (and [`VectorExt::axpy`]) mutate `self`.
//! - [`VectorExt::add`], [`VectorExt::sub`] and [`VectorExt::scaled`] return a
//!   fresh `Vec<f64>`.
//! - Binary operations require equal lengths and panic otherwise; the
//!   callers in this crate validate shapes before reaching them.

use crate::matrix::Matrix;

/// Owning vector type.
pub type Vector = Vec<f64>;

/// Linear algebra on contiguous `f64` storage.
pub trait VectorExt {
    /// Inner product `Σ self[i] * other[i]`.
    fn dot(&self, other: &[f64]) -> f64;

    /// p-norm for `p ∈ {0, 1, 2}`, where `0` selects the infinity norm.
    ///
    /// Any other `p` computes `(Σ |v_i|^p)^(1/p)`.
    fn norm(&self, p: u32) -> f64;

    /// Element-wise sum as a new vector.
    fn add(&self, other: &[f64]) -> Vector;

    /// Element-wise difference `self - other` as a new vector.
    fn sub(&self, other: &[f64]) -> Vector;

    /// `c * self` as a new vector.
    fn scaled(&self, c: f64) -> Vector;

    fn add_in_place(&mut self, other: &[f64]);

    fn sub_in_place(&mut self, other: &[f64]);

    fn scale_in_place(&mut self, c: f64);

    /// `self += alpha * x`
    fn axpy(&mut self, alpha: f64, x: &[f64]);

    /// Outer product `self ⊗ other` as a `len(self) × len(other)` matrix.
    fn outer(&self, other: &[f64]) -> Matrix;
}

impl VectorExt for [f64] {
    fn dot(&self, other: &[f64]) -> f64 {
        assert_eq!(self.len(), other.len(), "dot: length mismatch");
        self.iter().zip(other).map(|(a, b)| a * b).sum()
    }

    fn norm(&self, p: u32) -> f64 {
        match p {
            0 => self.iter().fold(0.0, |m, &v| m.max(v.abs())),
            1 => self.iter().map(|v| v.abs()).sum(),
            2 => self.iter().map(|v| v * v).sum::<f64>().sqrt(),
            _ => {
                let p = f64::from(p);
                self.iter()
                    .map(|v| v.abs().powf(p))
                    .sum::<f64>()
                    .powf(1.0 / p)
            }
        }
    }

    fn add(&self, other: &[f64]) -> Vector {
        assert_eq!(self.len(), other.len(), "add: length mismatch");
        self.iter().zip(other).map(|(a, b)| a + b).collect()
    }

    fn sub(&self, other: &[f64]) -> Vector {
        assert_eq!(self.len(), other.len(), "sub: length mismatch");
        self.iter().zip(other).map(|(a, b)| a - b).collect()
    }

    fn scaled(&self, c: f64) -> Vector {
        self.iter().map(|v| c * v).collect()
    }

    fn add_in_place(&mut self, other: &[f64]) {
        self.axpy(1.0, other);
    }

    fn sub_in_place(&mut self, other: &[f64]) {
        self.axpy(-1.0, other);
    }

    fn scale_in_place(&mut self, c: f64) {
        for v in self.iter_mut() {
            *v *= c;
        }
    }

    // Simple zipped loop that LLVM can auto-vectorize.
    fn axpy(&mut self, alpha: f64, x: &[f64]) {
        assert_eq!(self.len(), x.len(), "axpy: length mismatch");
        for (r, &v) in self.iter_mut().zip(x) {
            *r += alpha * v;
        }
    }

    fn outer(&self, other: &[f64]) -> Matrix {
        let mut m = Matrix::new(self.len(), other.len());
        for (i, &a) in self.iter().enumerate() {
            for (cell, &b) in m.row_mut(i).iter_mut().zip(other) {
                *cell = a * b;
            }
        }
        m
    }
}
