//! Householder QR and Minimum-Norm Least Squares
//!
//! This module solves `min ‖A·X − Y‖₂` for a matrix of right-hand sides `Y`
//! and returns the solution of smallest norm when `A` does not have full
//! column rank. It is the closed-form baseline that gradient descent is
//! checked against, and it fits the weights of [`crate::LinearRegression`].
//!
//! ## Algorithm
//!
//! ```text
//! 1. sort the rows of A (and Y) by descending infinity norm
//! 2. Householder QR with column pivoting:  A·P = Q·R
//!      step k picks the remaining column with the largest 2-norm below row k
//!      stop early (rank r = k) once that norm² < (r00 · ESP)²
//! 3. C = (Qᵀ·Y)[..r]
//! 4a. full rank:  back-substitute R·Z = C, then X = P·Z
//! 4b. rank r < n: factor the transpose of the r×n factor, Rᵀ = Q₂·S
//!      (again row-sorted and column-pivoted), forward-substitute Sᵀ·W = C,
//!      Z = Q₂·[W; 0], then undo both permutations to get X
//! ```
//!
//! Step 4b picks the member of the solution family that lies in the row
//! space of `R`, which is the one with the smallest 2-norm.
//!
//! ## Why Row Sorting?
//!
//! Householder QR is backward stable, but when rows differ in scale by many
//! orders of magnitude the large rows should be eliminated first. Sorting the
//! rows does not change the least-squares problem (it permutes equations, not
//! unknowns), so it is free.
//!
//! Rank deficiency is not an error. It is reported through
//! [`LeastSquares::rank`].

use crate::error::{check_len, Error, Result};
use crate::matrix::Matrix;
use crate::vector::VectorExt;
use log::debug;

/// Relative tolerance for declaring a pivot column numerically zero.
pub const ESP: f64 = 1e-15;

/// Column-pivoted Householder QR of a row-sorted matrix.
///
/// The factored matrix keeps its columns in pivoted order: column `j` of
/// [`HouseholderQr::r`] is column `col_order()[j]` of the original. Row `i`
/// of the factorization is row `row_order()[i]` of the original.
#[derive(Clone, Debug)]
pub struct HouseholderQr {
    /// Upper trapezoidal factor, columns in pivoted order.
    r: Matrix,
    /// Unit-norm reflector `k` acts on rows `k..`.
    reflectors: Vec<Vec<f64>>,
    row_order: Vec<usize>,
    col_order: Vec<usize>,
    rank: usize,
}

impl HouseholderQr {
    /// Factor `a`.
    ///
    /// # Errors
    ///
    /// [`Error::NonFinite`] if `a` contains NaN or infinity.
    pub fn new(a: &Matrix) -> Result<Self> {
        if a.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(Error::NonFinite("QR input matrix"));
        }
        let (rows, cols) = a.shape();

        let mut row_order: Vec<usize> = (0..rows).collect();
        let norms: Vec<f64> = (0..rows).map(|i| a.row(i).norm(0)).collect();
        row_order.sort_by(|&x, &y| norms[y].total_cmp(&norms[x]));
        let mut r = a.select_rows(&row_order)?;

        let mut col_order: Vec<usize> = (0..cols).collect();
        let mut reflectors = Vec::new();
        let steps = rows.min(cols);
        let mut rank = steps;

        for k in 0..steps {
            let mut best = k;
            let mut best_norm = -1.0;
            for j in k..cols {
                let norm: f64 = (k..rows).map(|i| r.get(i, j) * r.get(i, j)).sum();
                if norm > best_norm {
                    best_norm = norm;
                    best = j;
                }
            }

            let threshold = if k == 0 {
                0.0
            } else {
                let r00 = r.get(0, 0);
                r00 * ESP * ESP * r00
            };
            if best_norm <= 0.0 || best_norm < threshold {
                rank = k;
                break;
            }

            r.swap_cols(k, best);
            col_order.swap(k, best);

            let mut v: Vec<f64> = (k..rows).map(|i| r.get(i, k)).collect();
            let norm = v.norm(2);
            let alpha = if v[0] < 0.0 { norm } else { -norm };
            v[0] -= alpha;
            let v_norm = v.norm(2);
            v.scale_in_place(1.0 / v_norm);

            r.set(k, k, alpha);
            for i in k + 1..rows {
                r.set(i, k, 0.0);
            }
            for j in k + 1..cols {
                let s = 2.0 * (k..rows).map(|i| v[i - k] * r.get(i, j)).sum::<f64>();
                for i in k..rows {
                    let updated = r.get(i, j) - s * v[i - k];
                    r.set(i, j, updated);
                }
            }
            reflectors.push(v);
        }

        Ok(Self {
            r,
            reflectors,
            row_order,
            col_order,
            rank,
        })
    }

    /// Numerical rank found during factorization.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// `row_order()[i]` is the original row placed at position `i`.
    pub fn row_order(&self) -> &[usize] {
        &self.row_order
    }

    /// `col_order()[j]` is the original column placed at position `j`.
    pub fn col_order(&self) -> &[usize] {
        &self.col_order
    }

    /// The triangular factor with columns in pivoted order.
    pub fn r(&self) -> &Matrix {
        &self.r
    }

    /// `y ← Qᵀ·y`, where `y` is already in this factorization's row order.
    fn apply_qt(&self, y: &mut Matrix) {
        for (k, v) in self.reflectors.iter().enumerate() {
            reflect(y, k, v);
        }
    }

    /// `y ← Q·y`.
    fn apply_q(&self, y: &mut Matrix) {
        for (k, v) in self.reflectors.iter().enumerate().rev() {
            reflect(y, k, v);
        }
    }
}

/// Apply `I − 2·v·vᵀ` to rows `k..` of every column of `y`.
fn reflect(y: &mut Matrix, k: usize, v: &[f64]) {
    let rows = y.rows();
    for t in 0..y.cols() {
        let s = 2.0 * (k..rows).map(|i| v[i - k] * y.get(i, t)).sum::<f64>();
        for i in k..rows {
            let updated = y.get(i, t) - s * v[i - k];
            y.set(i, t, updated);
        }
    }
}

/// Result of [`least_squares`].
#[derive(Clone, Debug)]
pub struct LeastSquares {
    /// `cols(A) × cols(Y)`; column `t` solves for right-hand side `t`.
    pub solution: Matrix,
    /// Numerical rank of `A`.
    pub rank: usize,
}

impl LeastSquares {
    pub fn is_rank_deficient(&self) -> bool {
        self.rank < self.solution.rows()
    }
}

/// Minimum-norm least-squares solution of `A·X ≈ Y`.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `A` and `Y` have different row counts
/// - [`Error::InvalidShape`] if `A` is empty
/// - [`Error::NonFinite`] if either input contains NaN or infinity
pub fn least_squares(a: &Matrix, y: &Matrix) -> Result<LeastSquares> {
    check_len("least_squares rows", a.rows(), y.rows())?;
    if a.rows() == 0 || a.cols() == 0 {
        return Err(Error::InvalidShape(format!(
            "least_squares: empty system {}x{}",
            a.rows(),
            a.cols()
        )));
    }
    if y.as_slice().iter().any(|v| !v.is_finite()) {
        return Err(Error::NonFinite("least-squares right-hand side"));
    }

    let n = a.cols();
    let targets = y.cols();
    let qr = HouseholderQr::new(a)?;
    let rank = qr.rank();

    let mut c = y.select_rows(qr.row_order())?;
    qr.apply_qt(&mut c);

    let mut solution = Matrix::new(n, targets);
    if rank == n {
        let r = qr.r();
        for t in 0..targets {
            let mut z = vec![0.0; n];
            for i in (0..n).rev() {
                let tail: f64 = (i + 1..n).map(|j| r.get(i, j) * z[j]).sum();
                z[i] = (c.get(i, t) - tail) / r.get(i, i);
            }
            for (j, &original) in qr.col_order().iter().enumerate() {
                solution.set(original, t, z[j]);
            }
        }
    } else if rank > 0 {
        debug!("least_squares: rank {} < {} columns, taking minimum-norm solution", rank, n);

        // Rᵀ restricted to the first `rank` rows of the factor: n × rank
        let mut rt = Matrix::new(n, rank);
        for i in 0..rank {
            for j in i..n {
                rt.set(j, i, qr.r().get(i, j));
            }
        }
        let second = HouseholderQr::new(&rt)?;
        let rank2 = second.rank();
        let s = second.r();

        for t in 0..targets {
            // Sᵀ·w = (permuted c), lower triangular
            let mut w = Matrix::new(n, 1);
            for i in 0..rank2 {
                let rhs = c.get(second.col_order()[i], t);
                let head: f64 = (0..i).map(|j| s.get(j, i) * w.get(j, 0)).sum();
                w.set(i, 0, (rhs - head) / s.get(i, i));
            }
            second.apply_q(&mut w);

            // w now holds z in the second factorization's row order
            for (i, &pivot_pos) in second.row_order().iter().enumerate() {
                let original = qr.col_order()[pivot_pos];
                solution.set(original, t, w.get(i, 0));
            }
        }
    }

    Ok(LeastSquares { solution, rank })
}

/// Ordinary least squares for `labels ≈ features·W + b`.
///
/// Appends a constant bias column to `features` and solves with
/// [`least_squares`]. The result is flattened row-major as
/// `(features.cols() + 1) × labels.cols()`, with the bias row last. That is
/// exactly the weight layout of a Linear layer, so it can be copied straight
/// into one.
pub fn ols(features: &Matrix, labels: &Matrix) -> Result<Vec<f64>> {
    let x = features.with_bias_column();
    Ok(least_squares(&x, labels)?.solution.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeededRng;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_square_full_rank_system() {
        let a = Matrix::from_rows(&[vec![2.0, 1.0], vec![1.0, 3.0]]).unwrap();
        let y = Matrix::from_rows(&[vec![3.0], vec![5.0]]).unwrap();
        let ls = least_squares(&a, &y).unwrap();
        assert_eq!(ls.rank, 2);
        assert_abs_diff_eq!(ls.solution.get(0, 0), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(ls.solution.get(1, 0), 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_overdetermined_fit_of_a_line() {
        // y = 2x + 1 sampled exactly
        let a = Matrix::from_rows(&[
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, 1.0],
            vec![3.0, 1.0],
        ])
        .unwrap();
        let y = Matrix::from_rows(&[vec![1.0], vec![3.0], vec![5.0], vec![7.0]]).unwrap();
        let ls = least_squares(&a, &y).unwrap();
        assert_abs_diff_eq!(ls.solution.get(0, 0), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ls.solution.get(1, 0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_multiple_right_hand_sides() {
        let mut rng = SeededRng::new(5);
        let a = Matrix::random_normal(8, 3, &mut rng);
        let x = Matrix::from_rows(&[vec![1.0, -1.0], vec![0.5, 2.0], vec![-3.0, 0.0]]).unwrap();
        let mut y = Matrix::new(8, 2);
        for i in 0..8 {
            for t in 0..2 {
                let v: f64 = (0..3).map(|j| a.get(i, j) * x.get(j, t)).sum();
                y.set(i, t, v);
            }
        }
        let ls = least_squares(&a, &y).unwrap();
        for j in 0..3 {
            for t in 0..2 {
                assert_abs_diff_eq!(ls.solution.get(j, t), x.get(j, t), epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_badly_scaled_rows() {
        let a = Matrix::from_rows(&[
            vec![1e-8, 2e-8],
            vec![1e8, -1e8],
            vec![3.0, 1.0],
        ])
        .unwrap();
        let truth = [0.25, -0.75];
        let mut y = Matrix::new(3, 1);
        for i in 0..3 {
            y.set(i, 0, a.get(i, 0) * truth[0] + a.get(i, 1) * truth[1]);
        }
        let ls = least_squares(&a, &y).unwrap();
        assert_abs_diff_eq!(ls.solution.get(0, 0), truth[0], epsilon = 1e-6);
        assert_abs_diff_eq!(ls.solution.get(1, 0), truth[1], epsilon = 1e-6);
    }

    #[test]
    fn test_duplicated_column_gives_minimum_norm_solution() {
        // columns: x0, x0, x1 with x0 an axis vector, so the duplicate
        // reflects to an exactly zero column
        let x0 = [3.0, 0.0, 0.0, 0.0];
        let x1 = [1.0, 2.0, 0.0, 1.0];
        let mut a = Matrix::new(4, 3);
        let mut y = Matrix::new(4, 1);
        for i in 0..4 {
            a.set(i, 0, x0[i]);
            a.set(i, 1, x0[i]);
            a.set(i, 2, x1[i]);
            // exact solutions are (t, 2 - t, 2)
            y.set(i, 0, 2.0 * x0[i] + 2.0 * x1[i]);
        }
        let ls = least_squares(&a, &y).unwrap();
        assert_eq!(ls.rank, 2);
        assert!(ls.is_rank_deficient());
        assert_abs_diff_eq!(ls.solution.get(0, 0), 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(ls.solution.get(1, 0), 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(ls.solution.get(2, 0), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_underdetermined_system_is_minimum_norm() {
        // x + y + z = 3 has minimum-norm solution (1, 1, 1)
        let a = Matrix::from_rows(&[vec![1.0, 1.0, 1.0]]).unwrap();
        let y = Matrix::from_rows(&[vec![3.0]]).unwrap();
        let ls = least_squares(&a, &y).unwrap();
        assert_eq!(ls.rank, 1);
        for j in 0..3 {
            assert_abs_diff_eq!(ls.solution.get(j, 0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_matrix_has_rank_zero() {
        let a = Matrix::new(3, 2);
        let y = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let ls = least_squares(&a, &y).unwrap();
        assert_eq!(ls.rank, 0);
        assert!(ls.solution.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rejects_nan_and_row_mismatch() {
        let mut a = Matrix::new(2, 2);
        a.set(0, 0, f64::NAN);
        let y = Matrix::new(2, 1);
        assert!(matches!(least_squares(&a, &y), Err(Error::NonFinite(_))));
        let y3 = Matrix::new(3, 1);
        assert!(matches!(
            least_squares(&Matrix::new(2, 2), &y3),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_ols_layout_is_linear_layer_weights() {
        // labels = 3*f0 - f1 + 0.5
        let features = Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![2.0, 3.0],
        ])
        .unwrap();
        let mut labels = Matrix::new(4, 1);
        for i in 0..4 {
            labels.set(i, 0, 3.0 * features.get(i, 0) - features.get(i, 1) + 0.5);
        }
        let w = ols(&features, &labels).unwrap();
        assert_eq!(w.len(), 3);
        assert_abs_diff_eq!(w[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[1], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[2], 0.5, epsilon = 1e-12);
    }
}
