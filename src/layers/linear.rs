//! Linear Layer (Fully Connected)
//!
//! The linear layer performs an affine transformation using the bias trick:
//! the input is augmented with a constant `1`, so the bias is just the last
//! row of the weight matrix.
//!
//! ## Forward Pass
//!
//! ```text
//! Input:  x [in]
//! Weight: W [(in + 1), out]   row-major, bias row last
//! Output: a[j] = Σ_i x[i] * W[i, j] + W[in, j]
//! ```
//!
//! ## Backward Pass
//!
//! With `blame` the downstream error signal:
//!
//! ```text
//! prev_blame[i] = Σ_j W[i, j] * blame[j]      (bias row excluded)
//! grad[i, j]   += x[i] * blame[j]
//! grad[in, j]  += blame[j]
//! ```
//!
//! ## Regularization
//!
//! An optional [`Regularization`] adds L1 and L2 penalties to the non-bias
//! rows during gradient accumulation. The gradient in this crate points in the
//! direction that reduces the error (it is added to the weights), so the
//! penalty terms are subtracted:
//!
//! ```text
//! grad[i, j] += x[i] * blame[j] - l2 * W[i, j] - l1 * sign(W[i, j])
//! ```
//!
//! Both coefficients are rational numbers (`numerator / denominator`), which
//! keeps configuration files exact.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A penalty coefficient written as `numerator / denominator`, e.g. `3/2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: i64,
    pub denominator: i64,
}

impl Ratio {
    pub const ZERO: Ratio = Ratio {
        numerator: 0,
        denominator: 1,
    };

    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        let ratio = Self {
            numerator,
            denominator,
        };
        ratio.validate()?;
        Ok(ratio)
    }

    pub fn validate(&self) -> Result<()> {
        if self.denominator == 0 {
            return Err(Error::InvalidConfig(format!(
                "ratio {}/0 has a zero denominator",
                self.numerator
            )));
        }
        Ok(())
    }

    pub fn value(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// L1 and L2 penalty coefficients for a linear layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regularization {
    pub l1: Ratio,
    pub l2: Ratio,
}

impl Regularization {
    pub fn l1(l1: Ratio) -> Self {
        Self { l1, l2: Ratio::ZERO }
    }

    pub fn l2(l2: Ratio) -> Self {
        Self { l1: Ratio::ZERO, l2 }
    }

    pub fn validate(&self) -> Result<()> {
        self.l1.validate()?;
        self.l2.validate()
    }
}

/// Shape and penalty of a linear unit. The weights live in the owning
/// [`crate::layers::Layer`].
#[derive(Clone, Debug)]
pub struct Linear {
    inputs: usize,
    outputs: usize,
    regularization: Option<Regularization>,
}

impl Linear {
    pub fn new(inputs: usize, outputs: usize, regularization: Option<Regularization>) -> Self {
        Self {
            inputs,
            outputs,
            regularization,
        }
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn regularization(&self) -> Option<&Regularization> {
        self.regularization.as_ref()
    }

    /// Number of weights: `(inputs + 1) * outputs`.
    pub fn weight_len(&self) -> usize {
        (self.inputs + 1) * self.outputs
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `x` - Input of length `inputs`
    /// * `weight` - Flattened `(inputs + 1) × outputs` weights, bias row last
    /// * `out` - Receives the activation, length `outputs`
    pub fn forward(&self, x: &[f64], weight: &[f64], out: &mut [f64]) {
        let n = self.outputs;
        out.copy_from_slice(&weight[self.inputs * n..]);
        for (i, &xi) in x.iter().enumerate() {
            let row = &weight[i * n..(i + 1) * n];
            for (o, &w) in out.iter_mut().zip(row) {
                *o += xi * w;
            }
        }
    }

    /// Backward pass: `prev_blame = W · blame` over the non-bias rows.
    pub fn backward(&self, weight: &[f64], blame: &[f64], prev_blame: &mut [f64]) {
        let n = self.outputs;
        for (i, p) in prev_blame.iter_mut().enumerate() {
            let row = &weight[i * n..(i + 1) * n];
            *p = row.iter().zip(blame).map(|(w, b)| w * b).sum();
        }
    }

    /// Accumulate the outer product `[x, 1] ⊗ blame` (minus any penalty)
    /// into `gradient`.
    pub fn update_gradient(&self, x: &[f64], weight: &[f64], blame: &[f64], gradient: &mut [f64]) {
        let n = self.outputs;
        let (l1, l2) = self
            .regularization
            .map_or((0.0, 0.0), |r| (r.l1.value(), r.l2.value()));

        for (i, &xi) in x.iter().enumerate() {
            let range = i * n..(i + 1) * n;
            let row = &mut gradient[range.clone()];
            for ((g, &b), &w) in row.iter_mut().zip(blame).zip(&weight[range]) {
                let sign = if w > 0.0 {
                    1.0
                } else if w < 0.0 {
                    -1.0
                } else {
                    0.0
                };
                *g += xi * b - l2 * w - l1 * sign;
            }
        }
        let bias = &mut gradient[self.inputs * n..];
        for (g, &b) in bias.iter_mut().zip(blame) {
            *g += b;
        }
    }
}
