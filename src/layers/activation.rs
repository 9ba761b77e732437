//! Elementwise Activation Units
//!
//! These units have no weights and never change the shape of their input:
//! output `i` depends only on input `i`. Backpropagation therefore multiplies
//! the downstream blame elementwise by the local derivative.
//!
//! ## Units
//!
//! ```text
//! Identity        a = x                 a' = 1
//! Tanh            a = tanh(x)           a' = 1 - a²
//! LeakyRectifier  a = x      (x >= 0)   a' = 1
//!                 a = 0.01x  (x <  0)   a' = 0.01
//! Sinusoidal      a = sin(x) (i < n)    a' = cos(x)
//!                 a = x      (i >= n)   a' = 1
//! ```
//!
//! Tanh and the leaky rectifier recover their derivative from the cached
//! activation alone (`0.01x < 0` exactly when `x < 0`). The sinusoidal unit
//! caches `cos(x)` during the forward pass because `sin` is not invertible.

/// Slope of the leaky rectifier for negative inputs.
pub const LEAK: f64 = 0.01;

/// Copy input to output.
pub fn identity_forward(x: &[f64], out: &mut [f64]) {
    out.copy_from_slice(x);
}

/// Identity derivative: the blame passes through unchanged.
pub fn identity_backward(blame: &[f64], prev_blame: &mut [f64]) {
    prev_blame.copy_from_slice(blame);
}

/// Hyperbolic tangent (forward pass)
///
/// # Arguments
///
/// * `x` - Layer input
/// * `out` - Receives `tanh(x)`; same length as `x`
pub fn tanh_forward(x: &[f64], out: &mut [f64]) {
    for (o, &v) in out.iter_mut().zip(x) {
        *o = v.tanh();
    }
}

/// Hyperbolic tangent (backward pass)
///
/// Uses the identity `d/dx tanh(x) = 1 - tanh(x)²`, so only the cached
/// activation is needed.
///
/// # Arguments
///
/// * `activation` - Output of [`tanh_forward`]
/// * `blame` - Downstream blame
/// * `prev_blame` - Receives `(1 - a²) * blame`
pub fn tanh_backward(activation: &[f64], blame: &[f64], prev_blame: &mut [f64]) {
    for ((p, &a), &b) in prev_blame.iter_mut().zip(activation).zip(blame) {
        *p = (1.0 - a * a) * b;
    }
}

pub fn leaky_rectifier_forward(x: &[f64], out: &mut [f64]) {
    for (o, &v) in out.iter_mut().zip(x) {
        *o = if v < 0.0 { LEAK * v } else { v };
    }
}

pub fn leaky_rectifier_backward(activation: &[f64], blame: &[f64], prev_blame: &mut [f64]) {
    for ((p, &a), &b) in prev_blame.iter_mut().zip(activation).zip(blame) {
        *p = if a < 0.0 { LEAK * b } else { b };
    }
}

/// Sine on the leading `num_sin` inputs, identity on the rest.
///
/// Caches `cos(x)` for the sine outputs.
#[derive(Clone, Debug)]
pub struct Sinusoidal {
    num_sin: usize,
    derivative: Vec<f64>,
}

impl Sinusoidal {
    pub fn new(num_sin: usize) -> Self {
        Self {
            num_sin,
            derivative: vec![0.0; num_sin],
        }
    }

    pub fn num_sin(&self) -> usize {
        self.num_sin
    }

    pub fn forward(&mut self, x: &[f64], out: &mut [f64]) {
        let n = self.num_sin;
        for i in 0..n {
            out[i] = x[i].sin();
            self.derivative[i] = x[i].cos();
        }
        out[n..].copy_from_slice(&x[n..]);
    }

    pub fn backward(&self, blame: &[f64], prev_blame: &mut [f64]) {
        let n = self.num_sin;
        for i in 0..n {
            prev_blame[i] = blame[i] * self.derivative[i];
        }
        prev_blame[n..].copy_from_slice(&blame[n..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_passes_values_and_blame() {
        let x = vec![-1.5, 0.0, 2.0];
        let mut out = vec![0.0; 3];
        identity_forward(&x, &mut out);
        assert_eq!(out, x);

        let blame = vec![0.1, -0.2, 0.3];
        let mut prev = vec![9.0; 3];
        identity_backward(&blame, &mut prev);
        assert_eq!(prev, blame);
    }

    #[test]
    fn test_tanh_at_zero() {
        let mut a = vec![1.0];
        tanh_forward(&[0.0], &mut a);
        assert_eq!(a[0], 0.0);
        let mut prev = vec![0.0];
        tanh_backward(&a, &[1.0], &mut prev);
        assert_eq!(prev[0], 1.0);
    }

    #[test]
    fn test_tanh_derivative_is_one_minus_square() {
        let x = vec![-2.0, -0.3, 0.7, 1.9];
        let mut a = vec![0.0; 4];
        tanh_forward(&x, &mut a);
        let mut prev = vec![0.0; 4];
        tanh_backward(&a, &[1.0; 4], &mut prev);
        for i in 0..4 {
            assert_abs_diff_eq!(prev[i], 1.0 - x[i].tanh().powi(2), epsilon = 1e-15);
        }
    }

    #[test]
    fn test_leaky_rectifier() {
        let x = vec![-3.0, 0.0, 2.5];
        let mut a = vec![0.0; 3];
        leaky_rectifier_forward(&x, &mut a);
        assert_abs_diff_eq!(a[0], -0.03, epsilon = 1e-15);
        assert_eq!(a[1], 0.0);
        assert_eq!(a[2], 2.5);

        let mut prev = vec![0.0; 3];
        leaky_rectifier_backward(&a, &[2.0, 2.0, 2.0], &mut prev);
        assert_abs_diff_eq!(prev[0], 0.02, epsilon = 1e-15);
        assert_eq!(prev[1], 2.0);
        assert_eq!(prev[2], 2.0);
    }

    #[test]
    fn test_sinusoidal_splits_sine_and_identity() {
        let mut unit = Sinusoidal::new(2);
        let x = vec![0.5, -1.0, 3.0];
        let mut a = vec![0.0; 3];
        unit.forward(&x, &mut a);
        assert_abs_diff_eq!(a[0], 0.5f64.sin());
        assert_abs_diff_eq!(a[1], (-1.0f64).sin());
        assert_eq!(a[2], 3.0);

        let mut prev = vec![0.0; 3];
        unit.backward(&[1.0, 2.0, 3.0], &mut prev);
        assert_abs_diff_eq!(prev[0], 0.5f64.cos());
        assert_abs_diff_eq!(prev[1], 2.0 * (-1.0f64).cos());
        assert_eq!(prev[2], 3.0);
    }
}
