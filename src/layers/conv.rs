//! N-Dimensional Convolution Layer
//!
//! A bank of `k` filters, each convolved over the whole input. The output
//! keeps the input's spatial shape and adds a trailing axis of length `k`:
//!
//! ```text
//! input  dims: [d0, d1, .., dn]
//! filter dims: [f0, f1, .., fn, k]    fi odd
//! output dims: [d0, d1, .., dn, k]
//! ```
//!
//! Filter `t` is the contiguous block `weight[t * F..(t + 1) * F]` with
//! `F = f0 * .. * fn`, and output map `t` is the contiguous block
//! `activation[t * D..(t + 1) * D]` with `D = d0 * .. * dn`. There is no bias.
//!
//! ## Passes
//!
//! ```text
//! forward:  out_t        = correlate(input, filter_t)
//! backward: prev_blame  += convolve(blame_t, flip(filter_t))   for every t
//! gradient: grad_t      += correlate(input, blame_t)
//! ```
//!
//! Every call uses stride 1 with symmetric zero padding `(fi - 1) / 2`, which
//! is why the spatial filter extents must be odd.

use super::Dims;
use crate::error::{Error, Result};
use crate::tensor::{convolve, volume, TensorView, TensorViewMut};

#[derive(Clone, Debug)]
pub struct Convolution {
    input_dims: Dims,
    kernel_dims: Dims,
    filters: usize,
}

impl Convolution {
    /// Validate the three shapes and build the unit.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidShape`] unless `len(filter) == len(output) == len(input) + 1`,
    /// `filter[last] == output[last]`, `output[..last] == input`, and every
    /// spatial filter extent is odd.
    pub fn new(input_dims: &[usize], filter_dims: &[usize], output_dims: &[usize]) -> Result<Self> {
        let dc = input_dims.len();
        if dc == 0 || filter_dims.len() != dc + 1 || output_dims.len() != dc + 1 {
            return Err(Error::InvalidShape(format!(
                "convolution: need len(filter) == len(output) == len(input) + 1, got {:?}, {:?}, {:?}",
                input_dims, filter_dims, output_dims
            )));
        }
        if filter_dims[dc] != output_dims[dc] {
            return Err(Error::InvalidShape(format!(
                "convolution: filter count {} does not match output channels {}",
                filter_dims[dc], output_dims[dc]
            )));
        }
        if output_dims[..dc] != *input_dims {
            return Err(Error::InvalidShape(format!(
                "convolution: output spatial dims {:?} must equal input dims {:?}",
                &output_dims[..dc],
                input_dims
            )));
        }
        if filter_dims.contains(&0) || input_dims.contains(&0) {
            return Err(Error::InvalidShape("convolution: zero-sized axis".into()));
        }
        if let Some(even) = filter_dims[..dc].iter().find(|&&f| f % 2 == 0) {
            return Err(Error::InvalidShape(format!(
                "convolution: filter extent {} is even; extents must be odd",
                even
            )));
        }
        Ok(Self {
            input_dims: input_dims.to_vec(),
            kernel_dims: filter_dims[..dc].to_vec(),
            filters: filter_dims[dc],
        })
    }

    pub fn filters(&self) -> usize {
        self.filters
    }

    pub fn kernel_dims(&self) -> &[usize] {
        &self.kernel_dims
    }

    /// Inputs that feed one output cell.
    pub fn fan_in(&self) -> usize {
        volume(&self.kernel_dims)
    }

    pub fn weight_len(&self) -> usize {
        volume(&self.kernel_dims) * self.filters
    }

    pub fn forward(&self, x: &[f64], weight: &[f64], out: &mut [f64]) -> Result<()> {
        let input = TensorView::new(x, &self.input_dims)?;
        out.fill(0.0);
        let map = volume(&self.input_dims);
        let kernel = volume(&self.kernel_dims);
        for (filter, block) in weight.chunks_exact(kernel).zip(out.chunks_exact_mut(map)) {
            let filter = TensorView::new(filter, &self.kernel_dims)?;
            let mut block = TensorViewMut::new(block, &self.input_dims)?;
            convolve(&input, &filter, &mut block, false, 1)?;
        }
        Ok(())
    }

    pub fn backward(&self, weight: &[f64], blame: &[f64], prev_blame: &mut [f64]) -> Result<()> {
        prev_blame.fill(0.0);
        let mut prev = TensorViewMut::new(prev_blame, &self.input_dims)?;
        let map = volume(&self.input_dims);
        let kernel = volume(&self.kernel_dims);
        for (filter, block) in weight.chunks_exact(kernel).zip(blame.chunks_exact(map)) {
            let filter = TensorView::new(filter, &self.kernel_dims)?;
            let block = TensorView::new(block, &self.input_dims)?;
            convolve(&block, &filter, &mut prev, true, 1)?;
        }
        Ok(())
    }

    pub fn update_gradient(&self, x: &[f64], blame: &[f64], gradient: &mut [f64]) -> Result<()> {
        let input = TensorView::new(x, &self.input_dims)?;
        let map = volume(&self.input_dims);
        let kernel = volume(&self.kernel_dims);
        for (grad, block) in gradient.chunks_exact_mut(kernel).zip(blame.chunks_exact(map)) {
            let block = TensorView::new(block, &self.input_dims)?;
            let mut grad = TensorViewMut::new(grad, &self.kernel_dims)?;
            convolve(&input, &block, &mut grad, false, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_shape_validation() {
        assert!(Convolution::new(&[4, 4], &[3, 3, 2], &[4, 4, 2]).is_ok());
        // filter count disagrees with output channels
        assert!(Convolution::new(&[4, 4], &[3, 3, 2], &[4, 4, 3]).is_err());
        // wrong rank
        assert!(Convolution::new(&[4, 4], &[3, 2], &[4, 4, 2]).is_err());
        // even extent
        assert!(Convolution::new(&[4, 4], &[2, 3, 1], &[4, 4, 1]).is_err());
        // spatial shape changes
        assert!(Convolution::new(&[4, 4], &[3, 3, 1], &[3, 4, 1]).is_err());
    }

    #[test]
    fn test_two_filters_write_separate_maps() {
        let conv = Convolution::new(&[3], &[3, 2], &[3, 2]).unwrap();
        // filter 0 sums neighbours, filter 1 picks the centre
        let weight = vec![1.0, 1.0, 1.0, 0.0, 2.0, 0.0];
        let mut out = vec![7.0; 6];
        conv.forward(&[1.0, 2.0, 3.0], &weight, &mut out).unwrap();
        assert_eq!(out, vec![3.0, 6.0, 5.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_backward_is_transpose_of_forward() {
        // <forward(x), b> == <x, backward(b)> for a linear map
        let conv = Convolution::new(&[4], &[3, 2], &[4, 2]).unwrap();
        let weight = vec![0.5, -1.0, 2.0, 1.5, 0.25, -0.75];
        let x = vec![1.0, -2.0, 0.5, 3.0];
        let b = vec![0.3, -0.1, 0.7, 1.1, -0.4, 0.9, 0.2, -0.6];

        let mut y = vec![0.0; 8];
        conv.forward(&x, &weight, &mut y).unwrap();
        let mut xb = vec![0.0; 4];
        conv.backward(&weight, &b, &mut xb).unwrap();

        let lhs: f64 = y.iter().zip(&b).map(|(p, q)| p * q).sum();
        let rhs: f64 = x.iter().zip(&xb).map(|(p, q)| p * q).sum();
        assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_matches_activation_derivative() {
        // d<forward(x; w), b>/dw == update_gradient(x, b)
        let conv = Convolution::new(&[5], &[3, 1], &[5, 1]).unwrap();
        let x = vec![1.0, 2.0, -1.0, 0.5, 4.0];
        let b = vec![0.2, -0.3, 0.1, 0.4, -0.5];
        let weight = vec![0.1, 0.2, 0.3];

        let mut grad = vec![0.0; 3];
        conv.update_gradient(&x, &b, &mut grad).unwrap();

        let h = 1e-6;
        for k in 0..3 {
            let mut wp = weight.clone();
            wp[k] += h;
            let mut wm = weight.clone();
            wm[k] -= h;
            let mut yp = vec![0.0; 5];
            let mut ym = vec![0.0; 5];
            conv.forward(&x, &wp, &mut yp).unwrap();
            conv.forward(&x, &wm, &mut ym).unwrap();
            let dp: f64 = yp.iter().zip(&b).map(|(p, q)| p * q).sum();
            let dm: f64 = ym.iter().zip(&b).map(|(p, q)| p * q).sum();
            assert_abs_diff_eq!(grad[k], (dp - dm) / (2.0 * h), epsilon = 1e-8);
        }
    }
}
