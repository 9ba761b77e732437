//! Tensor Views and N-Dimensional Convolution
//!
//! A tensor here owns no data. [`TensorView`] and [`TensorViewMut`] pair a
//! caller-owned flat slice with a `dims` shape and interpret the slice as an
//! N-dimensional array. Convolution layers use them to look at a layer's
//! activation, blame or weight buffer as a feature map or a filter bank.
//!
//! ## Core Concepts
//!
//! - **Data**: Flat `&[f64]` borrowed from a layer buffer
//! - **Dims**: Extent of each axis (e.g. `[width, height, channels]`)
//! - **Strides**: Step sizes for each axis, computed from dims
//!
//! ## Memory Layout
//!
//! Axis 0 varies fastest. For dims `[3, 2]` the data is stored as
//! `[(0,0), (1,0), (2,0), (0,1), (1,1), (2,1)]` and the strides are `[1, 3]`.
//! Putting the filter count on the last axis therefore keeps each filter's
//! output map contiguous.
//!
//! ## Convolution
//!
//! [`convolve`] computes a cross-correlation (or a true convolution when the
//! filter is flipped) with a uniform stride and symmetric zero padding:
//!
//! ```text
//! padding[a] = (stride * (out[a] - 1) + filter[a] - in[a]) / 2
//! out[o]    += Σ_k in[o * stride + k - padding] * filter[k]
//! ```
//!
//! Input positions that fall in the padding are skipped, so the kernel never
//! reads outside `input`, `filter` or `output`.

use crate::error::{check_len, Error, Result};

/// Number of elements described by `dims`.
pub fn volume(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Compute strides from dims (axis 0 fastest).
///
/// For dims `[d0, d1, d2]`, strides are `[1, d0, d0*d1]`.
pub fn compute_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for i in 1..dims.len() {
        strides[i] = strides[i - 1] * dims[i - 1];
    }
    strides
}

/// Advance a multi-index like an odometer. Returns `false` after the last
/// position has been visited (and leaves `index` back at all zeros).
fn advance(index: &mut [usize], dims: &[usize]) -> bool {
    for (i, d) in index.iter_mut().zip(dims) {
        *i += 1;
        if *i < *d {
            return true;
        }
        *i = 0;
    }
    false
}

fn check_dims(context: &'static str, data_len: usize, dims: &[usize]) -> Result<()> {
    if dims.is_empty() || dims.contains(&0) {
        return Err(Error::InvalidShape(format!(
            "{}: dims {:?} must be non-empty and positive",
            context, dims
        )));
    }
    check_len(context, volume(dims), data_len)
}

/// Read-only N-dimensional view over a flat slice.
#[derive(Clone, Copy, Debug)]
pub struct TensorView<'a> {
    data: &'a [f64],
    dims: &'a [usize],
}

impl<'a> TensorView<'a> {
    /// Wrap `data` with shape `dims`.
    ///
    /// # Errors
    ///
    /// Fails if any extent is zero or `volume(dims) != data.len()`.
    pub fn new(data: &'a [f64], dims: &'a [usize]) -> Result<Self> {
        check_dims("TensorView", data.len(), dims)?;
        Ok(Self { data, dims })
    }

    pub fn data(&self) -> &'a [f64] {
        self.data
    }

    pub fn dims(&self) -> &'a [usize] {
        self.dims
    }

    /// Element at a multi-index.
    pub fn get(&self, index: &[usize]) -> f64 {
        let offset: usize = index
            .iter()
            .zip(compute_strides(self.dims))
            .map(|(i, s)| i * s)
            .sum();
        self.data[offset]
    }
}

/// Mutable N-dimensional view over a flat slice.
#[derive(Debug)]
pub struct TensorViewMut<'a> {
    data: &'a mut [f64],
    dims: &'a [usize],
}

impl<'a> TensorViewMut<'a> {
    pub fn new(data: &'a mut [f64], dims: &'a [usize]) -> Result<Self> {
        check_dims("TensorViewMut", data.len(), dims)?;
        Ok(Self { data, dims })
    }

    pub fn data(&self) -> &[f64] {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut *self.data
    }

    pub fn dims(&self) -> &[usize] {
        self.dims
    }
}

/// Convolve `input` with `filter`, accumulating into `output`.
///
/// All three tensors must have the same number of axes. With
/// `flip_filter = true` the filter is reversed along every axis, which turns
/// the correlation into a convolution (this is the transpose used when
/// propagating blame back through a convolution layer).
///
/// `output` is added to, not overwritten; zero it first for a plain result.
///
/// # Arguments
///
/// * `input` - Tensor being scanned
/// * `filter` - Kernel
/// * `output` - Accumulator; its dims decide the padding
/// * `flip_filter` - Reverse the kernel
/// * `stride` - Step between neighbouring output cells, in input cells
pub fn convolve(
    input: &TensorView<'_>,
    filter: &TensorView<'_>,
    output: &mut TensorViewMut<'_>,
    flip_filter: bool,
    stride: usize,
) -> Result<()> {
    let dc = input.dims.len();
    if filter.dims.len() != dc || output.dims.len() != dc {
        return Err(Error::InvalidShape(format!(
            "convolve: tensors need the same number of axes, got {:?}, {:?}, {:?}",
            input.dims, filter.dims, output.dims
        )));
    }
    if stride == 0 {
        return Err(Error::InvalidConfig("convolve: stride must be positive".into()));
    }

    let in_strides = compute_strides(input.dims);
    let padding: Vec<isize> = (0..dc)
        .map(|a| {
            let reach = (stride * (output.dims[a] - 1) + filter.dims[a]) as isize;
            (reach - input.dims[a] as isize) / 2
        })
        .collect();
    let filter_tail = filter.data.len() - 1;

    let mut out_index = vec![0usize; dc];
    let mut k = vec![0usize; dc];
    let mut op = 0;
    loop {
        let mut val = 0.0;
        let mut fp = 0;
        loop {
            let mut ip = 0;
            let mut inside = true;
            for a in 0..dc {
                let pos = (out_index[a] * stride + k[a]) as isize - padding[a];
                if pos < 0 || pos >= input.dims[a] as isize {
                    inside = false;
                    break;
                }
                ip += pos as usize * in_strides[a];
            }
            if inside {
                let f = if flip_filter {
                    filter.data[filter_tail - fp]
                } else {
                    filter.data[fp]
                };
                val += input.data[ip] * f;
            }
            fp += 1;
            if !advance(&mut k, filter.dims) {
                break;
            }
        }
        output.data[op] += val;
        op += 1;
        if !advance(&mut out_index, output.dims) {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_strides_axis_zero_fastest() {
        assert_eq!(compute_strides(&[3, 4, 5]), vec![1, 3, 12]);
        assert_eq!(volume(&[3, 4, 5]), 60);
    }

    #[test]
    fn test_view_rejects_size_mismatch() {
        let data = vec![0.0; 5];
        assert!(TensorView::new(&data, &[2, 3]).is_err());
        assert!(TensorView::new(&data, &[5, 0]).is_err());
    }

    #[test]
    fn test_view_indexing() {
        let data: Vec<f64> = (0..6).map(f64::from).collect();
        let t = TensorView::new(&data, &[3, 2]).unwrap();
        assert_eq!(t.get(&[2, 0]), 2.0);
        assert_eq!(t.get(&[0, 1]), 3.0);
    }

    #[test]
    fn test_one_dimensional_correlation_same_size() {
        let input = vec![1.0, 2.0, 3.0, 4.0];
        let filter = vec![1.0, 0.0, -1.0];
        let mut out = vec![0.0; 4];
        convolve(
            &TensorView::new(&input, &[4]).unwrap(),
            &TensorView::new(&filter, &[3]).unwrap(),
            &mut TensorViewMut::new(&mut out, &[4]).unwrap(),
            false,
            1,
        )
        .unwrap();
        // out[o] = in[o-1] - in[o+1], zero outside
        assert_eq!(out, vec![-2.0, -2.0, -2.0, 3.0]);
    }

    #[test]
    fn test_flipped_filter_is_true_convolution() {
        let input = vec![1.0, 2.0, 3.0, 4.0];
        let filter = vec![1.0, 0.0, -1.0];
        let mut out = vec![0.0; 4];
        convolve(
            &TensorView::new(&input, &[4]).unwrap(),
            &TensorView::new(&filter, &[3]).unwrap(),
            &mut TensorViewMut::new(&mut out, &[4]).unwrap(),
            true,
            1,
        )
        .unwrap();
        assert_eq!(out, vec![2.0, 2.0, 2.0, -3.0]);
    }

    #[test]
    fn test_ones_filter_interior_equals_filter_volume() {
        let dims = [5, 6, 4];
        let fdims = [3, 3, 3];
        let input = vec![1.0; volume(&dims)];
        let filter = vec![1.0; volume(&fdims)];
        let mut out = vec![0.0; volume(&dims)];
        convolve(
            &TensorView::new(&input, &dims).unwrap(),
            &TensorView::new(&filter, &fdims).unwrap(),
            &mut TensorViewMut::new(&mut out, &dims).unwrap(),
            false,
            1,
        )
        .unwrap();
        let view = TensorView::new(&out, &dims).unwrap();
        for x in 1..4 {
            for y in 1..5 {
                for z in 1..3 {
                    assert_abs_diff_eq!(view.get(&[x, y, z]), 27.0);
                }
            }
        }
        // a corner only sees 2x2x2 of the input
        assert_abs_diff_eq!(view.get(&[0, 0, 0]), 8.0);
    }

    #[test]
    fn test_stride_two_downsamples() {
        let input: Vec<f64> = (0..6).map(f64::from).collect();
        let filter = vec![1.0, 1.0];
        let mut out = vec![0.0; 3];
        // padding = (2*2 + 2 - 6) / 2 = 0
        convolve(
            &TensorView::new(&input, &[6]).unwrap(),
            &TensorView::new(&filter, &[2]).unwrap(),
            &mut TensorViewMut::new(&mut out, &[3]).unwrap(),
            false,
            2,
        )
        .unwrap();
        assert_eq!(out, vec![1.0, 5.0, 9.0]);
    }

    #[test]
    fn test_convolve_accumulates() {
        let input = vec![1.0, 1.0];
        let filter = vec![1.0];
        let mut out = vec![10.0, 20.0];
        convolve(
            &TensorView::new(&input, &[2]).unwrap(),
            &TensorView::new(&filter, &[1]).unwrap(),
            &mut TensorViewMut::new(&mut out, &[2]).unwrap(),
            false,
            1,
        )
        .unwrap();
        assert_eq!(out, vec![11.0, 21.0]);
    }

    #[test]
    fn test_axis_count_mismatch_is_rejected() {
        let input = vec![0.0; 4];
        let filter = vec![0.0; 3];
        let mut out = vec![0.0; 4];
        let result = convolve(
            &TensorView::new(&input, &[2, 2]).unwrap(),
            &TensorView::new(&filter, &[3]).unwrap(),
            &mut TensorViewMut::new(&mut out, &[2, 2]).unwrap(),
            false,
            1,
        );
        assert!(result.is_err());
    }
}
