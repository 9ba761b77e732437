//! 2-D Max Pooling
//!
//! Fixed 2×2 window with stride 2 over the first two axes. Any further axes
//! (channels, filters) are pooled independently, so input dims
//! `[w, h, c..]` become output dims `[w/2, h/2, c..]`.
//!
//! The forward pass records, for every output cell, the absolute input index
//! that won. Backpropagation sends each output blame to that index only.
//! Ties keep the first candidate in the scan order `(0,0), (1,0), (0,1), (1,1)`.

use super::Dims;
use crate::error::{Error, Result};
use crate::tensor::volume;

#[derive(Clone, Debug)]
pub struct MaxPooling2D {
    input_dims: Dims,
    max_index: Vec<usize>,
}

impl MaxPooling2D {
    /// # Errors
    ///
    /// [`Error::InvalidShape`] if there are fewer than two axes or either of
    /// the first two extents is zero or odd.
    pub fn new(input_dims: &[usize]) -> Result<Self> {
        if input_dims.len() < 2
            || input_dims[..2].iter().any(|&d| d == 0 || d % 2 != 0)
            || input_dims.contains(&0)
        {
            return Err(Error::InvalidShape(format!(
                "max pooling: input dims {:?} need two leading even axes",
                input_dims
            )));
        }
        Ok(Self {
            input_dims: input_dims.to_vec(),
            max_index: vec![0; volume(input_dims) / 4],
        })
    }

    pub fn output_dims(&self) -> Dims {
        let mut out = self.input_dims.clone();
        out[0] /= 2;
        out[1] /= 2;
        out
    }

    /// Winning input index per output cell from the last forward pass.
    pub fn max_index(&self) -> &[usize] {
        &self.max_index
    }

    pub fn forward(&mut self, x: &[f64], out: &mut [f64]) {
        let w = self.input_dims[0];
        let h = self.input_dims[1];
        let (ow, oh) = (w / 2, h / 2);
        let planes = out.len() / (ow * oh);

        let mut o = 0;
        for p in 0..planes {
            let base = p * w * h;
            for r in 0..oh {
                for c in 0..ow {
                    let top = base + 2 * r * w + 2 * c;
                    let mut best = top;
                    for candidate in [top + 1, top + w, top + w + 1] {
                        if x[candidate] > x[best] {
                            best = candidate;
                        }
                    }
                    self.max_index[o] = best;
                    out[o] = x[best];
                    o += 1;
                }
            }
        }
    }

    pub fn backward(&self, blame: &[f64], prev_blame: &mut [f64]) {
        prev_blame.fill(0.0);
        for (&i, &b) in self.max_index.iter().zip(blame) {
            prev_blame[i] = b;
        }
    }
}
