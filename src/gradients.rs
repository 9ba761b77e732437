//! Gradient Container and Utilities
//!
//! A [`Gradient`] holds one flat buffer per network layer, each the same
//! length as that layer's weight (empty for unparametrized layers). It is
//! created once per network topology and reused across batches:
//!
//! ```text
//! begin batch:   gradient *= momentum        (momentum = 0 resets it)
//! every row:     gradient += ∂activation/∂weight · blame
//! end of batch:  weight   += rate * gradient
//! ```
//!
//! ## Gradient Clipping
//!
//! Occasional rows with large errors can produce a gradient that throws the
//! weights far away from where they were. Clipping scales the whole gradient
//! down when its global L2 norm exceeds a threshold:
//!
//! ```text
//! norm = √(Σ g²)  over every layer
//! if norm > max_norm:
//!     gradient *= max_norm / norm
//! ```
//!
//! Every value is scaled by the same factor, so the update keeps its
//! direction and only its length is limited.
//!
//! ## Example
//!
//! ```
//! use viola::Gradient;
//!
//! let mut grad = Gradient::from_layers(vec![vec![3.0], vec![], vec![4.0]]);
//! assert_eq!(grad.norm(), 5.0);
//!
//! grad.clip(1.0);
//! assert!((grad.norm() - 1.0).abs() < 1e-12);
//! ```

use crate::error::{check_len, Result};
use crate::vector::VectorExt;

/// Per-layer gradient buffers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gradient {
    layers: Vec<Vec<f64>>,
}

impl Gradient {
    /// Zero gradient with one buffer of `len` values per entry of `sizes`.
    pub fn zeros(sizes: impl IntoIterator<Item = usize>) -> Self {
        Self {
            layers: sizes.into_iter().map(|n| vec![0.0; n]).collect(),
        }
    }

    pub fn from_layers(layers: Vec<Vec<f64>>) -> Self {
        Self { layers }
    }

    /// Number of layers (including unparametrized ones).
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, i: usize) -> &[f64] {
        &self.layers[i]
    }

    pub fn layer_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.layers[i]
    }

    pub fn layers(&self) -> &[Vec<f64>] {
        &self.layers
    }

    pub fn into_layers(self) -> Vec<Vec<f64>> {
        self.layers
    }

    /// Multiply every value by `c`.
    pub fn scale(&mut self, c: f64) {
        for layer in &mut self.layers {
            layer.scale_in_place(c);
        }
    }

    pub fn fill(&mut self, value: f64) {
        for layer in &mut self.layers {
            layer.fill(value);
        }
    }

    /// Global L2 norm over every layer
    ///
    /// # Returns
    ///
    /// `√(Σ g²)` for all gradient values `g`
    pub fn norm(&self) -> f64 {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(|g| g * g).sum::<f64>())
            .sum::<f64>()
            .sqrt()
    }

    /// Clip to a maximum global norm
    ///
    /// When the norm exceeds `max_norm`, every value is scaled so the norm
    /// becomes exactly `max_norm`. Otherwise the gradient is left untouched.
    ///
    /// # Arguments
    ///
    /// * `max_norm` - Maximum allowed gradient norm
    ///
    /// # Returns
    ///
    /// The norm before clipping, for monitoring.
    pub fn clip(&mut self, max_norm: f64) -> f64 {
        let norm = self.norm();
        if norm > max_norm && norm > 0.0 {
            self.scale(max_norm / norm);
        }
        norm
    }

    /// L1 distance to `other`, one value per layer.
    ///
    /// Used to compare the analytic gradient with a finite-difference estimate.
    ///
    /// # Errors
    ///
    /// [`crate::Error::DimensionMismatch`] if the two gradients have different
    /// shapes.
    pub fn l1_distance_per_layer(&self, other: &Gradient) -> Result<Vec<f64>> {
        check_len("Gradient layers", self.layers.len(), other.layers.len())?;
        self.layers
            .iter()
            .zip(&other.layers)
            .map(|(a, b)| {
                check_len("Gradient layer", a.len(), b.len())?;
                Ok(a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum())
            })
            .collect()
    }
}
