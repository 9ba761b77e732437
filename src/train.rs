//! Training Configuration and Batch Planning
//!
//! This module holds everything [`crate::Network::train`] needs to know
//! before it touches a single weight: the hyperparameters, how the rows are
//! split into batches, and the order in which they are visited.
//!
//! ## How Batches Are Sized
//!
//! Splitting `rows` into batches of exactly `batch_size` usually leaves a
//! small leftover batch, and one noisy update from a two-row batch can undo
//! a lot of work. Instead the batch size is nudged up until the leftover rows
//! can be spread one apiece over the batches:
//!
//! ```text
//! rows = 10, requested batch size = 4
//!
//!   size 4:  10 = 2 * 4 + 2    remainder 2 >= 2 batches, grow
//!   size 5:  10 = 2 * 5 + 0    done
//!
//! rows = 10, requested batch size = 3
//!
//!   size 3:  10 = 3 * 3 + 1    remainder 1 < 3 batches, done
//!   batches: [4, 3, 3]
//! ```
//!
//! The result always satisfies `num_batches * batch_size + remainder == rows`
//! and `remainder < num_batches`, so batch sizes differ by at most one.
//!
//! ## Row Order
//!
//! Rows are visited through a Fisher–Yates shuffled index permutation drawn
//! from the caller's [`SeededRng`]. Features and labels are never physically
//! reordered.
//!
//! ## Example
//!
//! ```
//! use viola::train::BatchPlan;
//!
//! let plan = BatchPlan::new(10, 3).unwrap();
//! assert_eq!(plan.sizes().collect::<Vec<_>>(), vec![4, 3, 3]);
//! ```

use crate::error::{Error, Result};
use crate::rng::SeededRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Range;
use std::path::Path;

/// Training configuration
///
/// Hyperparameters for [`crate::Network::train`] (one epoch) and
/// [`crate::Network::fit`] (several).
///
/// # Common Configurations
///
/// - **SGD**: one row per update, no momentum ([`TrainingConfig::sgd`])
/// - **Mini-batch**: averaged updates with momentum
///   ([`TrainingConfig::mini_batch`])
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Step size applied to the batch-averaged gradient
    pub learning_rate: f64,
    /// Requested rows per batch; clamped to the row count and adjusted by
    /// [`BatchPlan`]
    pub batch_size: usize,
    /// Fraction of the previous batch's gradient kept when a batch starts
    pub momentum: f64,
    /// Passes over the data made by `fit`
    pub epochs: usize,
    /// Seed of the shuffling generator created by `fit`
    pub seed: u64,
    /// Clip the batch gradient to this global L2 norm
    pub max_grad_norm: Option<f64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.03,
            batch_size: 1,
            momentum: 0.0,
            epochs: 1,
            seed: 2192018,
            max_grad_norm: None,
        }
    }
}

impl TrainingConfig {
    /// Plain stochastic gradient descent: one row per update, no momentum.
    pub fn sgd(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            ..Self::default()
        }
    }

    /// Mini-batch gradient descent with momentum.
    ///
    /// # Arguments
    ///
    /// * `learning_rate` - Step size
    /// * `batch_size` - Requested rows per batch
    /// * `momentum` - Fraction of the previous gradient to keep, in `[0, 1)`
    pub fn mini_batch(learning_rate: f64, batch_size: usize, momentum: f64) -> Self {
        Self {
            learning_rate,
            batch_size,
            momentum,
            ..Self::default()
        }
    }

    /// Builder-style epoch count.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Check every field against its domain.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(Error::InvalidConfig(format!(
                "momentum must be in [0, 1), got {}",
                self.momentum
            )));
        }
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be at least 1".into()));
        }
        if let Some(norm) = self.max_grad_norm {
            if !(norm.is_finite() && norm > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "max_grad_norm must be positive, got {}",
                    norm
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration from `path`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// How one epoch's rows are split into batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchPlan {
    /// Number of batches
    pub num_batches: usize,
    /// Size of the smaller batches
    pub batch_size: usize,
    /// Number of leading batches that get one extra row
    pub remainder: usize,
}

impl BatchPlan {
    /// Plan batches for `rows` rows at a requested batch size.
    ///
    /// The request is clamped to `rows` first.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if `rows` or `requested` is zero.
    pub fn new(rows: usize, requested: usize) -> Result<Self> {
        if rows == 0 {
            return Err(Error::InvalidConfig("cannot plan batches for 0 rows".into()));
        }
        if requested == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }
        let mut batch_size = requested.min(rows);
        let mut num_batches = rows / batch_size;
        let mut remainder = rows % batch_size;
        while remainder > 0 && remainder >= num_batches {
            batch_size += 1;
            num_batches = rows / batch_size;
            remainder = rows % batch_size;
        }
        Ok(Self {
            num_batches,
            batch_size,
            remainder,
        })
    }

    /// Total number of rows covered.
    pub fn rows(&self) -> usize {
        self.num_batches * self.batch_size + self.remainder
    }

    /// Size of every batch, in order.
    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_batches).map(move |b| self.batch_size + usize::from(b < self.remainder))
    }

    /// Positions in the shuffled order covered by each batch.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let mut start = 0;
        self.sizes().map(move |size| {
            let range = start..start + size;
            start = range.end;
            range
        })
    }
}

/// Fisher–Yates shuffled permutation of `0..rows`.
pub fn shuffled_indices(rows: usize, rng: &mut SeededRng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..rows).collect();
    for i in (1..rows).rev() {
        let j = rng.next(i as u64 + 1) as usize;
        indices.swap(i, j);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hyperparameters() {
        let config = TrainingConfig::default();
        assert_eq!(config.learning_rate, 0.03);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.momentum, 0.0);
        assert_eq!(config.seed, 2192018);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        assert!(TrainingConfig::sgd(0.0).validate().is_err());
        assert!(TrainingConfig::mini_batch(0.1, 0, 0.0).validate().is_err());
        assert!(TrainingConfig::mini_batch(0.1, 4, 1.0).validate().is_err());
        assert!(TrainingConfig::sgd(0.1).with_epochs(0).validate().is_err());
        let clipped = TrainingConfig {
            max_grad_norm: Some(-1.0),
            ..TrainingConfig::default()
        };
        assert!(matches!(clipped.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = TrainingConfig::from_json(r#"{"learning_rate": 0.1, "epochs": 5}"#).unwrap();
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.epochs, 5);
        assert_eq!(config.batch_size, 1);
        assert!(TrainingConfig::from_json(r#"{"batch_size": 0}"#).is_err());
        assert!(matches!(
            TrainingConfig::from_json("not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let result = TrainingConfig::from_json_file("/nonexistent/viola/config.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_batch_plan_grows_batch_to_absorb_leftovers() {
        let plan = BatchPlan::new(10, 4).unwrap();
        assert_eq!(
            plan,
            BatchPlan {
                num_batches: 2,
                batch_size: 5,
                remainder: 0
            }
        );
    }

    #[test]
    fn test_batch_plan_law_holds_for_all_requests() {
        for rows in 1..60 {
            for requested in 1..=rows {
                let plan = BatchPlan::new(rows, requested).unwrap();
                assert_eq!(plan.rows(), rows);
                assert!(plan.remainder < plan.num_batches);
                assert!(plan.batch_size >= requested);
                let sizes: Vec<usize> = plan.sizes().collect();
                assert_eq!(sizes.iter().sum::<usize>(), rows);
                let min = sizes.iter().min().copied().unwrap_or(0);
                let max = sizes.iter().max().copied().unwrap_or(0);
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn test_batch_plan_clamps_and_rejects_zero() {
        let plan = BatchPlan::new(3, 100).unwrap();
        assert_eq!(plan.num_batches, 1);
        assert_eq!(plan.batch_size, 3);
        assert!(BatchPlan::new(0, 1).is_err());
        assert!(BatchPlan::new(5, 0).is_err());
    }

    #[test]
    fn test_ranges_tile_the_rows() {
        let plan = BatchPlan::new(10, 3).unwrap();
        let ranges: Vec<_> = plan.ranges().collect();
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);
    }

    #[test]
    fn test_shuffle_is_a_reproducible_permutation() {
        let a = shuffled_indices(50, &mut SeededRng::new(2192018));
        let b = shuffled_indices(50, &mut SeededRng::new(2192018));
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        assert_ne!(a, sorted);
    }
}
