//! Training Logger and Utilities
//!
//! This module provides utilities for tracking training progress across
//! epochs. It includes a CSV logger for detailed tracking and a helper for
//! holding out part of a dataset for validation.
//!
//! ## Components
//!
//! - **TrainingLogger**: Logs per-epoch metrics to CSV and to the `log` facade
//! - **train_validation_split**: Splits features and labels into training and
//!   validation rows
//!
//! ## Example
//!
//! ```rust,no_run
//! use viola::TrainingLogger;
//!
//! let mut logger = TrainingLogger::new("training_log.csv")?;
//!
//! // epoch 1, learning rate, batch size, train RMSE, validation RMSE
//! logger.log(1, 0.03, 4, 0.52, Some(0.61))?;
//! # Ok::<(), viola::Error>(())
//! ```
//!
//! ## CSV Format
//!
//! The logger writes CSV files with the following columns:
//! - `epoch`: Epoch number, starting at 1
//! - `elapsed_seconds`: Time since the logger was created
//! - `learning_rate`: Learning rate used for the epoch
//! - `batch_size`: Requested batch size
//! - `train_rmse`: √(SSE / rows) on the training rows
//! - `validation_rmse`: Same on the held-out rows, empty when there are none

use crate::error::{check_len, Error, Result};
use crate::matrix::Matrix;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

pub const CSV_HEADER: &str =
    "epoch,elapsed_seconds,learning_rate,batch_size,train_rmse,validation_rmse";

/// Training logger for tracking metrics over epochs
///
/// Logs to a CSV sink and mirrors every row to `log::info!`. The sink is
/// flushed after each row so a crashed run keeps everything logged so far.
///
/// # Fields
///
/// - `sink`: Output CSV writer
/// - `start_time`: When logging started (for elapsed time calculation)
/// - `last_log_time`: Last log timestamp (for per-epoch timing)
pub struct TrainingLogger<W: Write = BufWriter<File>> {
    sink: W,
    start_time: Instant,
    last_log_time: Instant,
}

impl TrainingLogger {
    /// Create a logger writing to a new CSV file
    ///
    /// # Arguments
    ///
    /// * `log_path` - Path to CSV file to create
    pub fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(log_path)?;
        Self::from_writer(BufWriter::new(file))
    }
}

impl<W: Write> TrainingLogger<W> {
    /// Create a logger over any writer and emit the CSV header.
    pub fn from_writer(mut sink: W) -> Result<Self> {
        writeln!(sink, "{}", CSV_HEADER)?;
        sink.flush()?;
        let now = Instant::now();
        Ok(Self {
            sink,
            start_time: now,
            last_log_time: now,
        })
    }

    /// Log one epoch
    ///
    /// # Arguments
    ///
    /// * `epoch` - Epoch number
    /// * `learning_rate` - Learning rate used
    /// * `batch_size` - Requested batch size
    /// * `train_rmse` - Training error
    /// * `validation_rmse` - Held-out error, if a validation set exists
    pub fn log(
        &mut self,
        epoch: usize,
        learning_rate: f64,
        batch_size: usize,
        train_rmse: f64,
        validation_rmse: Option<f64>,
    ) -> Result<()> {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let validation = validation_rmse.map_or(String::new(), |v| format!("{:.6}", v));

        writeln!(
            self.sink,
            "{},{:.3},{:.6},{},{:.6},{}",
            epoch, elapsed, learning_rate, batch_size, train_rmse, validation
        )?;
        self.sink.flush()?;

        let epoch_time = self.last_log_time.elapsed().as_secs_f64();
        info!(
            "Epoch {:4} | Time: {:7.1}s (+{:.1}s) | LR: {:.6} | Train RMSE: {:.6} | Validation RMSE: {}",
            epoch,
            elapsed,
            epoch_time,
            learning_rate,
            train_rmse,
            if validation.is_empty() { "-" } else { validation.as_str() }
        );

        self.last_log_time = Instant::now();
        Ok(())
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Split rows into training and validation sets
///
/// The validation rows are taken from the end, matching a dataset that is
/// already shuffled or ordered by time.
///
/// # Arguments
///
/// * `features` - All feature rows
/// * `labels` - All label rows
/// * `validation_fraction` - Fraction of rows to hold out, in `[0, 1)`
///
/// # Errors
///
/// [`Error::InvalidConfig`] for a fraction outside `[0, 1)` or one that
/// rounds the training set down to no rows.
///
/// # Returns
///
/// `((train_features, train_labels), (validation_features, validation_labels))`
///
/// # Example
///
/// ```
/// use viola::{train_validation_split, Matrix};
///
/// let x = Matrix::new(10, 2);
/// let y = Matrix::new(10, 1);
/// let ((tx, _), (vx, _)) = train_validation_split(&x, &y, 0.2).unwrap();
/// assert_eq!(tx.rows(), 8);
/// assert_eq!(vx.rows(), 2);
/// ```
#[allow(clippy::type_complexity)]
pub fn train_validation_split(
    features: &Matrix,
    labels: &Matrix,
    validation_fraction: f64,
) -> Result<((Matrix, Matrix), (Matrix, Matrix))> {
    check_len("train_validation_split rows", features.rows(), labels.rows())?;
    if !(0.0..1.0).contains(&validation_fraction) {
        return Err(Error::InvalidConfig(format!(
            "validation fraction must be in [0, 1), got {}",
            validation_fraction
        )));
    }
    let rows = features.rows();
    let split = ((rows as f64) * (1.0 - validation_fraction)).round() as usize;
    if split == 0 {
        return Err(Error::InvalidConfig(format!(
            "validation fraction {} leaves no training rows out of {}",
            validation_fraction, rows
        )));
    }
    let train: Vec<usize> = (0..split).collect();
    let validation: Vec<usize> = (split..rows).collect();
    Ok((
        (features.select_rows(&train)?, labels.select_rows(&train)?),
        (
            features.select_rows(&validation)?,
            labels.select_rows(&validation)?,
        ),
    ))
}
