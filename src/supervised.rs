//! Supervised Learners and Evaluation
//!
//! [`SupervisedLearner`] is the common face of anything that can be fitted
//! to `(features, labels)` and then asked for predictions. Two learners are
//! provided:
//!
//! - [`LinearRegression`]: closed-form fit through [`crate::qr::ols`], whose
//!   weights are loaded into a Linear layer
//! - [`NetworkLearner`]: a [`Network`] trained by mini-batch gradient descent
//!
//! and three ways of scoring them:
//!
//! - [`sse`]: sum of squared errors over a dataset
//! - [`count_misclassifications`]: number of predicted values that differ
//!   from their label
//! - [`cross_validate`]: repeated n-fold cross-validation
//!
//! ## Cross-Validation
//!
//! ```text
//! for each repetition:
//!     shuffle row indices
//!     split them into `folds` consecutive folds (sizes differ by at most 1)
//!     for each fold:
//!         train on every other fold, add the SSE on this fold
//!     rmse = √(total SSE / rows)
//! ```
//!
//! Rows are selected by index; the caller's matrices are never reordered.

use crate::error::{check_len, Error, Result};
use crate::layers::Layer;
use crate::matrix::Matrix;
use crate::network::Network;
use crate::qr::ols;
use crate::rng::SeededRng;
use crate::train::{shuffled_indices, TrainingConfig};
use log::debug;

/// A model that learns a mapping from feature rows to label rows.
pub trait SupervisedLearner {
    fn name(&self) -> &str;

    /// Fit to the given data.
    fn train(&mut self, features: &Matrix, labels: &Matrix) -> Result<()>;

    /// Predict the label row for one feature row.
    fn predict(&mut self, input: &[f64]) -> Result<Vec<f64>>;
}

/// Sum of squared prediction errors over every row and label column.
pub fn sse<L: SupervisedLearner + ?Sized>(
    learner: &mut L,
    features: &Matrix,
    labels: &Matrix,
) -> Result<f64> {
    check_len("sse rows", features.rows(), labels.rows())?;
    let mut total = 0.0;
    for (x, y) in features.iter_rows().zip(labels.iter_rows()) {
        let prediction = learner.predict(x)?;
        check_len("sse label width", y.len(), prediction.len())?;
        total += prediction
            .iter()
            .zip(y)
            .map(|(p, t)| (p - t) * (p - t))
            .sum::<f64>();
    }
    Ok(total)
}

/// Number of predicted values that are not exactly equal to their label.
///
/// Meant for learners that output class indices.
pub fn count_misclassifications<L: SupervisedLearner + ?Sized>(
    learner: &mut L,
    features: &Matrix,
    labels: &Matrix,
) -> Result<usize> {
    check_len("count_misclassifications rows", features.rows(), labels.rows())?;
    let mut wrong = 0;
    for (x, y) in features.iter_rows().zip(labels.iter_rows()) {
        let prediction = learner.predict(x)?;
        check_len("count_misclassifications label width", y.len(), prediction.len())?;
        wrong += prediction.iter().zip(y).filter(|(p, t)| p != t).count();
    }
    Ok(wrong)
}

/// Sizes of `folds` consecutive folds over `rows` rows; the first
/// `rows % folds` folds get one extra row.
pub fn fold_sizes(rows: usize, folds: usize) -> Vec<usize> {
    (0..folds)
        .map(|i| rows / folds + usize::from(i < rows % folds))
        .collect()
}

/// Repeated n-fold cross-validation
///
/// # Arguments
///
/// * `learner` - Learner retrained on every fold
/// * `features`, `labels` - Full dataset
/// * `repetitions` - Number of independent shuffles
/// * `folds` - Folds per repetition, in `2..=rows`
/// * `rng` - Generator for the shuffles
///
/// # Returns
///
/// One RMSE (`√(SSE / rows)`) per repetition.
pub fn cross_validate<L: SupervisedLearner + ?Sized>(
    learner: &mut L,
    features: &Matrix,
    labels: &Matrix,
    repetitions: usize,
    folds: usize,
    rng: &mut SeededRng,
) -> Result<Vec<f64>> {
    check_len("cross_validate rows", features.rows(), labels.rows())?;
    let rows = features.rows();
    if folds < 2 || folds > rows {
        return Err(Error::InvalidConfig(format!(
            "cross_validate: need 2 <= folds <= rows, got {} folds for {} rows",
            folds, rows
        )));
    }
    if repetitions == 0 {
        return Err(Error::InvalidConfig(
            "cross_validate: repetitions must be at least 1".into(),
        ));
    }

    let sizes = fold_sizes(rows, folds);
    let mut scores = Vec::with_capacity(repetitions);
    for rep in 0..repetitions {
        let order = shuffled_indices(rows, rng);
        let mut total = 0.0;
        let mut start = 0;
        for &size in &sizes {
            let end = start + size;
            let test = &order[start..end];
            let train: Vec<usize> = order[..start].iter().chain(&order[end..]).copied().collect();

            learner.train(&features.select_rows(&train)?, &labels.select_rows(&train)?)?;
            total += sse(
                learner,
                &features.select_rows(test)?,
                &labels.select_rows(test)?,
            )?;
            start = end;
        }
        let rmse = (total / rows as f64).sqrt();
        debug!("{}: repetition {} rmse {:.6}", learner.name(), rep + 1, rmse);
        scores.push(rmse);
    }
    Ok(scores)
}

/// Ordinary least squares regression.
///
/// Training solves for the weights in closed form and loads them into a
/// Linear layer, which then makes the predictions.
#[derive(Clone, Debug, Default)]
pub struct LinearRegression {
    layer: Option<Layer>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitted weights, `(features + 1) × labels`, bias row last.
    pub fn weight(&self) -> Option<&[f64]> {
        self.layer.as_ref().map(Layer::weight)
    }
}

impl SupervisedLearner for LinearRegression {
    fn name(&self) -> &str {
        "LinearRegression"
    }

    fn train(&mut self, features: &Matrix, labels: &Matrix) -> Result<()> {
        check_len("LinearRegression rows", features.rows(), labels.rows())?;
        let weight = ols(features, labels)?;
        let mut layer = Layer::linear(&[features.cols()], labels.cols())?;
        layer.set_weight(&weight)?;
        self.layer = Some(layer);
        Ok(())
    }

    fn predict(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let layer = self.layer.as_mut().ok_or(Error::InvalidState {
            expected: "trained",
            actual: "untrained",
        })?;
        Ok(layer.activate(input)?.to_vec())
    }
}

/// A [`Network`] trained with a fixed [`TrainingConfig`].
///
/// Each call to `train` runs `config.epochs` epochs starting from the
/// network's current weights, drawing shuffles from the learner's own
/// generator.
#[derive(Clone, Debug)]
pub struct NetworkLearner {
    network: Network,
    config: TrainingConfig,
    rng: SeededRng,
}

impl NetworkLearner {
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] for an invalid `config`.
    pub fn new(network: Network, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        let rng = SeededRng::new(config.seed);
        Ok(Self {
            network,
            config,
            rng,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }
}

impl SupervisedLearner for NetworkLearner {
    fn name(&self) -> &str {
        "NeuralNetwork"
    }

    fn train(&mut self, features: &Matrix, labels: &Matrix) -> Result<()> {
        for _ in 0..self.config.epochs {
            self.network.train(features, labels, &self.config, &mut self.rng)?;
        }
        Ok(())
    }

    fn predict(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.network.predict(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerSpec;
    use approx::assert_abs_diff_eq;

    /// Always predicts the mean label seen in training.
    struct MeanLearner {
        mean: f64,
        trained_rows: Vec<usize>,
    }

    impl SupervisedLearner for MeanLearner {
        fn name(&self) -> &str {
            "Mean"
        }

        fn train(&mut self, _features: &Matrix, labels: &Matrix) -> Result<()> {
            self.mean = labels.col(0).iter().sum::<f64>() / labels.rows() as f64;
            self.trained_rows.push(labels.rows());
            Ok(())
        }

        fn predict(&mut self, _input: &[f64]) -> Result<Vec<f64>> {
            Ok(vec![self.mean])
        }
    }

    fn line_data(rows: usize) -> (Matrix, Matrix) {
        let xs: Vec<Vec<f64>> = (0..rows).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let ys: Vec<Vec<f64>> = xs
            .iter()
            .map(|x| vec![2.0 * x[0] - 0.5 * x[1] + 1.0])
            .collect();
        (Matrix::from_rows(&xs).unwrap(), Matrix::from_rows(&ys).unwrap())
    }

    #[test]
    fn test_fold_sizes_differ_by_at_most_one() {
        assert_eq!(fold_sizes(10, 3), vec![4, 3, 3]);
        assert_eq!(fold_sizes(9, 3), vec![3, 3, 3]);
    }

    #[test]
    fn test_sse_and_misclassifications() {
        let mut learner = MeanLearner {
            mean: 1.0,
            trained_rows: Vec::new(),
        };
        let x = Matrix::new(3, 1);
        let y = Matrix::from_rows(&[vec![1.0], vec![3.0], vec![0.0]]).unwrap();
        assert_abs_diff_eq!(sse(&mut learner, &x, &y).unwrap(), 5.0);
        assert_eq!(count_misclassifications(&mut learner, &x, &y).unwrap(), 2);
    }

    #[test]
    fn test_cross_validation_trains_on_complement_folds() {
        let mut learner = MeanLearner {
            mean: 0.0,
            trained_rows: Vec::new(),
        };
        let (x, y) = line_data(10);
        let scores = cross_validate(&mut learner, &x, &y, 2, 3, &mut SeededRng::new(1982)).unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|s| s.is_finite() && *s > 0.0));
        assert_eq!(learner.trained_rows, vec![6, 7, 7, 6, 7, 7]);
    }

    #[test]
    fn test_cross_validation_rejects_bad_fold_counts() {
        let mut learner = LinearRegression::new();
        let (x, y) = line_data(5);
        let mut rng = SeededRng::new(1);
        assert!(cross_validate(&mut learner, &x, &y, 1, 1, &mut rng).is_err());
        assert!(cross_validate(&mut learner, &x, &y, 1, 6, &mut rng).is_err());
        assert!(cross_validate(&mut learner, &x, &y, 0, 2, &mut rng).is_err());
    }

    #[test]
    fn test_linear_regression_is_exact_on_noise_free_data() {
        let mut learner = LinearRegression::new();
        assert!(learner.predict(&[1.0, 1.0]).is_err());
        let (x, y) = line_data(12);
        learner.train(&x, &y).unwrap();
        let w = learner.weight().unwrap();
        assert_abs_diff_eq!(w[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w[1], -0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(w[2], 1.0, epsilon = 1e-9);

        let scores = cross_validate(&mut learner, &x, &y, 1, 4, &mut SeededRng::new(5)).unwrap();
        assert!(scores[0] < 1e-8);
    }

    #[test]
    fn test_network_learner_fits_a_line() {
        let mut network = Network::new(vec![1]);
        network
            .add_layer(&LayerSpec::Linear {
                outputs: 1,
                regularization: None,
            })
            .unwrap();
        network.init_weight(None, &mut SeededRng::new(2162018)).unwrap();
        let config = TrainingConfig::sgd(0.05).with_epochs(500);
        let mut learner = NetworkLearner::new(network, config).unwrap();

        let xs: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 / 10.0]).collect();
        let ys: Vec<Vec<f64>> = xs.iter().map(|x| vec![1.0 - x[0]]).collect();
        let x = Matrix::from_rows(&xs).unwrap();
        let y = Matrix::from_rows(&ys).unwrap();
        learner.train(&x, &y).unwrap();
        assert!(sse(&mut learner, &x, &y).unwrap() < 1e-3);
        assert_eq!(learner.name(), "NeuralNetwork");
    }
}
