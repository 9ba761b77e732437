//! Viola: Neural Networks and Least Squares from Scratch
//!
//! A small numerical engine for learning the fundamentals of machine
//! learning: layers with hand-written forward and backward passes, a network
//! that trains them by mini-batch gradient descent with momentum, an
//! N-dimensional convolution kernel, and a pivoted Householder QR solver
//! that gives the closed-form least-squares answer to compare against.
//! Named after the twin who spends *Twelfth Night* disguised as her brother.
//!
//! # Modules
//!
//! - [`vector`], [`matrix`] - Dense containers and basic linear algebra
//! - [`rng`] - Explicitly seeded random source
//! - [`tensor`] - Flat buffers viewed as N-dimensional arrays, convolution
//! - [`qr`] - Rank-revealing QR, minimum-norm least squares, OLS
//! - [`layers`] - The layer contract and every layer kind
//! - [`network`] - Composing layers, backpropagation, training
//! - [`gradients`], [`optimizer`], [`train`] - Training machinery
//! - [`supervised`] - Learners, error measures, cross-validation
//! - [`training_logger`] - Per-epoch CSV metrics
//!
//! # Example
//!
//! ```
//! use viola::{LayerSpec, Matrix, Network, SeededRng, TrainingConfig};
//!
//! // y = 2x - 1
//! let xs: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64 / 8.0]).collect();
//! let ys: Vec<Vec<f64>> = xs.iter().map(|x| vec![2.0 * x[0] - 1.0]).collect();
//! let features = Matrix::from_rows(&xs)?;
//! let labels = Matrix::from_rows(&ys)?;
//!
//! let mut network = Network::new(vec![1]);
//! network.add_layer(&LayerSpec::Linear { outputs: 1, regularization: None })?;
//! network.init_weight(None, &mut SeededRng::new(2162018))?;
//!
//! let history = network.fit(&features, &labels, &TrainingConfig::sgd(0.1).with_epochs(50))?;
//! assert!(history[49] < history[0]);
//!
//! // The closed-form answer for comparison: weights then bias.
//! let w = viola::ols(&features, &labels)?;
//! assert!((w[0] - 2.0).abs() < 1e-9 && (w[1] + 1.0).abs() < 1e-9);
//! # Ok::<(), viola::Error>(())
//! ```

pub mod error;
pub mod gradients;
pub mod layers;
pub mod matrix;
pub mod network;
pub mod optimizer;
pub mod qr;
pub mod rng;
pub mod supervised;
pub mod tensor;
pub mod train;
pub mod training_logger;
pub mod vector;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use gradients::Gradient;
pub use layers::{Layer, LayerKind, LayerSpec, Ratio, Regularization};
pub use matrix::{Column, ColumnKind, Matrix};
pub use network::{Network, NetworkState};
pub use optimizer::MomentumSgd;
pub use qr::{least_squares, ols, LeastSquares};
pub use rng::SeededRng;
pub use supervised::{
    count_misclassifications, cross_validate, sse, LinearRegression, NetworkLearner,
    SupervisedLearner,
};
pub use train::{BatchPlan, TrainingConfig};
pub use training_logger::{train_validation_split, TrainingLogger};
pub use vector::VectorExt;
