//! Momentum SGD Optimizer
//!
//! The update rule used by [`crate::Network::train`]. It works on a
//! persistent [`Gradient`] that survives from one batch to the next:
//!
//! ```text
//! at the start of a batch:   g = μ * g
//! for every row in the batch: g += ∂activation/∂w · (target - activation)
//! at the end of the batch:   w = w + (α / batch_len) * g
//! ```
//!
//! where:
//! - α = learning rate
//! - μ = momentum, in `[0, 1)`
//! - batch_len = number of rows in the batch
//!
//! At `μ = 0` the first step is a plain reset, so this is ordinary
//! mini-batch gradient descent. The gradient already points downhill (the
//! blame is `target - activation`), which is why it is added to the weights.
//!
//! The squared-error factor of 2 is not part of the blame. It is folded into
//! the learning rate, and the default rate of 0.03 is tuned against that.

use crate::error::Result;
use crate::gradients::Gradient;
use crate::network::Network;
use crate::train::TrainingConfig;

/// Momentum SGD state: just the two hyperparameters, the moment lives in the
/// gradient buffer itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MomentumSgd {
    pub learning_rate: f64,
    pub momentum: f64,
}

impl MomentumSgd {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.learning_rate, config.momentum)
    }

    /// Decay the carried-over gradient before a batch accumulates into it.
    pub fn begin_batch(&self, gradient: &mut Gradient) {
        gradient.scale(self.momentum);
    }

    /// Apply the accumulated batch gradient to the network's weights.
    ///
    /// # Arguments
    ///
    /// * `network` - Network whose weights are refined in place
    /// * `gradient` - Gradient accumulated over the batch
    /// * `batch_len` - Rows in the batch; the rate is divided by it
    pub fn step(&self, network: &mut Network, gradient: &Gradient, batch_len: usize) -> Result<()> {
        let rate = self.learning_rate / batch_len.max(1) as f64;
        network.refine_weight(gradient, rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerSpec;
    use crate::rng::SeededRng;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_momentum_resets_gradient() {
        let sgd = MomentumSgd::new(0.1, 0.0);
        let mut grad = Gradient::from_layers(vec![vec![5.0, -5.0]]);
        sgd.begin_batch(&mut grad);
        assert_eq!(grad.layer(0), &[0.0, 0.0]);
    }

    #[test]
    fn test_momentum_keeps_a_fraction() {
        let sgd = MomentumSgd::new(0.1, 0.25);
        let mut grad = Gradient::from_layers(vec![vec![4.0]]);
        sgd.begin_batch(&mut grad);
        assert_eq!(grad.layer(0), &[1.0]);
    }

    #[test]
    fn test_step_divides_rate_by_batch_len() {
        let mut network = Network::new(vec![1]);
        network
            .add_layer(&LayerSpec::Linear {
                outputs: 1,
                regularization: None,
            })
            .unwrap();
        network
            .init_weight(Some(&[vec![1.0, 0.0]]), &mut SeededRng::new(1))
            .unwrap();

        let sgd = MomentumSgd::new(0.5, 0.0);
        let grad = Gradient::from_layers(vec![vec![2.0, 4.0]]);
        sgd.step(&mut network, &grad, 4).unwrap();
        let w = network.weights();
        assert_abs_diff_eq!(w[0][0], 1.25);
        assert_abs_diff_eq!(w[0][1], 0.5);
    }
}
