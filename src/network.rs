//! Network Orchestrator
//!
//! A [`Network`] is an ordered list of [`Layer`]s plus the persistent
//! [`Gradient`] used by training. Layer `i` reads the activation of layer
//! `i - 1` (layer 0 reads the network input) and writes its backpropagated
//! blame into layer `i - 1`'s blame buffer.
//!
//! ## Lifecycle
//!
//! ```text
//! Constructed --init_weight--> Initialized --train--> Trained --train--> ..
//!     |                            |                     |
//!  add_layer                 activate / back_prop / predict
//! ```
//!
//! Layers can only be appended before `init_weight`, and `init_weight` runs
//! once. Every forward or backward call requires initialized weights. Calls
//! out of order fail with [`Error::InvalidState`].
//!
//! ## One Training Row
//!
//! ```text
//! activate(x)            a_N = f_N(..f_1(x))
//! back_prop(t)           blame_N = t - a_N, then blame_{i-1} = J_iᵀ blame_i
//! update_gradient(x, g)  g_i += ∂a_i/∂w_i · blame_i    (input of layer i = a_{i-1})
//! ```
//!
//! The blame is the plain error `t - a` rather than the squared-error
//! derivative `2(t - a)`. The factor of two is left to the learning rate.
//!
//! ## Example
//!
//! ```
//! use viola::{LayerSpec, Network, SeededRng};
//!
//! let mut network = Network::new(vec![2]);
//! network.add_layer(&LayerSpec::Linear { outputs: 3, regularization: None }).unwrap();
//! network.add_layer(&LayerSpec::Tanh).unwrap();
//! network.add_layer(&LayerSpec::Linear { outputs: 1, regularization: None }).unwrap();
//! network.init_weight(None, &mut SeededRng::new(2162018)).unwrap();
//!
//! let output = network.predict(&[0.5, -0.5]).unwrap();
//! assert_eq!(output.len(), 1);
//! ```

use crate::error::{check_len, Error, Result};
use crate::gradients::Gradient;
use crate::layers::{Dims, Layer, LayerSpec};
use crate::matrix::Matrix;
use crate::optimizer::MomentumSgd;
use crate::rng::SeededRng;
use crate::tensor::volume;
use crate::train::{shuffled_indices, BatchPlan, TrainingConfig};
use crate::training_logger::TrainingLogger;
use crate::vector::VectorExt;
use log::{debug, info, warn};
use std::fmt;
use std::io::{self, Write};

/// Seed of the generator used by the original weight initialisation.
pub const INIT_SEED: u64 = 2162018;

/// Where a network is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkState {
    /// Layers may still be added; weights are not set.
    Constructed,
    /// Weights are set; the network can be evaluated and trained.
    Initialized,
    /// At least one training epoch has run.
    Trained,
}

impl NetworkState {
    pub fn name(&self) -> &'static str {
        match self {
            NetworkState::Constructed => "constructed",
            NetworkState::Initialized => "initialized",
            NetworkState::Trained => "trained",
        }
    }
}

/// Ordered stack of layers with a persistent training gradient.
#[derive(Clone, Debug)]
pub struct Network {
    input_dims: Dims,
    layers: Vec<Layer>,
    gradient: Gradient,
    state: NetworkState,
}

impl Network {
    /// Empty network that accepts inputs of shape `input_dims`.
    pub fn new(input_dims: Dims) -> Self {
        Self {
            input_dims,
            layers: Vec::new(),
            gradient: Gradient::default(),
            state: NetworkState::Constructed,
        }
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    pub fn input_dims(&self) -> &[usize] {
        &self.input_dims
    }

    /// Output dims of the last layer (the input dims of an empty network).
    pub fn output_dims(&self) -> &[usize] {
        self.layers
            .last()
            .map_or(&self.input_dims[..], |l| l.output_dims())
    }

    pub fn input_size(&self) -> usize {
        volume(&self.input_dims)
    }

    pub fn output_size(&self) -> usize {
        volume(self.output_dims())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, i: usize) -> &Layer {
        &self.layers[i]
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn require_constructed(&self) -> Result<()> {
        if self.state != NetworkState::Constructed {
            return Err(Error::InvalidState {
                expected: NetworkState::Constructed.name(),
                actual: self.state.name(),
            });
        }
        Ok(())
    }

    fn require_weights(&self) -> Result<()> {
        if self.state == NetworkState::Constructed {
            return Err(Error::InvalidState {
                expected: NetworkState::Initialized.name(),
                actual: self.state.name(),
            });
        }
        Ok(())
    }

    /// Append the layer described by `spec`, fed by the current output dims.
    pub fn add_layer(&mut self, spec: &LayerSpec) -> Result<()> {
        self.require_constructed()?;
        let layer = Layer::from_spec(spec, self.output_dims())?;
        self.push_layer(layer)
    }

    /// Append an already built layer.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] after `init_weight`
    /// - [`Error::DimensionMismatch`] if the layer's input size differs from
    ///   the current output size
    pub fn push_layer(&mut self, layer: Layer) -> Result<()> {
        self.require_constructed()?;
        check_len("Network::push_layer", self.output_size(), layer.input_size())?;
        debug!("adding layer {}: {}", self.layers.len(), layer);
        self.layers.push(layer);
        Ok(())
    }

    /// Set every layer's weights once
    ///
    /// With `weights = Some(w)`, layer `i` receives a verbatim copy of `w[i]`.
    /// With `None`, each weight is drawn from `N(0, 1) * max(1 / fan_in, 0.03)`
    /// using `rng`.
    ///
    /// # Arguments
    ///
    /// * `weights` - Optional per-layer weight vectors
    /// * `rng` - Source for random initialisation
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the weights were already set
    /// - [`Error::InvalidShape`] if the network has no layers
    /// - [`Error::DimensionMismatch`] if supplied weights do not fit
    pub fn init_weight(&mut self, weights: Option<&[Vec<f64>]>, rng: &mut SeededRng) -> Result<()> {
        self.require_constructed()?;
        if self.layers.is_empty() {
            return Err(Error::InvalidShape("network has no layers".into()));
        }
        match weights {
            Some(weights) => {
                check_len("Network::init_weight layers", self.layers.len(), weights.len())?;
                for (layer, w) in self.layers.iter_mut().zip(weights) {
                    layer.set_weight(w)?;
                }
            }
            None => {
                for layer in &mut self.layers {
                    layer.init_weight(rng);
                }
            }
        }
        self.gradient = self.create_gradient();
        self.state = NetworkState::Initialized;
        Ok(())
    }

    /// Feed `input` through every layer in order and return the final
    /// activation.
    pub fn activate(&mut self, input: &[f64]) -> Result<&[f64]> {
        self.require_weights()?;
        check_len("Network::activate", self.input_size(), input.len())?;
        for i in 0..self.layers.len() {
            let (head, tail) = self.layers.split_at_mut(i);
            let x = head.last().map_or(input, |prev| prev.activation());
            tail[0].activate(x)?;
        }
        Ok(self.last_activation())
    }

    fn last_activation(&self) -> &[f64] {
        self.layers.last().map_or(&[], |l| l.activation())
    }

    /// Owned copy of the network's output for `input`.
    pub fn predict(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        Ok(self.activate(input)?.to_vec())
    }

    /// Backpropagate the error of the last activation against `target`.
    ///
    /// Sets the last layer's blame to `target - activation`, then lets every
    /// layer write its upstream blame, last to first. Call after
    /// [`Network::activate`].
    pub fn back_prop(&mut self, target: &[f64]) -> Result<()> {
        self.require_weights()?;
        check_len("Network::back_prop", self.output_size(), target.len())?;
        let n = self.layers.len();
        let last = &mut self.layers[n - 1];
        let error = target.sub(last.activation());
        last.blame_mut().copy_from_slice(&error);

        for i in (1..n).rev() {
            let (head, tail) = self.layers.split_at_mut(i);
            tail[0].back_prop(head[i - 1].blame_mut())?;
        }
        Ok(())
    }

    /// Accumulate every layer's weight gradient into `gradient`.
    ///
    /// Requires a preceding `activate(input)` and `back_prop`.
    pub fn update_gradient(&self, input: &[f64], gradient: &mut Gradient) -> Result<()> {
        self.require_weights()?;
        check_len("Network::update_gradient", self.layers.len(), gradient.len())?;
        for (i, layer) in self.layers.iter().enumerate() {
            let x = if i == 0 {
                input
            } else {
                self.layers[i - 1].activation()
            };
            layer.update_gradient(x, gradient.layer_mut(i))?;
        }
        Ok(())
    }

    /// Zero gradient shaped like this network's weights.
    pub fn create_gradient(&self) -> Gradient {
        Gradient::zeros(self.layers.iter().map(|l| l.weight().len()))
    }

    /// `weight += rate * gradient` for every parametrized layer.
    pub fn refine_weight(&mut self, gradient: &Gradient, rate: f64) -> Result<()> {
        check_len("Network::refine_weight", self.layers.len(), gradient.len())?;
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let g = gradient.layer(i);
            if g.is_empty() {
                continue;
            }
            check_len("Network::refine_weight layer", layer.weight().len(), g.len())?;
            layer.weight_mut().axpy(rate, g);
        }
        Ok(())
    }

    /// Snapshot of every layer's weights.
    pub fn weights(&self) -> Vec<Vec<f64>> {
        self.layers.iter().map(|l| l.weight().to_vec()).collect()
    }

    /// Finite-difference estimate of the gradient that
    /// [`Network::update_gradient`] computes analytically.
    ///
    /// For every weight `w`:
    ///
    /// ```text
    /// grad[w] = ((f(x; w + dt/2) - f(x; w - dt/2)) / dt) · (target - f(x; w))
    /// ```
    ///
    /// Weights are restored after each probe. This is a testing aid, costing
    /// two forward passes per weight.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if `dt` is not positive, plus the shape
    /// errors of `activate`.
    pub fn central_difference(
        &mut self,
        input: &[f64],
        target: &[f64],
        dt: f64,
        gradient: &mut Gradient,
    ) -> Result<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(Error::InvalidConfig(format!("dt must be positive, got {}", dt)));
        }
        check_len("Network::central_difference target", self.output_size(), target.len())?;
        check_len("Network::central_difference", self.layers.len(), gradient.len())?;
        let base = self.predict(input)?;
        let error = target.sub(&base);

        for i in 0..self.layers.len() {
            check_len(
                "Network::central_difference layer",
                self.layers[i].weight().len(),
                gradient.layer(i).len(),
            )?;
            for j in 0..self.layers[i].weight().len() {
                let old = self.layers[i].weight()[j];
                self.layers[i].weight_mut()[j] = old + dt / 2.0;
                let plus = self.predict(input)?;
                self.layers[i].weight_mut()[j] = old - dt / 2.0;
                let minus = self.activate(input)?;
                let slope = plus.sub(minus).scaled(1.0 / dt);
                self.layers[i].weight_mut()[j] = old;
                gradient.layer_mut(i)[j] = slope.dot(&error);
            }
        }
        // leave the cached activations consistent with the restored weights
        self.activate(input)?;
        Ok(())
    }

    /// Train for one epoch
    ///
    /// Visits the rows in a shuffled order, in batches sized by
    /// [`BatchPlan`]. Each batch starts by decaying the persistent gradient by
    /// `config.momentum`, accumulates the gradient of every row, optionally
    /// clips it to `config.max_grad_norm`, and refines the weights by
    /// `config.learning_rate / batch_len`.
    ///
    /// # Arguments
    ///
    /// * `features` - One input per row
    /// * `labels` - One target per row
    /// * `config` - Hyperparameters; `epochs` and `seed` are ignored here
    /// * `rng` - Generator for the row shuffle
    pub fn train(
        &mut self,
        features: &Matrix,
        labels: &Matrix,
        config: &TrainingConfig,
        rng: &mut SeededRng,
    ) -> Result<()> {
        self.require_weights()?;
        config.validate()?;
        check_len("Network::train rows", features.rows(), labels.rows())?;
        check_len("Network::train features", self.input_size(), features.cols())?;
        check_len("Network::train labels", self.output_size(), labels.cols())?;

        let plan = BatchPlan::new(features.rows(), config.batch_size)?;
        debug!(
            "epoch plan: {} batches of {} (+1 for the first {})",
            plan.num_batches, plan.batch_size, plan.remainder
        );
        let order = shuffled_indices(features.rows(), rng);
        let optimizer = MomentumSgd::from_config(config);

        let mut gradient = std::mem::take(&mut self.gradient);
        let result = self.run_epoch(
            features,
            labels,
            config,
            &plan,
            &order,
            &optimizer,
            &mut gradient,
        );
        self.gradient = gradient;
        result?;
        self.state = NetworkState::Trained;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_epoch(
        &mut self,
        features: &Matrix,
        labels: &Matrix,
        config: &TrainingConfig,
        plan: &BatchPlan,
        order: &[usize],
        optimizer: &MomentumSgd,
        gradient: &mut Gradient,
    ) -> Result<()> {
        for batch in plan.ranges() {
            optimizer.begin_batch(gradient);
            let batch_len = batch.len();
            for &row in &order[batch] {
                let x = features.row(row);
                self.activate(x)?;
                self.back_prop(labels.row(row))?;
                self.update_gradient(x, gradient)?;
            }
            if let Some(max_norm) = config.max_grad_norm {
                let norm = gradient.clip(max_norm);
                if norm > max_norm {
                    debug!("clipped gradient norm {:.4} to {:.4}", norm, max_norm);
                }
            }
            optimizer.step(self, gradient, batch_len)?;
        }
        Ok(())
    }

    /// Sum of squared errors of the network's predictions over a dataset.
    pub fn sse(&mut self, features: &Matrix, labels: &Matrix) -> Result<f64> {
        check_len("Network::sse rows", features.rows(), labels.rows())?;
        let mut sse = 0.0;
        for (x, y) in features.iter_rows().zip(labels.iter_rows()) {
            let prediction = self.activate(x)?;
            check_len("Network::sse labels", prediction.len(), y.len())?;
            sse += prediction
                .iter()
                .zip(y)
                .map(|(p, t)| (p - t) * (p - t))
                .sum::<f64>();
        }
        Ok(sse)
    }

    /// `√(SSE / rows)`.
    pub fn rmse(&mut self, features: &Matrix, labels: &Matrix) -> Result<f64> {
        let rows = features.rows().max(1) as f64;
        Ok((self.sse(features, labels)? / rows).sqrt())
    }

    /// Train for `config.epochs` epochs with a generator seeded from
    /// `config.seed`.
    ///
    /// Logs one line per epoch through the `log` facade.
    ///
    /// # Returns
    ///
    /// Training RMSE after each epoch.
    pub fn fit(
        &mut self,
        features: &Matrix,
        labels: &Matrix,
        config: &TrainingConfig,
    ) -> Result<Vec<f64>> {
        self.fit_with::<io::Sink>(features, labels, None, config, None)
    }

    /// Like [`Network::fit`], additionally evaluating `validation` each epoch
    /// and writing every epoch to `logger`.
    pub fn fit_logged<W: Write>(
        &mut self,
        features: &Matrix,
        labels: &Matrix,
        validation: Option<(&Matrix, &Matrix)>,
        config: &TrainingConfig,
        logger: &mut TrainingLogger<W>,
    ) -> Result<Vec<f64>> {
        self.fit_with(features, labels, validation, config, Some(logger))
    }

    fn fit_with<W: Write>(
        &mut self,
        features: &Matrix,
        labels: &Matrix,
        validation: Option<(&Matrix, &Matrix)>,
        config: &TrainingConfig,
        mut logger: Option<&mut TrainingLogger<W>>,
    ) -> Result<Vec<f64>> {
        config.validate()?;
        let mut rng = SeededRng::new(config.seed);
        let mut history = Vec::with_capacity(config.epochs);

        for epoch in 0..config.epochs {
            self.train(features, labels, config, &mut rng)?;
            let train_rmse = self.rmse(features, labels)?;
            if !train_rmse.is_finite() {
                warn!("epoch {}: training error is no longer finite", epoch + 1);
            }
            let validation_rmse = match validation {
                Some((vf, vl)) => Some(self.rmse(vf, vl)?),
                None => None,
            };
            info!(
                "epoch {:4} | lr {:.6} | train rmse {:.6}{}",
                epoch + 1,
                config.learning_rate,
                train_rmse,
                validation_rmse.map_or(String::new(), |v| format!(" | validation rmse {:.6}", v))
            );
            if let Some(logger) = logger.as_deref_mut() {
                logger.log(
                    epoch + 1,
                    config.learning_rate,
                    config.batch_size,
                    train_rmse,
                    validation_rmse,
                )?;
            }
            history.push(train_rmse);
        }
        Ok(history)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input {:?}", self.input_dims)?;
        for layer in &self.layers {
            write!(f, " => {}", layer)?;
        }
        write!(f, " => output")
    }
}
