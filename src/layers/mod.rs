//! Neural Network Layers
//!
//! A [`Layer`] is one computational stage of a network. Every layer owns three
//! flat buffers:
//!
//! - **activation**: output of the last forward pass
//! - **blame**: error signal from the downstream layer, same length as activation
//! - **weight**: learnable parameters (empty for unparametrized variants)
//!
//! Buffer sizes are fixed when the layer is built from its declared input and
//! output dims and never change afterwards.
//!
//! ## Variants
//!
//! - **Identity**, **Tanh**, **LeakyRectifier**, **Sinusoidal**: elementwise,
//!   see [`activation`]
//! - **Linear**: affine map with bias, optional L1/L2 penalty, see [`linear`]
//! - **Convolution**: N-D filter bank, see [`conv`]
//! - **MaxPooling2D**: 2×2 stride-2 pooling, see [`pooling`]
//! - **Composite** / **Stack**: wrappers that fuse several layers into one,
//!   side by side or in series
//!
//! ## Contract
//!
//! ```text
//! activate(x)                 activation = f(x; weight)
//! back_prop(prev_blame)       prev_blame = (∂activation/∂x)ᵀ · blame
//! update_gradient(x, grad)    grad      += (∂activation/∂weight)ᵀ · blame
//! ```
//!
//! `update_gradient` adds into `grad`; it never overwrites. The variant set is
//! closed, so dispatch is a `match` over the variant rather than a trait object.

pub mod activation;
mod composite;
pub mod conv;
pub mod linear;
pub mod pooling;

pub use conv::Convolution;
pub use linear::{Linear, Ratio, Regularization};
pub use pooling::MaxPooling2D;

use crate::error::{check_len, Error, Result};
use crate::rng::SeededRng;
use crate::tensor::volume;
use activation::Sinusoidal;
use composite::{Composite, Stack};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a layer's input or output.
pub type Dims = Vec<usize>;

/// Smallest standard deviation used when drawing initial weights.
pub const MIN_INIT_SCALE: f64 = 0.03;

/// Tag of a layer variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Identity,
    Linear,
    Tanh,
    LeakyRectifier,
    Sinusoidal,
    Convolution,
    MaxPooling2D,
    Composite,
    Stack,
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Identity => "Identity",
            LayerKind::Linear => "Linear",
            LayerKind::Tanh => "Tanh",
            LayerKind::LeakyRectifier => "LeakyRectifier",
            LayerKind::Sinusoidal => "Sinusoidal",
            LayerKind::Convolution => "Convolution",
            LayerKind::MaxPooling2D => "MaxPooling2D",
            LayerKind::Composite => "Composite",
            LayerKind::Stack => "Stack",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Serializable description of a layer, resolved against the previous
/// layer's output dims by [`Layer::from_spec`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSpec {
    Identity,
    Linear {
        outputs: usize,
        #[serde(default)]
        regularization: Option<Regularization>,
    },
    Tanh,
    LeakyRectifier,
    Sinusoidal {
        num_sin: usize,
    },
    Convolution {
        filter: Dims,
        output: Dims,
    },
    #[serde(rename = "max_pooling_2d")]
    MaxPooling2D,
    /// Components side by side; each entry states the input dims it consumes.
    Composite {
        parts: Vec<(Dims, LayerSpec)>,
    },
    Stack {
        stages: Vec<LayerSpec>,
    },
}

/// Per-variant compute state. Buffers are passed in by the owning [`Layer`].
#[derive(Clone, Debug)]
pub(crate) enum Unit {
    Identity,
    Linear(Linear),
    Tanh,
    LeakyRectifier,
    Sinusoidal(Sinusoidal),
    Convolution(Convolution),
    MaxPooling2D(MaxPooling2D),
    Composite(Composite),
    Stack(Stack),
}

impl Unit {
    fn kind(&self) -> LayerKind {
        match self {
            Unit::Identity => LayerKind::Identity,
            Unit::Linear(_) => LayerKind::Linear,
            Unit::Tanh => LayerKind::Tanh,
            Unit::LeakyRectifier => LayerKind::LeakyRectifier,
            Unit::Sinusoidal(_) => LayerKind::Sinusoidal,
            Unit::Convolution(_) => LayerKind::Convolution,
            Unit::MaxPooling2D(_) => LayerKind::MaxPooling2D,
            Unit::Composite(_) => LayerKind::Composite,
            Unit::Stack(_) => LayerKind::Stack,
        }
    }

    fn weight_len(&self) -> usize {
        match self {
            Unit::Linear(l) => l.weight_len(),
            Unit::Convolution(c) => c.weight_len(),
            Unit::Composite(c) => c.weight_len(),
            _ => 0,
        }
    }

    /// Draw `N(0, 1) * max(1 / fan_in, MIN_INIT_SCALE)` for every weight.
    fn init_weight(&self, weight: &mut [f64], rng: &mut SeededRng) {
        let fan_in = match self {
            Unit::Linear(l) => l.inputs(),
            Unit::Convolution(c) => c.fan_in(),
            Unit::Composite(c) => return c.init_weight(weight, rng),
            _ => return,
        };
        let scale = (1.0 / fan_in as f64).max(MIN_INIT_SCALE);
        for w in weight.iter_mut() {
            *w = scale * rng.normal();
        }
    }

    fn activate(&mut self, x: &[f64], weight: &[f64], out: &mut [f64]) -> Result<()> {
        match self {
            Unit::Identity => activation::identity_forward(x, out),
            Unit::Linear(l) => l.forward(x, weight, out),
            Unit::Tanh => activation::tanh_forward(x, out),
            Unit::LeakyRectifier => activation::leaky_rectifier_forward(x, out),
            Unit::Sinusoidal(s) => s.forward(x, out),
            Unit::Convolution(c) => c.forward(x, weight, out)?,
            Unit::MaxPooling2D(p) => p.forward(x, out),
            Unit::Composite(c) => c.activate(x, weight, out)?,
            Unit::Stack(s) => s.activate(x, out)?,
        }
        Ok(())
    }

    fn back_prop(
        &self,
        weight: &[f64],
        act: &[f64],
        blame: &[f64],
        prev_blame: &mut [f64],
    ) -> Result<()> {
        match self {
            Unit::Identity => activation::identity_backward(blame, prev_blame),
            Unit::Linear(l) => l.backward(weight, blame, prev_blame),
            Unit::Tanh => activation::tanh_backward(act, blame, prev_blame),
            Unit::LeakyRectifier => {
                activation::leaky_rectifier_backward(act, blame, prev_blame)
            }
            Unit::Sinusoidal(s) => s.backward(blame, prev_blame),
            Unit::Convolution(c) => c.backward(weight, blame, prev_blame)?,
            Unit::MaxPooling2D(p) => p.backward(blame, prev_blame),
            Unit::Composite(c) => c.back_prop(weight, act, blame, prev_blame)?,
            Unit::Stack(s) => s.back_prop(blame, prev_blame)?,
        }
        Ok(())
    }

    fn update_gradient(
        &self,
        x: &[f64],
        weight: &[f64],
        blame: &[f64],
        gradient: &mut [f64],
    ) -> Result<()> {
        match self {
            Unit::Linear(l) => l.update_gradient(x, weight, blame, gradient),
            Unit::Convolution(c) => c.update_gradient(x, blame, gradient)?,
            Unit::Composite(c) => c.update_gradient(x, weight, blame, gradient)?,
            _ => {}
        }
        Ok(())
    }
}

fn check_positive(context: &str, dims: &[usize]) -> Result<()> {
    if dims.is_empty() || dims.contains(&0) {
        return Err(Error::InvalidShape(format!(
            "{}: dims {:?} must be non-empty and positive",
            context, dims
        )));
    }
    Ok(())
}

/// One stage of a network: a variant plus its activation, blame and weight
/// buffers.
#[derive(Clone, Debug)]
pub struct Layer {
    unit: Unit,
    input_dims: Dims,
    output_dims: Dims,
    activation: Vec<f64>,
    blame: Vec<f64>,
    weight: Vec<f64>,
}

impl Layer {
    fn from_unit(unit: Unit, input_dims: Dims, output_dims: Dims) -> Self {
        let size = volume(&output_dims);
        let weight = vec![0.0; unit.weight_len()];
        Self {
            unit,
            input_dims,
            output_dims,
            activation: vec![0.0; size],
            blame: vec![0.0; size],
            weight,
        }
    }

    /// Pass-through layer.
    pub fn identity(dims: &[usize]) -> Result<Self> {
        check_positive("identity", dims)?;
        Ok(Self::from_unit(Unit::Identity, dims.to_vec(), dims.to_vec()))
    }

    /// Fully connected layer from `volume(input_dims)` inputs to `outputs`.
    ///
    /// # Arguments
    ///
    /// * `input_dims` - Shape of the input; flattened for the affine map
    /// * `outputs` - Number of outputs
    ///
    /// # Example
    ///
    /// ```
    /// use viola::layers::Layer;
    ///
    /// let layer = Layer::linear(&[3], 2).unwrap();
    /// assert_eq!(layer.weight().len(), (3 + 1) * 2);
    /// ```
    pub fn linear(input_dims: &[usize], outputs: usize) -> Result<Self> {
        Self::build_linear(input_dims, outputs, None)
    }

    /// Fully connected layer with L1/L2 penalties on the non-bias weights.
    pub fn regularized_linear(
        input_dims: &[usize],
        outputs: usize,
        regularization: Regularization,
    ) -> Result<Self> {
        regularization.validate()?;
        Self::build_linear(input_dims, outputs, Some(regularization))
    }

    fn build_linear(
        input_dims: &[usize],
        outputs: usize,
        regularization: Option<Regularization>,
    ) -> Result<Self> {
        check_positive("linear input", input_dims)?;
        check_positive("linear output", &[outputs])?;
        let unit = Linear::new(volume(input_dims), outputs, regularization);
        Ok(Self::from_unit(
            Unit::Linear(unit),
            input_dims.to_vec(),
            vec![outputs],
        ))
    }

    pub fn tanh(dims: &[usize]) -> Result<Self> {
        check_positive("tanh", dims)?;
        Ok(Self::from_unit(Unit::Tanh, dims.to_vec(), dims.to_vec()))
    }

    pub fn leaky_rectifier(dims: &[usize]) -> Result<Self> {
        check_positive("leaky rectifier", dims)?;
        Ok(Self::from_unit(
            Unit::LeakyRectifier,
            dims.to_vec(),
            dims.to_vec(),
        ))
    }

    /// Sine on the first `num_sin` values, identity on the remainder.
    pub fn sinusoidal(dims: &[usize], num_sin: usize) -> Result<Self> {
        check_positive("sinusoidal", dims)?;
        if num_sin > volume(dims) {
            return Err(Error::InvalidShape(format!(
                "sinusoidal: {} sine outputs exceed width {}",
                num_sin,
                volume(dims)
            )));
        }
        Ok(Self::from_unit(
            Unit::Sinusoidal(Sinusoidal::new(num_sin)),
            dims.to_vec(),
            dims.to_vec(),
        ))
    }

    /// Bank of `filter_dims[last]` filters over an `input_dims` tensor.
    ///
    /// See [`conv`] for the shape rules.
    pub fn convolution(
        input_dims: &[usize],
        filter_dims: &[usize],
        output_dims: &[usize],
    ) -> Result<Self> {
        let unit = Convolution::new(input_dims, filter_dims, output_dims)?;
        Ok(Self::from_unit(
            Unit::Convolution(unit),
            input_dims.to_vec(),
            output_dims.to_vec(),
        ))
    }

    pub fn max_pooling_2d(input_dims: &[usize]) -> Result<Self> {
        let unit = MaxPooling2D::new(input_dims)?;
        let output_dims = unit.output_dims();
        Ok(Self::from_unit(
            Unit::MaxPooling2D(unit),
            input_dims.to_vec(),
            output_dims,
        ))
    }

    /// Fuse `components` side by side.
    ///
    /// The input is split into consecutive slices sized by each component's
    /// input size; outputs and weights are concatenated in the same order.
    /// Existing component weights are carried over.
    pub fn composite(components: Vec<Layer>) -> Result<Self> {
        let parts = Composite::new(components)?;
        let mut layer = Self::from_unit(
            Unit::Composite(parts.composite),
            vec![parts.input_size],
            vec![parts.output_size],
        );
        layer.weight = parts.weight;
        Ok(layer)
    }

    /// Fuse unparametrized, width-preserving `components` in series.
    ///
    /// # Errors
    ///
    /// - [`Error::Unsupported`] if a component has weights
    /// - [`Error::InvalidShape`] if a component changes the width
    pub fn stack(components: Vec<Layer>) -> Result<Self> {
        let dims = match components.first() {
            Some(first) => first.input_dims.clone(),
            None => return Err(Error::InvalidShape("stack: no components".into())),
        };
        let (stack, _width) = Stack::new(components)?;
        Ok(Self::from_unit(Unit::Stack(stack), dims.clone(), dims))
    }

    /// Build the layer described by `spec` for an input of shape `input_dims`.
    pub fn from_spec(spec: &LayerSpec, input_dims: &[usize]) -> Result<Self> {
        match spec {
            LayerSpec::Identity => Self::identity(input_dims),
            LayerSpec::Linear {
                outputs,
                regularization: None,
            } => Self::linear(input_dims, *outputs),
            LayerSpec::Linear {
                outputs,
                regularization: Some(r),
            } => Self::regularized_linear(input_dims, *outputs, *r),
            LayerSpec::Tanh => Self::tanh(input_dims),
            LayerSpec::LeakyRectifier => Self::leaky_rectifier(input_dims),
            LayerSpec::Sinusoidal { num_sin } => Self::sinusoidal(input_dims, *num_sin),
            LayerSpec::Convolution { filter, output } => {
                Self::convolution(input_dims, filter, output)
            }
            LayerSpec::MaxPooling2D => Self::max_pooling_2d(input_dims),
            LayerSpec::Composite { parts } => {
                let components = parts
                    .iter()
                    .map(|(dims, part)| Self::from_spec(part, dims))
                    .collect::<Result<Vec<_>>>()?;
                let layer = Self::composite(components)?;
                check_len("composite input", volume(input_dims), layer.input_size())?;
                Ok(layer)
            }
            LayerSpec::Stack { stages } => {
                let components = stages
                    .iter()
                    .map(|stage| Self::from_spec(stage, input_dims))
                    .collect::<Result<Vec<_>>>()?;
                Self::stack(components)
            }
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.unit.kind()
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn input_dims(&self) -> &[usize] {
        &self.input_dims
    }

    pub fn output_dims(&self) -> &[usize] {
        &self.output_dims
    }

    pub fn input_size(&self) -> usize {
        volume(&self.input_dims)
    }

    pub fn output_size(&self) -> usize {
        self.activation.len()
    }

    /// Output of the last forward pass.
    pub fn activation(&self) -> &[f64] {
        &self.activation
    }

    pub fn blame(&self) -> &[f64] {
        &self.blame
    }

    /// Where the downstream layer (or the loss) writes this layer's blame.
    pub fn blame_mut(&mut self) -> &mut [f64] {
        &mut self.blame
    }

    pub fn weight(&self) -> &[f64] {
        &self.weight
    }

    pub fn weight_mut(&mut self) -> &mut [f64] {
        &mut self.weight
    }

    /// Copy `weight` into this layer.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if the length differs from the layer's
    /// weight count.
    pub fn set_weight(&mut self, weight: &[f64]) -> Result<()> {
        check_len("Layer::set_weight", self.weight.len(), weight.len())?;
        self.weight.copy_from_slice(weight);
        Ok(())
    }

    /// Draw fresh weights from `N(0, 1) * max(1 / fan_in, 0.03)`.
    pub fn init_weight(&mut self, rng: &mut SeededRng) {
        self.unit.init_weight(&mut self.weight, rng);
    }

    /// Forward pass
    ///
    /// Computes this layer's output from `input`, stores it as the layer's
    /// activation and returns a view of it.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if `input.len()` is not the declared
    /// input size.
    pub fn activate(&mut self, input: &[f64]) -> Result<&[f64]> {
        check_len("Layer::activate", self.input_size(), input.len())?;
        self.unit.activate(input, &self.weight, &mut self.activation)?;
        Ok(&self.activation)
    }

    /// Backward pass
    ///
    /// Propagates this layer's blame through its local derivative and writes
    /// the result into `prev_blame` (overwriting it).
    ///
    /// # Arguments
    ///
    /// * `prev_blame` - Blame of the upstream layer, length = input size
    pub fn back_prop(&self, prev_blame: &mut [f64]) -> Result<()> {
        check_len("Layer::back_prop", self.input_size(), prev_blame.len())?;
        self.unit
            .back_prop(&self.weight, &self.activation, &self.blame, prev_blame)
    }

    /// Accumulate `∂activation/∂weight · blame` into `gradient`.
    ///
    /// # Arguments
    ///
    /// * `input` - The input this layer was last activated with
    /// * `gradient` - Accumulator with one slot per weight
    pub fn update_gradient(&self, input: &[f64], gradient: &mut [f64]) -> Result<()> {
        check_len("Layer::update_gradient input", self.input_size(), input.len())?;
        check_len("Layer::update_gradient", self.weight.len(), gradient.len())?;
        self.unit
            .update_gradient(input, &self.weight, &self.blame, gradient)
    }

    /// Same structure and weights, fresh activation and blame buffers.
    pub fn copy(&self) -> Layer {
        let mut layer = self.clone();
        layer.activation.fill(0.0);
        layer.blame.fill(0.0);
        layer
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} -> {:?}", self.name(), self.input_dims, self.output_dims)?;
        match &self.unit {
            Unit::Linear(l) if l.regularization().is_some() => write!(f, " (regularized)"),
            Unit::Composite(c) => write!(f, " ({} parts)", c.len()),
            Unit::Stack(s) => write!(f, " ({} stages)", s.len()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_layer_round_trip() {
        let mut layer = Layer::identity(&[3]).unwrap();
        let x = vec![1.0, -2.0, 0.5];
        assert_eq!(layer.activate(&x).unwrap(), &x[..]);
        layer.blame_mut().copy_from_slice(&[0.1, 0.2, 0.3]);
        let mut prev = vec![0.0; 3];
        layer.back_prop(&mut prev).unwrap();
        assert_eq!(prev, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_activate_rejects_wrong_input_size() {
        let mut layer = Layer::linear(&[3], 2).unwrap();
        assert!(matches!(
            layer.activate(&[1.0, 2.0]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_linear_buffers_and_output_dims() {
        let layer = Layer::linear(&[2, 2], 3).unwrap();
        assert_eq!(layer.input_size(), 4);
        assert_eq!(layer.output_dims(), &[3]);
        assert_eq!(layer.weight().len(), 15);
        assert_eq!(layer.blame().len(), layer.activation().len());
    }

    #[test]
    fn test_init_weight_scale_follows_fan_in() {
        let mut rng = SeededRng::new(2162018);
        let mut wide = Layer::linear(&[1000], 4).unwrap();
        wide.init_weight(&mut rng);
        let max = wide.weight().iter().fold(0.0f64, |m, w| m.max(w.abs()));
        // scale is 0.03, so no sample should be anywhere near 1
        assert!(max < 0.03 * 6.0);
        assert!(max > 0.0);

        let mut unparametrized = Layer::tanh(&[4]).unwrap();
        unparametrized.init_weight(&mut rng);
        assert!(unparametrized.weight().is_empty());
    }

    #[test]
    fn test_composite_partitions_input_and_concatenates() {
        let mut linear = Layer::linear(&[2], 1).unwrap();
        linear.set_weight(&[1.0, 1.0, 0.5]).unwrap();
        let tanh = Layer::tanh(&[2]).unwrap();
        let mut layer = Layer::composite(vec![linear, tanh]).unwrap();
        assert_eq!(layer.input_size(), 4);
        assert_eq!(layer.output_size(), 3);
        assert_eq!(layer.weight(), &[1.0, 1.0, 0.5]);

        let out = layer.activate(&[1.0, 2.0, 0.0, 0.5]).unwrap().to_vec();
        assert_abs_diff_eq!(out[0], 3.5);
        assert_abs_diff_eq!(out[1], 0.0);
        assert_abs_diff_eq!(out[2], 0.5f64.tanh());

        layer.blame_mut().copy_from_slice(&[1.0, 1.0, 1.0]);
        let mut prev = vec![0.0; 4];
        layer.back_prop(&mut prev).unwrap();
        assert_abs_diff_eq!(prev[0], 1.0);
        assert_abs_diff_eq!(prev[1], 1.0);
        assert_abs_diff_eq!(prev[2], 1.0);
        assert_abs_diff_eq!(prev[3], 1.0 - 0.5f64.tanh().powi(2));

        let mut grad = vec![0.0; 3];
        layer.update_gradient(&[1.0, 2.0, 0.0, 0.5], &mut grad).unwrap();
        assert_eq!(grad, vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_stack_multiplies_derivatives() {
        let stages = vec![Layer::tanh(&[2]).unwrap(), Layer::sinusoidal(&[2], 2).unwrap()];
        let mut layer = Layer::stack(stages).unwrap();
        let x = vec![0.3, -0.8];
        let out = layer.activate(&x).unwrap().to_vec();
        for i in 0..2 {
            assert_abs_diff_eq!(out[i], x[i].tanh().sin(), epsilon = 1e-15);
        }

        layer.blame_mut().copy_from_slice(&[1.0, 2.0]);
        let mut prev = vec![0.0; 2];
        layer.back_prop(&mut prev).unwrap();
        for i in 0..2 {
            let t = x[i].tanh();
            let expected = (i as f64 + 1.0) * t.cos() * (1.0 - t * t);
            assert_abs_diff_eq!(prev[i], expected, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_stack_rejects_weights_and_width_changes() {
        let linear = Layer::linear(&[2], 2).unwrap();
        assert!(matches!(
            Layer::stack(vec![linear]),
            Err(Error::Unsupported(_))
        ));
        let pool = Layer::max_pooling_2d(&[2, 2]).unwrap();
        assert!(matches!(
            Layer::stack(vec![pool]),
            Err(Error::InvalidShape(_))
        ));
        assert!(Layer::stack(Vec::new()).is_err());
    }

    #[test]
    fn test_from_spec_resolves_input_dims() {
        let spec = LayerSpec::Convolution {
            filter: vec![3, 3, 2],
            output: vec![4, 4, 2],
        };
        let layer = Layer::from_spec(&spec, &[4, 4]).unwrap();
        assert_eq!(layer.kind(), LayerKind::Convolution);
        assert_eq!(layer.weight().len(), 18);

        let pool = Layer::from_spec(&LayerSpec::MaxPooling2D, &[4, 4, 2]).unwrap();
        assert_eq!(pool.output_dims(), &[2, 2, 2]);
    }

    #[test]
    fn test_spec_json_shape() {
        let spec: LayerSpec =
            serde_json::from_str(r#"{"kind": "linear", "outputs": 3}"#).unwrap();
        assert_eq!(
            spec,
            LayerSpec::Linear {
                outputs: 3,
                regularization: None
            }
        );
        let spec: LayerSpec =
            serde_json::from_str(r#"{"kind": "sinusoidal", "num_sin": 2}"#).unwrap();
        assert_eq!(spec, LayerSpec::Sinusoidal { num_sin: 2 });
    }

    #[test]
    fn test_copy_keeps_weights_and_clears_state() {
        let mut layer = Layer::linear(&[1], 1).unwrap();
        layer.set_weight(&[2.0, 1.0]).unwrap();
        layer.activate(&[3.0]).unwrap();
        let copy = layer.copy();
        assert_eq!(copy.weight(), &[2.0, 1.0]);
        assert_eq!(copy.activation(), &[0.0]);
        assert_eq!(layer.activation(), &[7.0]);
    }

    #[test]
    fn test_display() {
        let layer = Layer::linear(&[3], 2).unwrap();
        assert_eq!(layer.to_string(), "Linear [3] -> [2]");
    }
}
