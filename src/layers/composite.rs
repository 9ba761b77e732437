//! Composite and Stack Wrappers
//!
//! Both wrappers turn a list of layers into one [`Layer`] whose activation,
//! blame and weight are single contiguous buffers. The components stop owning
//! storage: only their compute state (the [`Unit`]) is kept, together with the
//! index ranges of the parent buffers they read and write.
//!
//! ## Composite (side by side)
//!
//! ```text
//! input      [ x0      | x1          | x2   ]
//!               unit0     unit1         unit2
//! activation [ a0   | a1         | a2       ]
//! weight     [ w0        | w1 (empty) | w2  ]
//! ```
//!
//! Component `i` sees the `i`-th consecutive slice of the input, sized by its
//! declared input size, and writes the `i`-th slice of the activation.
//!
//! ## Stack (in series)
//!
//! ```text
//! x -> unit0 -> t0 -> unit1 -> t1 -> .. -> unitN -> activation
//! ```
//!
//! A stack composes activation functions into one conceptual unit. Components
//! must be unparametrized and width-preserving. The intermediate outputs are
//! kept so that backpropagation can apply each stage's local derivative in
//! reverse, which multiplies the derivatives together (the chain rule).

use super::{Layer, Unit};
use crate::error::{Error, Result};
use crate::rng::SeededRng;
use std::ops::Range;

#[derive(Clone, Debug)]
struct Part {
    unit: Unit,
    input: Range<usize>,
    output: Range<usize>,
    weight: Range<usize>,
}

/// Side-by-side components over disjoint slices of one buffer.
#[derive(Clone, Debug)]
pub(crate) struct Composite {
    parts: Vec<Part>,
}

/// Buffers and sizes a new [`Composite`] needs its parent [`Layer`] to own.
pub(crate) struct CompositeParts {
    pub composite: Composite,
    pub input_size: usize,
    pub output_size: usize,
    pub weight: Vec<f64>,
}

impl Composite {
    /// Take ownership of the components' units and concatenate their weights.
    pub fn new(components: Vec<Layer>) -> Result<CompositeParts> {
        if components.is_empty() {
            return Err(Error::InvalidShape("composite: no components".into()));
        }
        let mut parts = Vec::with_capacity(components.len());
        let mut weight = Vec::new();
        let (mut input_end, mut output_end) = (0, 0);

        for layer in components {
            let input = input_end..input_end + layer.input_size();
            let output = output_end..output_end + layer.output_size();
            let weight_range = weight.len()..weight.len() + layer.weight.len();
            input_end = input.end;
            output_end = output.end;
            weight.extend_from_slice(&layer.weight);
            parts.push(Part {
                unit: layer.unit,
                input,
                output,
                weight: weight_range,
            });
        }

        Ok(CompositeParts {
            composite: Self { parts },
            input_size: input_end,
            output_size: output_end,
            weight,
        })
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn weight_len(&self) -> usize {
        self.parts.last().map_or(0, |p| p.weight.end)
    }

    pub fn init_weight(&self, weight: &mut [f64], rng: &mut SeededRng) {
        for part in &self.parts {
            part.unit.init_weight(&mut weight[part.weight.clone()], rng);
        }
    }

    pub fn activate(&mut self, x: &[f64], weight: &[f64], out: &mut [f64]) -> Result<()> {
        for part in &mut self.parts {
            part.unit.activate(
                &x[part.input.clone()],
                &weight[part.weight.clone()],
                &mut out[part.output.clone()],
            )?;
        }
        Ok(())
    }

    pub fn back_prop(
        &self,
        weight: &[f64],
        activation: &[f64],
        blame: &[f64],
        prev_blame: &mut [f64],
    ) -> Result<()> {
        for part in &self.parts {
            part.unit.back_prop(
                &weight[part.weight.clone()],
                &activation[part.output.clone()],
                &blame[part.output.clone()],
                &mut prev_blame[part.input.clone()],
            )?;
        }
        Ok(())
    }

    pub fn update_gradient(
        &self,
        x: &[f64],
        weight: &[f64],
        blame: &[f64],
        gradient: &mut [f64],
    ) -> Result<()> {
        for part in &self.parts {
            part.unit.update_gradient(
                &x[part.input.clone()],
                &weight[part.weight.clone()],
                &blame[part.output.clone()],
                &mut gradient[part.weight.clone()],
            )?;
        }
        Ok(())
    }
}

/// Unparametrized, width-preserving components applied in series.
#[derive(Clone, Debug)]
pub(crate) struct Stack {
    stages: Vec<Unit>,
    /// Output of each stage from the last forward pass.
    trace: Vec<Vec<f64>>,
}

impl Stack {
    /// Returns the stack and its width.
    pub fn new(components: Vec<Layer>) -> Result<(Self, usize)> {
        let width = match components.first() {
            Some(first) => first.input_size(),
            None => return Err(Error::InvalidShape("stack: no components".into())),
        };
        let mut stages = Vec::with_capacity(components.len());
        for layer in components {
            if !layer.weight.is_empty() {
                return Err(Error::Unsupported(format!(
                    "stack: {} has weights; only unparametrized layers can be stacked",
                    layer.name()
                )));
            }
            if layer.input_size() != width || layer.output_size() != width {
                return Err(Error::InvalidShape(format!(
                    "stack: {} maps {} -> {}, every stage must keep width {}",
                    layer.name(),
                    layer.input_size(),
                    layer.output_size(),
                    width
                )));
            }
            stages.push(layer.unit);
        }
        let trace = vec![vec![0.0; width]; stages.len()];
        Ok((Self { stages, trace }, width))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn activate(&mut self, x: &[f64], out: &mut [f64]) -> Result<()> {
        let Stack { stages, trace } = self;
        for (i, stage) in stages.iter_mut().enumerate() {
            let (done, rest) = trace.split_at_mut(i);
            let src: &[f64] = if i == 0 { x } else { &done[i - 1] };
            stage.activate(src, &[], &mut rest[0])?;
        }
        if let Some(last) = trace.last() {
            out.copy_from_slice(last);
        }
        Ok(())
    }

    pub fn back_prop(&self, blame: &[f64], prev_blame: &mut [f64]) -> Result<()> {
        let mut current = blame.to_vec();
        let mut prev = vec![0.0; current.len()];
        for (stage, activation) in self.stages.iter().zip(&self.trace).rev() {
            stage.back_prop(&[], activation, &current, &mut prev)?;
            std::mem::swap(&mut current, &mut prev);
        }
        prev_blame.copy_from_slice(&current);
        Ok(())
    }
}
