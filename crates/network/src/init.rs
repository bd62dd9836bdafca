// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Parameter initializers.

use rand::rngs::StdRng;
use rand::Rng;
use tensor_core::{Shape, Tensor};

/// How a parameter's data is generated before a checkpoint is loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Initializer {
    Zeros,
    Ones,
    Constant(f32),
    /// Uniform in `[-bound, bound]`.
    Uniform { bound: f32 },
    /// Glorot uniform: `bound = sqrt(6 / (fan_in + fan_out))`.
    XavierUniform,
}

impl Initializer {
    /// Generates an `f32` tensor of `shape`.
    pub fn generate(&self, shape: &Shape, rng: &mut StdRng) -> Tensor {
        match *self {
            Initializer::Zeros => Tensor::full(shape.clone(), 0.0),
            Initializer::Ones => Tensor::ones(shape.clone()),
            Initializer::Constant(value) => Tensor::full(shape.clone(), value),
            Initializer::Uniform { bound } => uniform(shape, bound, rng),
            Initializer::XavierUniform => {
                let (fan_in, fan_out) = fans(shape);
                let bound = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                uniform(shape, bound, rng)
            }
        }
    }
}

fn uniform(shape: &Shape, bound: f32, rng: &mut StdRng) -> Tensor {
    let bound = bound.abs();
    let mut tensor = Tensor::full(shape.clone(), 0.0);
    for v in tensor.as_f32_slice_mut() {
        *v = rng.random_range(-bound..=bound);
    }
    tensor
}

/// `(fan_in, fan_out)` for dense (`[out, in]`) and conv (`[out, in, kh, kw]`) weights.
fn fans(shape: &Shape) -> (usize, usize) {
    match shape.dims() {
        [] => (1, 1),
        [n] => (*n, *n),
        [out, inp, rest @ ..] => {
            let receptive: usize = rest.iter().product();
            (inp * receptive, out * receptive)
        }
    }
}
