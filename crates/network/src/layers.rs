// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer cells.
//!
//! Every layer is constructed with its fully qualified name; parameter and
//! node names are derived from it (`{name}.weight`, `{name}.bn.gamma`, ...).

use crate::{Cell, Initializer, NetworkError, Parameter};
use model_ir::{GraphBuilder, OpKind, ValueId};
use tensor_core::{PadMode, Shape, Window2d};

/// Batch norm epsilon used by [`BasicConv2d`].
pub const BN_EPS: f32 = 1e-3;

// ── Convolution ────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Conv2d {
    name: String,
    window: Window2d,
    weight: Parameter,
    bias: Option<Parameter>,
}

impl Conv2d {
    pub fn new(
        name: impl Into<String>,
        in_channels: usize,
        out_channels: usize,
        kernel: (usize, usize),
        stride: usize,
        pad_mode: PadMode,
        has_bias: bool,
    ) -> Self {
        let name = name.into();
        let weight = Parameter::new(
            format!("{name}.weight"),
            Shape::new(vec![out_channels, in_channels, kernel.0, kernel.1]),
            Initializer::XavierUniform,
        );
        let bias = has_bias.then(|| Parameter::new(format!("{name}.bias"), Shape::vector(out_channels), Initializer::Zeros));
        Self {
            name,
            window: Window2d {
                kernel,
                stride: (stride, stride),
                pad_mode,
            },
            weight,
            bias,
        }
    }
}

impl Cell for Conv2d {
    fn name(&self) -> &str {
        &self.name
    }

    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError> {
        let mut operands = vec![input, self.weight.trace(builder)];
        if let Some(bias) = &self.bias {
            operands.push(bias.trace(builder));
        }
        let op = OpKind::Conv2d {
            window: self.window,
            has_bias: self.bias.is_some(),
        };
        Ok(builder.node1(self.name.clone(), op, &operands)?)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        std::iter::once(&self.weight).chain(self.bias.as_ref()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        std::iter::once(&mut self.weight).chain(self.bias.as_mut()).collect()
    }
}

// ── Normalization ──────────────────────────────────────────────────

/// Inference-mode batch normalization over channels.
#[derive(Debug)]
pub struct BatchNorm2d {
    name: String,
    eps: f32,
    gamma: Parameter,
    beta: Parameter,
    moving_mean: Parameter,
    moving_variance: Parameter,
}

impl BatchNorm2d {
    pub fn new(name: impl Into<String>, channels: usize, eps: f32) -> Self {
        let name = name.into();
        let param = |suffix: &str, init| Parameter::new(format!("{name}.{suffix}"), Shape::vector(channels), init);
        Self {
            gamma: param("gamma", Initializer::Ones),
            beta: param("beta", Initializer::Zeros),
            moving_mean: param("moving_mean", Initializer::Zeros),
            moving_variance: param("moving_variance", Initializer::Ones),
            name,
            eps,
        }
    }
}

impl Cell for BatchNorm2d {
    fn name(&self) -> &str {
        &self.name
    }

    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError> {
        let operands = [
            input,
            self.gamma.trace(builder),
            self.beta.trace(builder),
            self.moving_mean.trace(builder),
            self.moving_variance.trace(builder),
        ];
        Ok(builder.node1(self.name.clone(), OpKind::BatchNorm { eps: self.eps }, &operands)?)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.gamma, &self.beta, &self.moving_mean, &self.moving_variance]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![
            &mut self.gamma,
            &mut self.beta,
            &mut self.moving_mean,
            &mut self.moving_variance,
        ]
    }
}

/// Convolution without bias, batch norm, ReLU.
#[derive(Debug)]
pub struct BasicConv2d {
    name: String,
    conv: Conv2d,
    bn: BatchNorm2d,
}

impl BasicConv2d {
    pub fn new(
        name: impl Into<String>,
        in_channels: usize,
        out_channels: usize,
        kernel: (usize, usize),
        stride: usize,
        pad_mode: PadMode,
    ) -> Self {
        let name = name.into();
        Self {
            conv: Conv2d::new(format!("{name}.conv"), in_channels, out_channels, kernel, stride, pad_mode, false),
            bn: BatchNorm2d::new(format!("{name}.bn"), out_channels, BN_EPS),
            name,
        }
    }
}

impl Cell for BasicConv2d {
    fn name(&self) -> &str {
        &self.name
    }

    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError> {
        let x = self.conv.trace(builder, input)?;
        let x = self.bn.trace(builder, x)?;
        Ok(builder.node1(format!("{}.relu", self.name), OpKind::Relu, &[x])?)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = self.conv.parameters();
        params.extend(self.bn.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = self.conv.parameters_mut();
        params.extend(self.bn.parameters_mut());
        params
    }
}

// ── Dense ──────────────────────────────────────────────────────────

/// Fully connected layer with bias: `y = x·Wᵀ + b`.
#[derive(Debug)]
pub struct Dense {
    name: String,
    weight: Parameter,
    bias: Parameter,
}

impl Dense {
    pub fn new(name: impl Into<String>, in_features: usize, out_features: usize) -> Self {
        let name = name.into();
        Self {
            weight: Parameter::new(
                format!("{name}.weight"),
                Shape::matrix(out_features, in_features),
                Initializer::XavierUniform,
            ),
            bias: Parameter::new(format!("{name}.bias"), Shape::vector(out_features), Initializer::Zeros),
            name,
        }
    }
}

impl Cell for Dense {
    fn name(&self) -> &str {
        &self.name
    }

    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError> {
        let operands = [input, self.weight.trace(builder), self.bias.trace(builder)];
        Ok(builder.node1(self.name.clone(), OpKind::Dense { has_bias: true }, &operands)?)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }
}

// ── Parameter-free layers ──────────────────────────────────────────

/// A cell that maps to exactly one parameter-free operator.
#[derive(Debug)]
pub struct Stateless {
    name: String,
    op: OpKind,
}

impl Cell for Stateless {
    fn name(&self) -> &str {
        &self.name
    }

    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError> {
        Ok(builder.node1(self.name.clone(), self.op.clone(), &[input])?)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        Vec::new()
    }
}

fn stateless(name: impl Into<String>, op: OpKind) -> Stateless {
    Stateless { name: name.into(), op }
}

pub fn max_pool2d(name: impl Into<String>, kernel: usize, stride: usize, pad_mode: PadMode) -> Stateless {
    stateless(name, OpKind::MaxPool {
        window: Window2d::square(kernel, stride, pad_mode),
    })
}

/// Average pooling; padded positions are excluded from the mean.
pub fn avg_pool2d(name: impl Into<String>, kernel: usize, stride: usize, pad_mode: PadMode) -> Stateless {
    stateless(name, OpKind::AvgPool {
        window: Window2d::square(kernel, stride, pad_mode),
    })
}

pub fn relu(name: impl Into<String>) -> Stateless {
    stateless(name, OpKind::Relu)
}

pub fn global_avg_pool(name: impl Into<String>) -> Stateless {
    stateless(name, OpKind::GlobalAvgPool)
}

pub fn flatten(name: impl Into<String>) -> Stateless {
    stateless(name, OpKind::Flatten)
}

/// Dropout that is the identity at inference.
pub fn dropout(name: impl Into<String>, keep_prob: f32) -> Stateless {
    stateless(name, OpKind::Dropout { keep_prob })
}
