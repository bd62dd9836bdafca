// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! LeNet-5 for 32x32 inputs.

use crate::cell::Sequential;
use crate::layers::{flatten, max_pool2d, relu, Conv2d, Dense};
use crate::{Cell, NetworkError, Parameter};
use model_ir::{GraphBuilder, ValueId};
use tensor_core::PadMode;

pub const INPUT_SIZE: usize = 32;

#[derive(Debug)]
pub struct LeNet5 {
    body: Sequential,
}

impl LeNet5 {
    /// # Errors
    /// [`NetworkError::InvalidConfig`] for zero channels or classes.
    pub fn new(in_channels: usize, classes: usize) -> Result<Self, NetworkError> {
        if in_channels == 0 || classes == 0 {
            return Err(NetworkError::InvalidConfig(format!(
                "lenet5 needs at least one input channel and one class (got {in_channels} channels, {classes} classes)"
            )));
        }
        let body = Sequential::new(
            "lenet5",
            vec![
                Box::new(Conv2d::new("conv1", in_channels, 6, (5, 5), 1, PadMode::Valid, false)),
                Box::new(relu("relu1")),
                Box::new(max_pool2d("pool1", 2, 2, PadMode::Valid)),
                Box::new(Conv2d::new("conv2", 6, 16, (5, 5), 1, PadMode::Valid, false)),
                Box::new(relu("relu2")),
                Box::new(max_pool2d("pool2", 2, 2, PadMode::Valid)),
                Box::new(flatten("flatten")),
                Box::new(Dense::new("fc1", 16 * 5 * 5, 120)),
                Box::new(relu("relu3")),
                Box::new(Dense::new("fc2", 120, 84)),
                Box::new(relu("relu4")),
                Box::new(Dense::new("fc3", 84, classes)),
            ],
        );
        Ok(Self { body })
    }
}

impl Cell for LeNet5 {
    fn name(&self) -> &str {
        self.body.name()
    }

    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError> {
        self.body.trace(builder, input)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.body.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.body.parameters_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{init_parameters, trace_network};
    use tensor_core::Shape;

    #[test]
    fn test_lenet_compiles_after_init() {
        let mut net = LeNet5::new(1, 10).unwrap();
        init_parameters(&mut net, 0);
        let graph = trace_network(&net, Shape::nchw(1, 1, INPUT_SIZE, INPUT_SIZE)).unwrap().compile().unwrap();
        let out = graph.value(graph.outputs()[0]);
        assert_eq!(out.shape, Shape::matrix(1, 10));
        assert_eq!(graph.parameter_count(), 6 * 25 + 16 * 6 * 25 + 400 * 120 + 120 + 120 * 84 + 84 + 84 * 10 + 10);
    }

    #[test]
    fn test_wrong_input_size_fails_at_dense() {
        let net = LeNet5::new(1, 10).unwrap();
        let err = trace_network(&net, Shape::nchw(1, 1, 28, 28)).unwrap_err();
        assert!(err.to_string().contains("fc1"));
    }
}
