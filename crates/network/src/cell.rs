// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Cell`] trait and the two combinators networks are assembled from.

use crate::{NetworkError, Parameter};
use model_ir::{Graph, GraphBuilder, OpKind, Traced, ValueId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use tensor_core::{DType, Shape};

/// A network building block: owns parameters and records its forward pass.
pub trait Cell: fmt::Debug {
    /// Fully qualified name; also the prefix of every parameter it owns.
    fn name(&self) -> &str;

    /// Records the forward pass of `input` into `builder`.
    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError>;

    /// Parameters in a stable, definition order.
    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// Total number of scalar parameters.
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.shape().num_elements()).sum()
    }
}

/// Materializes every parameter from its initializer with a seeded RNG.
pub fn init_parameters(cell: &mut dyn Cell, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut count = 0;
    for param in cell.parameters_mut() {
        param.materialize(&mut rng);
        count += 1;
    }
    tracing::debug!(cell = cell.name(), parameters = count, seed, "initialized parameters");
}

/// Traces `cell` on a single `f32` input named `x`.
pub fn trace_network(cell: &dyn Cell, input_shape: Shape) -> Result<Graph<Traced>, NetworkError> {
    let mut builder = GraphBuilder::new(cell.name());
    let x = builder.input("x", input_shape, DType::F32);
    let y = cell.trace(&mut builder, x)?;
    builder.output(y);
    Ok(builder.finish())
}

// ── Combinators ────────────────────────────────────────────────────

/// Cells applied one after another.
#[derive(Debug)]
pub struct Sequential {
    name: String,
    cells: Vec<Box<dyn Cell>>,
}

impl Sequential {
    pub fn new(name: impl Into<String>, cells: Vec<Box<dyn Cell>>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Cell for Sequential {
    fn name(&self) -> &str {
        &self.name
    }

    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError> {
        self.cells.iter().try_fold(input, |x, cell| cell.trace(builder, x))
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.cells.iter().flat_map(|c| c.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.cells.iter_mut().flat_map(|c| c.parameters_mut()).collect()
    }
}

/// Parallel branches over the same input, concatenated along channels.
#[derive(Debug)]
pub struct Branches {
    name: String,
    branches: Vec<Box<dyn Cell>>,
}

impl Branches {
    pub fn new(name: impl Into<String>, branches: Vec<Box<dyn Cell>>) -> Self {
        Self {
            name: name.into(),
            branches,
        }
    }
}

impl Cell for Branches {
    fn name(&self) -> &str {
        &self.name
    }

    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError> {
        let outputs = self
            .branches
            .iter()
            .map(|branch| branch.trace(builder, input))
            .collect::<Result<Vec<_>, _>>()?;
        let concat = builder.node1(format!("{}.concat", self.name), OpKind::Concat { axis: 1 }, &outputs)?;
        Ok(concat)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.branches.iter().flat_map(|c| c.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.branches.iter_mut().flat_map(|c| c.parameters_mut()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{max_pool2d, BasicConv2d};
    use tensor_core::PadMode;

    #[test]
    fn test_branches_concatenate_channels() {
        let cell = Branches::new(
            "mixed",
            vec![
                Box::new(BasicConv2d::new("mixed.branch_0", 4, 6, (1, 1), 1, PadMode::Valid)),
                Box::new(max_pool2d("mixed.branch_1", 1, 1, PadMode::Valid)),
            ],
        );
        let mut builder = GraphBuilder::new("t");
        let x = builder.input("x", Shape::nchw(1, 4, 5, 5), DType::F32);
        let y = cell.trace(&mut builder, x).unwrap();
        assert_eq!(builder.shape(y), &Shape::nchw(1, 10, 5, 5));
        assert_eq!(cell.parameters().len(), 5);
    }

    #[test]
    fn test_init_and_compile() {
        let mut cell = Sequential::new(
            "seq",
            vec![Box::new(BasicConv2d::new("seq.0", 1, 2, (3, 3), 1, PadMode::Same))],
        );
        assert!(trace_network(&cell, Shape::nchw(1, 1, 4, 4)).unwrap().compile().is_err());
        init_parameters(&mut cell, 1);
        let graph = trace_network(&cell, Shape::nchw(1, 1, 4, 4)).unwrap().compile().unwrap();
        assert_eq!(graph.parameter_count(), cell.parameter_count());
    }
}
