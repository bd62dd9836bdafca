// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dataflow graph of a traced network.
//!
//! # Type-State Pattern
//!
//! ```text
//! Graph<Traced>     produced by the builder (or a decoder), unchecked.
//!       │  .compile()
//!       ▼
//! Graph<Compiled>   topology, names, parameter data and shapes verified.
//! ```
//!
//! Executors and encoders only accept `Graph<Compiled>`.

use crate::{ModelError, OpKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tensor_core::{DType, Shape, Tensor};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph was recorded by the tracer but not checked.
#[derive(Debug, Clone)]
pub struct Traced;

/// Marker: graph passed compilation and can be executed or exported.
#[derive(Debug, Clone)]
pub struct Compiled;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Traced {}
impl GraphState for Compiled {}

// ── Values and nodes ───────────────────────────────────────────────

/// Index of a value within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueId(pub usize);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Where a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Fed by the caller at execution time.
    Input,
    /// Constant data captured at trace time.
    Parameter,
    /// Produced by a node.
    Intermediate,
}

/// A typed edge of the graph.
#[derive(Debug, Clone)]
pub struct Value {
    pub name: String,
    pub kind: ValueKind,
    pub shape: Shape,
    pub dtype: DType,
    /// Parameter data; `None` for inputs and intermediates.
    pub data: Option<Tensor>,
}

/// One operator application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(flatten)]
    pub op: OpKind,
    pub inputs: Vec<ValueId>,
    pub outputs: Vec<ValueId>,
}

// ── Graph ──────────────────────────────────────────────────────────

/// A network as an ordered list of nodes over a value table.
///
/// Nodes are stored in a valid execution order (the order they were
/// traced in).
#[derive(Debug, Clone)]
pub struct Graph<S: GraphState = Traced> {
    name: String,
    values: Vec<Value>,
    nodes: Vec<Node>,
    inputs: Vec<ValueId>,
    outputs: Vec<ValueId>,
    _state: std::marker::PhantomData<S>,
}

impl<S: GraphState> Graph<S> {
    /// Graph name (usually the network's cell name).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value with the given id.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this graph.
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    /// Iterates over parameter values in definition order.
    pub fn parameters(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| v.kind == ValueKind::Parameter)
    }

    /// Looks a value up by name.
    pub fn find_value(&self, name: &str) -> Option<ValueId> {
        self.values.iter().position(|v| v.name == name).map(ValueId)
    }
}

// ── Traced state ───────────────────────────────────────────────────

impl Graph<Traced> {
    /// Assembles a graph from its parts without checking it.
    pub fn from_parts(
        name: String,
        values: Vec<Value>,
        nodes: Vec<Node>,
        inputs: Vec<ValueId>,
        outputs: Vec<ValueId>,
    ) -> Self {
        Self {
            name,
            values,
            nodes,
            inputs,
            outputs,
            _state: std::marker::PhantomData,
        }
    }

    /// Verifies the graph and transitions to the `Compiled` state.
    ///
    /// # Checks
    /// - At least one node and one output.
    /// - Value and node names are unique.
    /// - Graph inputs are `Input` values, and every `Input` value is a graph input.
    /// - Every node operand is defined before use; every intermediate is
    ///   produced by exactly one node.
    /// - Every parameter carries data matching its declared shape and dtype.
    /// - Re-running shape inference reproduces the recorded output shapes.
    pub fn compile(self) -> Result<Graph<Compiled>, ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph(format!("graph '{}' contains no nodes", self.name)));
        }
        if self.outputs.is_empty() {
            return Err(ModelError::InvalidGraph(format!("graph '{}' declares no outputs", self.name)));
        }

        let mut seen = HashSet::new();
        for value in &self.values {
            if !seen.insert(value.name.as_str()) {
                return Err(ModelError::InvalidGraph(format!("duplicate value name '{}'", value.name)));
            }
        }
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(ModelError::InvalidGraph(format!("duplicate node name '{}'", node.name)));
            }
        }

        // Every later size computation relies on this.
        if let Some(value) = self
            .values
            .iter()
            .find(|v| v.shape.checked_size_bytes(v.dtype).is_none())
        {
            return Err(ModelError::InvalidGraph(format!(
                "value '{}' of shape {} {} exceeds the addressable size",
                value.name, value.shape, value.dtype
            )));
        }

        let lookup = |id: ValueId| {
            self.values
                .get(id.0)
                .ok_or_else(|| ModelError::InvalidGraph(format!("value {id} is out of range")))
        };

        let mut defined = vec![false; self.values.len()];
        for &id in &self.inputs {
            let value = lookup(id)?;
            if value.kind != ValueKind::Input {
                return Err(ModelError::InvalidGraph(format!("graph input '{}' is not an input value", value.name)));
            }
            defined[id.0] = true;
        }
        for (index, value) in self.values.iter().enumerate() {
            match value.kind {
                ValueKind::Input if !defined[index] => {
                    return Err(ModelError::InvalidGraph(format!(
                        "input value '{}' is not listed as a graph input",
                        value.name
                    )));
                }
                ValueKind::Parameter => {
                    let data = value
                        .data
                        .as_ref()
                        .ok_or_else(|| ModelError::MissingParameterData { name: value.name.clone() })?;
                    if data.shape() != &value.shape || data.dtype() != value.dtype {
                        return Err(ModelError::InvalidGraph(format!(
                            "parameter '{}' declared as {} {} but holds {} {}",
                            value.name,
                            value.dtype,
                            value.shape,
                            data.dtype(),
                            data.shape(),
                        )));
                    }
                    defined[index] = true;
                }
                _ => {}
            }
        }

        for node in &self.nodes {
            let invalid = |detail: String| ModelError::InvalidNode {
                node: node.name.clone(),
                detail,
            };
            let mut operands = Vec::with_capacity(node.inputs.len());
            for &id in &node.inputs {
                let value = lookup(id)?;
                if !defined[id.0] {
                    return Err(invalid(format!("operand '{}' is used before it is defined", value.name)));
                }
                operands.push((&value.shape, value.dtype));
            }
            let inferred = node.op.infer(&operands).map_err(|source| ModelError::Inference {
                node: node.name.clone(),
                source,
            })?;
            if inferred.len() != node.outputs.len() {
                return Err(invalid(format!(
                    "{} produces {} outputs, node lists {}",
                    node.op.name(),
                    inferred.len(),
                    node.outputs.len()
                )));
            }
            for (&id, (shape, dtype)) in node.outputs.iter().zip(&inferred) {
                let value = lookup(id)?;
                if value.kind != ValueKind::Intermediate || defined[id.0] {
                    return Err(invalid(format!("output '{}' is already defined", value.name)));
                }
                if &value.shape != shape || value.dtype != *dtype {
                    return Err(invalid(format!(
                        "output '{}' recorded as {} {}, inferred {} {}",
                        value.name, value.dtype, value.shape, dtype, shape
                    )));
                }
                defined[id.0] = true;
            }
        }

        for &id in &self.outputs {
            let value = lookup(id)?;
            if !defined[id.0] {
                return Err(ModelError::InvalidGraph(format!("graph output '{}' is never produced", value.name)));
            }
        }

        tracing::debug!(
            graph = %self.name,
            nodes = self.nodes.len(),
            values = self.values.len(),
            "graph compiled"
        );

        Ok(Graph {
            name: self.name,
            values: self.values,
            nodes: self.nodes,
            inputs: self.inputs,
            outputs: self.outputs,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Compiled state ─────────────────────────────────────────────────

impl Graph<Compiled> {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of scalar parameters.
    pub fn parameter_count(&self) -> usize {
        self.parameters().map(|v| v.shape.num_elements()).sum()
    }

    /// Total size of parameter data in bytes.
    pub fn parameter_bytes(&self) -> usize {
        self.parameters().map(|v| v.shape.size_bytes(v.dtype)).sum()
    }

    /// For every value, the index of the last node that reads it.
    ///
    /// `None` means the value must outlive execution: graph outputs,
    /// inputs and parameters, and values nothing reads.
    pub fn liveness(&self) -> Vec<Option<usize>> {
        let mut last_use = vec![None; self.values.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for &id in &node.inputs {
                last_use[id.0] = Some(index);
            }
        }
        for (index, value) in self.values.iter().enumerate() {
            if value.kind != ValueKind::Intermediate {
                last_use[index] = None;
            }
        }
        for &id in &self.outputs {
            last_use[id.0] = None;
        }
        last_use
    }

    /// Node count per operator name.
    pub fn op_histogram(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.op.name()).or_insert(0) += 1;
        }
        counts
    }

    /// Returns a one-line description of the graph.
    pub fn summary(&self) -> String {
        let describe = |ids: &[ValueId]| {
            ids.iter()
                .map(|&id| self.value(id).shape.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Graph '{}': {} nodes, {} parameters ({:.1} MB), inputs [{}] -> outputs [{}]",
            self.name,
            self.num_nodes(),
            self.parameter_count(),
            self.parameter_bytes() as f64 / (1024.0 * 1024.0),
            describe(&self.inputs),
            describe(&self.outputs),
        )
    }
}

impl fmt::Display for Graph<Compiled> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for node in &self.nodes {
            let names = |ids: &[ValueId]| {
                ids.iter()
                    .map(|&id| self.value(id).name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            writeln!(f, "  {:<48} {:<36} ({}) -> ({})", node.name, node.op.to_string(), names(&node.inputs), names(&node.outputs))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GraphBuilder;

    fn relu_graph() -> Graph<Traced> {
        let mut builder = GraphBuilder::new("relu");
        let x = builder.input("x", Shape::vector(4), DType::F32);
        let y = builder.node1("relu", OpKind::Relu, &[x]).unwrap();
        let z = builder.node1("relu2", OpKind::Relu, &[y]).unwrap();
        builder.output(z);
        builder.finish()
    }

    #[test]
    fn test_compile_valid_graph() {
        let graph = relu_graph().compile().unwrap();
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.parameter_count(), 0);
        assert!(graph.summary().contains("2 nodes"));
    }

    #[test]
    fn test_empty_graph_rejected() {
        let builder = GraphBuilder::new("empty");
        let err = builder.finish().compile().unwrap_err();
        assert!(matches!(err, ModelError::InvalidGraph(_)));
    }

    #[test]
    fn test_unaddressable_value_rejected() {
        let mut builder = GraphBuilder::new("huge");
        let x = builder.input("x", Shape::nchw(1, 1 << 32, 1 << 32, 1 << 32), DType::F32);
        let y = builder.node1("relu", OpKind::Relu, &[x]).unwrap();
        builder.output(y);
        let err = builder.finish().compile().unwrap_err();
        assert!(matches!(&err, ModelError::InvalidGraph(msg) if msg.contains("'x'")), "{err}");
    }

    #[test]
    fn test_missing_output_rejected() {
        let mut builder = GraphBuilder::new("no-out");
        let x = builder.input("x", Shape::vector(4), DType::F32);
        builder.node1("relu", OpKind::Relu, &[x]).unwrap();
        assert!(builder.finish().compile().is_err());
    }

    #[test]
    fn test_use_before_definition_rejected() {
        let traced = relu_graph();
        let Graph {
            name,
            values,
            mut nodes,
            inputs,
            outputs,
            ..
        } = traced;
        nodes.swap(0, 1);
        let err = Graph::from_parts(name, values, nodes, inputs, outputs).compile().unwrap_err();
        assert!(matches!(err, ModelError::InvalidNode { .. }));
    }

    #[test]
    fn test_parameter_without_data_rejected() {
        let mut traced = relu_graph();
        traced.values.push(Value {
            name: "w".into(),
            kind: ValueKind::Parameter,
            shape: Shape::vector(2),
            dtype: DType::F32,
            data: None,
        });
        let err = traced.compile().unwrap_err();
        assert!(matches!(err, ModelError::MissingParameterData { .. }));
    }

    #[test]
    fn test_stale_shape_rejected() {
        let mut traced = relu_graph();
        traced.values[1].shape = Shape::vector(5);
        let err = traced.compile().unwrap_err();
        assert!(err.to_string().contains("inferred"));
    }

    #[test]
    fn test_liveness() {
        let graph = relu_graph().compile().unwrap();
        let live = graph.liveness();
        // x is an input, the first relu output dies at node 1, the graph output lives on.
        assert_eq!(live, vec![None, Some(1), None]);
        assert_eq!(graph.op_histogram().get("Relu"), Some(&2));
    }
}
