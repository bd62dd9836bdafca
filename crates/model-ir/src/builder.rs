// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph recording with shape inference at insertion time.

use crate::graph::{Graph, Node, Traced, Value, ValueId, ValueKind};
use crate::{ModelError, OpKind};
use std::collections::HashMap;
use tensor_core::{DType, Shape, Tensor};

/// Records a network's forward pass as a [`Graph<Traced>`].
///
/// Each [`node`](Self::node) call infers its output shapes immediately, so
/// an inconsistent network fails at the offending node, by name.
#[derive(Debug)]
pub struct GraphBuilder {
    name: String,
    values: Vec<Value>,
    nodes: Vec<Node>,
    inputs: Vec<ValueId>,
    outputs: Vec<ValueId>,
    parameters: HashMap<String, ValueId>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            nodes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: HashMap::new(),
        }
    }

    /// Declares a graph input fed at execution time.
    pub fn input(&mut self, name: impl Into<String>, shape: Shape, dtype: DType) -> ValueId {
        let id = self.push_value(Value {
            name: name.into(),
            kind: ValueKind::Input,
            shape,
            dtype,
            data: None,
        });
        self.inputs.push(id);
        id
    }

    /// Captures parameter data. Registering the same name twice returns the
    /// first value, so shared weights appear once.
    pub fn parameter(&mut self, name: impl Into<String>, data: Tensor) -> ValueId {
        let id = self.declare_parameter(name, data.shape().clone(), data.dtype());
        let value = &mut self.values[id.0];
        if value.data.is_none() {
            value.data = Some(data);
        }
        id
    }

    /// Declares a parameter by shape only. The resulting graph can be
    /// inspected but will not compile until data is present.
    pub fn declare_parameter(&mut self, name: impl Into<String>, shape: Shape, dtype: DType) -> ValueId {
        let name = name.into();
        if let Some(&id) = self.parameters.get(&name) {
            return id;
        }
        let id = self.push_value(Value {
            name: name.clone(),
            kind: ValueKind::Parameter,
            shape,
            dtype,
            data: None,
        });
        self.parameters.insert(name, id);
        id
    }

    /// Appends a node and returns its output values.
    ///
    /// Single-output nodes name their output after the node; multi-output
    /// nodes use `"{node}:{index}"`.
    ///
    /// # Errors
    /// [`ModelError::Inference`] when the operands do not fit the operator,
    /// [`ModelError::InvalidNode`] for unknown operand ids.
    pub fn node(&mut self, name: impl Into<String>, op: OpKind, inputs: &[ValueId]) -> Result<Vec<ValueId>, ModelError> {
        let name = name.into();
        let mut operands = Vec::with_capacity(inputs.len());
        for &id in inputs {
            let value = self.values.get(id.0).ok_or_else(|| ModelError::InvalidNode {
                node: name.clone(),
                detail: format!("operand {id} does not exist"),
            })?;
            operands.push((&value.shape, value.dtype));
        }
        let inferred = op.infer(&operands).map_err(|source| ModelError::Inference {
            node: name.clone(),
            source,
        })?;

        let single = inferred.len() == 1;
        let outputs: Vec<ValueId> = inferred
            .into_iter()
            .enumerate()
            .map(|(index, (shape, dtype))| {
                let value_name = if single { name.clone() } else { format!("{name}:{index}") };
                self.push_value(Value {
                    name: value_name,
                    kind: ValueKind::Intermediate,
                    shape,
                    dtype,
                    data: None,
                })
            })
            .collect();

        tracing::trace!(node = %name, op = %op, "traced node");
        self.nodes.push(Node {
            name,
            op,
            inputs: inputs.to_vec(),
            outputs: outputs.clone(),
        });
        Ok(outputs)
    }

    /// [`node`](Self::node) for single-output operators.
    pub fn node1(&mut self, name: impl Into<String>, op: OpKind, inputs: &[ValueId]) -> Result<ValueId, ModelError> {
        let name = name.into();
        if op.num_outputs() != 1 {
            return Err(ModelError::InvalidNode {
                node: name,
                detail: format!("{} has {} outputs", op.name(), op.num_outputs()),
            });
        }
        let outputs = self.node(name, op, inputs)?;
        Ok(outputs[0])
    }

    /// Marks a value as a graph output.
    pub fn output(&mut self, id: ValueId) {
        self.outputs.push(id);
    }

    /// Shape of a value recorded so far.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this builder.
    pub fn shape(&self, id: ValueId) -> &Shape {
        &self.values[id.0].shape
    }

    pub fn finish(self) -> Graph<Traced> {
        Graph::from_parts(self.name, self.values, self.nodes, self.inputs, self.outputs)
    }

    fn push_value(&mut self, value: Value) -> ValueId {
        let id = ValueId(self.values.len());
        self.values.push(value);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{PadMode, Window2d};

    #[test]
    fn test_infers_at_insertion() {
        let mut builder = GraphBuilder::new("conv");
        let x = builder.input("x", Shape::nchw(1, 3, 8, 8), DType::F32);
        let w = builder.parameter("conv.weight", Tensor::zeros(Shape::new(vec![4, 3, 3, 3]), DType::F32));
        let y = builder
            .node1(
                "conv",
                OpKind::Conv2d {
                    window: Window2d::square(3, 1, PadMode::Valid),
                    has_bias: false,
                },
                &[x, w],
            )
            .unwrap();
        assert_eq!(builder.shape(y), &Shape::nchw(1, 4, 6, 6));
    }

    #[test]
    fn test_inference_error_names_node() {
        let mut builder = GraphBuilder::new("bad");
        let x = builder.input("x", Shape::matrix(1, 10), DType::F32);
        let w = builder.parameter("fc.weight", Tensor::zeros(Shape::matrix(5, 9), DType::F32));
        let err = builder.node1("fc", OpKind::Dense { has_bias: false }, &[x, w]).unwrap_err();
        match err {
            ModelError::Inference { node, .. } => assert_eq!(node, "fc"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_multi_output_naming() {
        let mut builder = GraphBuilder::new("relu_v2");
        let x = builder.input("x", Shape::vector(3), DType::F32);
        let outs = builder.node("act", OpKind::ReluV2, &[x]).unwrap();
        builder.output(outs[0]);
        builder.output(outs[1]);
        let graph = builder.finish().compile().unwrap();
        assert_eq!(graph.value(outs[0]).name, "act:0");
        assert_eq!(graph.value(outs[1]).dtype, DType::U8);
        assert!(GraphBuilder::new("g").node1("act", OpKind::ReluV2, &[]).is_err());
    }

    #[test]
    fn test_shared_parameter_registered_once() {
        let mut builder = GraphBuilder::new("shared");
        let a = builder.parameter("w", Tensor::ones(Shape::vector(2)));
        let b = builder.parameter("w", Tensor::ones(Shape::vector(2)));
        assert_eq!(a, b);
        assert_eq!(builder.finish().parameters().count(), 1);
    }
}
