// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! ONNX export.
//!
//! Graphs are lowered to ONNX nodes and written as a `ModelProto` through
//! `prost`. Parameters become graph initializers holding little-endian
//! `raw_data`.

pub mod proto;

use crate::graph::{Compiled, Graph, Node, ValueId};
use crate::{ModelError, OpKind};
use prost::Message;
use proto::{
    AttributeProto, AttributeType, Dimension, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorProto,
    TensorShapeProto, TensorTypeProto, TypeProto, ValueInfoProto,
};
use tensor_core::{DType, Window2d};

/// ONNX IR version written into `ModelProto.ir_version`.
pub const IR_VERSION: i64 = 7;
/// Version of the default operator set the lowering targets.
pub const OPSET_VERSION: i64 = 13;

const ZERO_CONSTANT: &str = "cellzoo/zero";

/// `TensorProto.DataType` code for a dtype.
fn data_type(dtype: DType) -> i32 {
    match dtype {
        DType::F32 => proto::data_type::FLOAT,
        DType::U8 => proto::data_type::UINT8,
        DType::I8 => proto::data_type::INT8,
        DType::F16 => proto::data_type::FLOAT16,
        DType::BF16 => proto::data_type::BFLOAT16,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Attribute {
    Int(&'static str, i64),
    Float(&'static str, f32),
    Ints(&'static str, Vec<i64>),
}

#[derive(Debug, Clone)]
struct OnnxNode {
    name: String,
    op_type: &'static str,
    inputs: Vec<String>,
    outputs: Vec<String>,
    attributes: Vec<Attribute>,
}

/// Encodes a compiled graph as an ONNX `ModelProto`.
///
/// # Errors
/// Returns [`ModelError::Encode`] if a node cannot be lowered.
pub fn encode(graph: &Graph<Compiled>) -> Result<Vec<u8>, ModelError> {
    let mut nodes = Vec::with_capacity(graph.num_nodes());
    for node in graph.nodes() {
        nodes.extend(lower(graph, node)?.iter().map(node_proto));
    }

    let mut initializer: Vec<TensorProto> = graph
        .parameters()
        .filter_map(|value| {
            let data = value.data.as_ref()?;
            Some(tensor_proto(&value.name, data.shape().dims(), data.dtype(), data.as_bytes()))
        })
        .collect();
    if graph.nodes().iter().any(|n| n.op == OpKind::ReluV2) {
        initializer.push(tensor_proto(ZERO_CONSTANT, &[], DType::F32, &0f32.to_le_bytes()));
    }

    let model = ModelProto {
        ir_version: IR_VERSION,
        producer_name: "cellzoo".into(),
        producer_version: env!("CARGO_PKG_VERSION").into(),
        graph: Some(GraphProto {
            node: nodes,
            name: graph.name().to_string(),
            initializer,
            input: graph.inputs().iter().map(|&id| value_info(graph, id)).collect(),
            output: graph.outputs().iter().map(|&id| value_info(graph, id)).collect(),
        }),
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: OPSET_VERSION,
        }],
    };
    Ok(model.encode_to_vec())
}

fn lower(graph: &Graph<Compiled>, node: &Node) -> Result<Vec<OnnxNode>, ModelError> {
    let names = |ids: &[ValueId]| -> Vec<String> { ids.iter().map(|&id| graph.value(id).name.clone()).collect() };
    let single = |op_type: &'static str, attributes: Vec<Attribute>| OnnxNode {
        name: node.name.clone(),
        op_type,
        inputs: names(&node.inputs),
        outputs: names(&node.outputs),
        attributes,
    };

    let lowered = match &node.op {
        OpKind::Conv2d { window, .. } => {
            let mut attributes = window_attributes(graph, node, window)?;
            attributes.push(Attribute::Ints("dilations", vec![1, 1]));
            attributes.push(Attribute::Int("group", 1));
            single("Conv", attributes)
        }
        OpKind::BatchNorm { eps } => single("BatchNormalization", vec![Attribute::Float("epsilon", *eps)]),
        OpKind::Relu => single("Relu", vec![]),
        OpKind::ReluV2 => {
            let input = names(&node.inputs).remove(0);
            let outputs = names(&node.outputs);
            let greater = format!("{}/greater", node.name);
            return Ok(vec![
                OnnxNode {
                    name: node.name.clone(),
                    op_type: "Relu",
                    inputs: vec![input.clone()],
                    outputs: vec![outputs[0].clone()],
                    attributes: vec![],
                },
                OnnxNode {
                    name: greater.clone(),
                    op_type: "Greater",
                    inputs: vec![input, ZERO_CONSTANT.to_string()],
                    outputs: vec![greater.clone()],
                    attributes: vec![],
                },
                OnnxNode {
                    name: format!("{}/cast", node.name),
                    op_type: "Cast",
                    inputs: vec![greater],
                    outputs: vec![outputs[1].clone()],
                    attributes: vec![Attribute::Int("to", i64::from(data_type(DType::U8)))],
                },
            ]);
        }
        OpKind::MaxPool { window } => single("MaxPool", window_attributes(graph, node, window)?),
        OpKind::AvgPool { window } => {
            let mut attributes = window_attributes(graph, node, window)?;
            attributes.push(Attribute::Int("count_include_pad", 0));
            single("AveragePool", attributes)
        }
        OpKind::GlobalAvgPool => single("GlobalAveragePool", vec![]),
        OpKind::Concat { axis } => single("Concat", vec![Attribute::Int("axis", *axis as i64)]),
        OpKind::Flatten => single("Flatten", vec![Attribute::Int("axis", 1)]),
        OpKind::Dense { .. } => single("Gemm", vec![Attribute::Int("transB", 1)]),
        OpKind::Dropout { .. } => single("Identity", vec![]),
        OpKind::Softmax => single("Softmax", vec![Attribute::Int("axis", -1)]),
    };
    Ok(vec![lowered])
}

/// `kernel_shape`, `strides` and explicit `pads` (`[top, left, bottom, right]`).
fn window_attributes(graph: &Graph<Compiled>, node: &Node, window: &Window2d) -> Result<Vec<Attribute>, ModelError> {
    let input = &graph.value(node.inputs[0]).shape;
    let encode_err = |detail: String| ModelError::Encode {
        format: "ONNX",
        detail: format!("node '{}': {detail}", node.name),
    };
    let (_, _, h, w) = input
        .as_nchw()
        .ok_or_else(|| encode_err(format!("expected an NCHW input, got {input}")))?;
    let resolved = window
        .resolve(node.op.name(), h, w)
        .map_err(|e| encode_err(e.to_string()))?;
    let p = resolved.padding;
    Ok(vec![
        Attribute::Ints("kernel_shape", vec![window.kernel.0 as i64, window.kernel.1 as i64]),
        Attribute::Ints("strides", vec![window.stride.0 as i64, window.stride.1 as i64]),
        Attribute::Ints("pads", vec![p.top as i64, p.left as i64, p.bottom as i64, p.right as i64]),
    ])
}

fn node_proto(node: &OnnxNode) -> NodeProto {
    let attribute = node
        .attributes
        .iter()
        .map(|attribute| match attribute {
            Attribute::Int(name, value) => AttributeProto {
                name: name.to_string(),
                i: *value,
                r#type: AttributeType::Int as i32,
                ..Default::default()
            },
            Attribute::Float(name, value) => AttributeProto {
                name: name.to_string(),
                f: *value,
                r#type: AttributeType::Float as i32,
                ..Default::default()
            },
            Attribute::Ints(name, values) => AttributeProto {
                name: name.to_string(),
                ints: values.clone(),
                r#type: AttributeType::Ints as i32,
                ..Default::default()
            },
        })
        .collect();
    NodeProto {
        input: node.inputs.clone(),
        output: node.outputs.clone(),
        name: node.name.clone(),
        op_type: node.op_type.to_string(),
        attribute,
    }
}

fn tensor_proto(name: &str, dims: &[usize], dtype: DType, raw: &[u8]) -> TensorProto {
    TensorProto {
        dims: dims.iter().map(|&d| d as i64).collect(),
        data_type: data_type(dtype),
        name: name.to_string(),
        raw_data: raw.to_vec(),
    }
}

fn value_info(graph: &Graph<Compiled>, id: ValueId) -> ValueInfoProto {
    let value = graph.value(id);
    let dim = value
        .shape
        .dims()
        .iter()
        .map(|&d| Dimension {
            dim_value: Some(d as i64),
        })
        .collect();
    ValueInfoProto {
        name: value.name.clone(),
        r#type: Some(TypeProto {
            tensor_type: Some(TensorTypeProto {
                elem_type: data_type(value.dtype),
                shape: Some(TensorShapeProto { dim }),
            }),
        }),
    }
}
