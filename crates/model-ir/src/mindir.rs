// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! MINDIR artifacts: a SafeTensors file whose tensors are the graph
//! parameters and whose header metadata carries the graph as JSON.
//!
//! The header holds exactly one metadata entry ([`GRAPH_METADATA_KEY`]) and
//! no timestamps, so encoding the same graph twice yields identical bytes.

use crate::codec::{from_safetensors_dtype, to_safetensors_dtype};
use crate::graph::{Compiled, Graph, Node, Value, ValueId, ValueKind};
use crate::ModelError;
use safetensors::SafeTensors;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tensor_core::{DType, Shape, Tensor};

/// Version of the embedded graph description.
pub const FORMAT_VERSION: u32 = 1;

/// Header metadata key holding the graph description.
pub const GRAPH_METADATA_KEY: &str = "cellzoo.graph";

const PRODUCER: &str = concat!("cellzoo ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize, Deserialize)]
struct GraphDoc {
    format_version: u32,
    producer: String,
    name: String,
    values: Vec<ValueDoc>,
    nodes: Vec<Node>,
    inputs: Vec<ValueId>,
    outputs: Vec<ValueId>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ValueDoc {
    name: String,
    kind: ValueKind,
    shape: Shape,
    dtype: DType,
}

/// Encodes a compiled graph as a MINDIR artifact.
pub fn encode(graph: &Graph<Compiled>) -> Result<Vec<u8>, ModelError> {
    let doc = GraphDoc {
        format_version: FORMAT_VERSION,
        producer: PRODUCER.to_string(),
        name: graph.name().to_string(),
        values: graph
            .values()
            .iter()
            .map(|v| ValueDoc {
                name: v.name.clone(),
                kind: v.kind,
                shape: v.shape.clone(),
                dtype: v.dtype,
            })
            .collect(),
        nodes: graph.nodes().to_vec(),
        inputs: graph.inputs().to_vec(),
        outputs: graph.outputs().to_vec(),
    };
    let json = serde_json::to_string(&doc)?;

    let encode_err = |detail: String| ModelError::Encode {
        format: "MINDIR",
        detail,
    };
    let mut views = Vec::new();
    for value in graph.parameters() {
        let data = value
            .data
            .as_ref()
            .ok_or_else(|| ModelError::MissingParameterData { name: value.name.clone() })?;
        let view = safetensors::tensor::TensorView::new(
            to_safetensors_dtype(data.dtype()),
            data.shape().dims().to_vec(),
            data.as_bytes(),
        )
        .map_err(|e| encode_err(format!("parameter '{}': {e}", value.name)))?;
        views.push((value.name.clone(), view));
    }

    let metadata = HashMap::from([(GRAPH_METADATA_KEY.to_string(), json)]);
    safetensors::serialize(views, Some(metadata)).map_err(|e| encode_err(e.to_string()))
}

/// Decodes a MINDIR artifact back into a compiled graph.
///
/// # Errors
/// [`ModelError::Decode`] for malformed containers, a missing or
/// incompatible graph description, or missing parameter tensors; any
/// compilation error of the rebuilt graph.
pub fn decode_mindir(bytes: &[u8]) -> Result<Graph<Compiled>, ModelError> {
    let decode_err = |detail: String| ModelError::Decode(detail);

    let (_, metadata) = SafeTensors::read_metadata(bytes).map_err(|e| decode_err(e.to_string()))?;
    let json = metadata
        .metadata()
        .as_ref()
        .and_then(|m| m.get(GRAPH_METADATA_KEY))
        .ok_or_else(|| decode_err(format!("missing '{GRAPH_METADATA_KEY}' metadata entry")))?;
    let doc: GraphDoc = serde_json::from_str(json)?;
    if doc.format_version != FORMAT_VERSION {
        return Err(decode_err(format!(
            "unsupported graph format version {} (expected {FORMAT_VERSION})",
            doc.format_version
        )));
    }
    tracing::debug!(graph = %doc.name, producer = %doc.producer, "decoding MINDIR artifact");

    let tensors = SafeTensors::deserialize(bytes).map_err(|e| decode_err(e.to_string()))?;
    let mut values = Vec::with_capacity(doc.values.len());
    for v in doc.values {
        let data = if v.kind == ValueKind::Parameter {
            let view = tensors
                .tensor(&v.name)
                .map_err(|e| decode_err(format!("parameter '{}': {e}", v.name)))?;
            let dtype = from_safetensors_dtype(view.dtype())
                .ok_or_else(|| decode_err(format!("parameter '{}' has unsupported dtype {:?}", v.name, view.dtype())))?;
            let tensor = Tensor::from_bytes(Shape::new(view.shape().to_vec()), dtype, view.data().to_vec())
                .map_err(|e| decode_err(format!("parameter '{}': {e}", v.name)))?;
            Some(tensor)
        } else {
            None
        };
        values.push(Value {
            name: v.name,
            kind: v.kind,
            shape: v.shape,
            dtype: v.dtype,
            data,
        });
    }

    Graph::from_parts(doc.name, values, doc.nodes, doc.inputs, doc.outputs).compile()
}
