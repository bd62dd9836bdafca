// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph construction, compilation and artifact encoding.

use tensor_core::TensorError;

/// Errors that can occur when building, compiling or serializing a graph.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Shape inference rejected a node's operands.
    #[error("shape inference failed at node '{node}': {source}")]
    Inference {
        node: String,
        #[source]
        source: TensorError,
    },

    /// A node definition is inconsistent with the rest of the graph.
    #[error("invalid node '{node}': {detail}")]
    InvalidNode { node: String, detail: String },

    /// The graph as a whole is malformed.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A parameter value reached compilation without data.
    #[error("parameter '{name}' has no data")]
    MissingParameterData { name: String },

    /// The requested format string is not one of the known formats.
    #[error("unknown export format '{0}'; expected MINDIR, ONNX or AIR")]
    UnknownFormat(String),

    /// Serialization into an artifact format failed.
    #[error("failed to encode {format} artifact: {detail}")]
    Encode { format: &'static str, detail: String },

    /// An artifact could not be read back.
    #[error("failed to decode artifact: {0}")]
    Decode(String),

    /// The embedded graph description is malformed JSON.
    #[error("graph description is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
