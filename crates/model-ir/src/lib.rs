// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The dataflow graph a traced network is recorded into, and the encoders
//! that turn it into deployment artifacts.
//!
//! - [`OpKind`]: the operators, each with its shape inference rule.
//! - [`GraphBuilder`]: records nodes and infers shapes as they are added.
//! - [`Graph`]: the graph itself, with a **type-state pattern**
//!   (`Traced` → `Compiled`).
//! - [`ExportFormat`]: MINDIR / ONNX / AIR and their encoders.
//!
//! # Example
//! ```
//! use model_ir::{ExportFormat, GraphBuilder, OpKind};
//! use tensor_core::{DType, Shape};
//!
//! let mut builder = GraphBuilder::new("act");
//! let x = builder.input("x", Shape::nchw(1, 1, 3, 3), DType::F32);
//! let outs = builder.node("relu_v2", OpKind::ReluV2, &[x]).unwrap();
//! builder.output(outs[0]);
//! let graph = builder.finish().compile().unwrap();
//! let bytes = ExportFormat::MindIr.encode(&graph).unwrap();
//! assert!(!bytes.is_empty());
//! ```

mod builder;
mod codec;
mod error;
mod format;
pub mod graph;
mod mindir;
pub mod onnx;
mod op;

pub use builder::GraphBuilder;
pub use codec::{from_safetensors_dtype, to_safetensors_dtype};
pub use error::ModelError;
pub use format::ExportFormat;
pub use graph::{Compiled, Graph, Node, Traced, Value, ValueId, ValueKind};
pub use mindir::{decode_mindir, GRAPH_METADATA_KEY};
pub use op::OpKind;
