// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the runtime: context setup, checkpoints, execution and export.

use crate::DeviceTarget;
use model_ir::ExportFormat;
use std::path::PathBuf;

/// Errors that can occur while loading, running or exporting a network.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The device target has no backend in this build.
    #[error("device target '{0}' is not supported; only CPU has a backend in this build")]
    UnsupportedDevice(DeviceTarget),

    /// The artifact format cannot be produced for the device target.
    #[error("export format {format} is not supported on device target '{device}'")]
    UnsupportedFormat { format: ExportFormat, device: DeviceTarget },

    /// The checkpoint file does not exist.
    #[error("checkpoint '{}' not found", path.display())]
    CheckpointNotFound { path: PathBuf },

    /// The checkpoint exists but cannot be parsed.
    #[error("malformed checkpoint '{}': {detail}", path.display())]
    MalformedCheckpoint { path: PathBuf, detail: String },

    /// Strict loading found network parameters absent from the checkpoint.
    #[error("checkpoint is missing {} network parameter(s): {}", missing.len(), missing.join(", "))]
    MissingParameters { missing: Vec<String> },

    /// A checkpoint tensor does not fit the parameter it names.
    #[error("parameter '{name}' expects shape {expected}, checkpoint holds {actual}")]
    ParameterShapeMismatch {
        name: String,
        expected: tensor_core::Shape,
        actual: tensor_core::Shape,
    },

    /// A kernel failed while executing a node.
    #[error("execution error in node '{node}': {source}")]
    Execution {
        node: String,
        #[source]
        source: tensor_core::TensorError,
    },

    /// Caller-supplied inputs do not match the graph.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Filesystem failure.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Graph compilation or encoding failed.
    #[error("model error: {0}")]
    ModelError(#[from] model_ir::ModelError),

    /// Network construction or tracing failed.
    #[error("network error: {0}")]
    NetworkError(#[from] network::NetworkError),
}

impl RuntimeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RuntimeError::Io {
            path: path.into(),
            source,
        }
    }
}
