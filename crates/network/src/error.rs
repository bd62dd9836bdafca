// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for network construction, parameter updates and tracing.

use model_ir::ModelError;
use tensor_core::{DType, Shape, TensorError};

/// Errors raised by cells and parameters.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Data assigned to a parameter has the wrong shape.
    #[error("parameter '{name}' expects shape {expected}, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: Shape,
        actual: Shape,
    },

    /// Data assigned to a parameter is not `f32`.
    #[error("parameter '{name}' expects f32 data, got {dtype}")]
    DTypeMismatch { name: String, dtype: DType },

    /// The requested network name is not known.
    #[error("unknown network '{0}'; expected one of: inceptionv4, lenet5")]
    UnknownNetwork(String),

    /// A constructor argument is out of range.
    #[error("invalid network configuration: {0}")]
    InvalidConfig(String),

    /// Recording the forward pass failed.
    #[error("tracing failed: {0}")]
    Trace(#[from] ModelError),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}
