// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Dense tensors and the CPU kernels behind cellzoo's graph executor.
//!
//! This crate provides:
//! - [`Tensor`]: an owned, row-major n-dimensional tensor.
//! - [`Shape`]: runtime shape descriptors (NCHW for images).
//! - [`DType`]: element types (f32 compute; f16/bf16 for checkpoint upcast; u8 masks).
//! - Kernels: convolution, batch norm, pooling, concat, dense, ReLU / ReLUV2, softmax.
//! - [`Window2d`]: sliding-window geometry shared with graph shape inference.
//!
//! # Design Goals
//! - Kernels write into pre-allocated outputs.
//! - Every kernel validates operand shapes before touching memory.
//! - Clean error types via `thiserror`.

mod dtype;
mod error;
mod ops;
mod shape;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use ops::{
    avg_pool2d, batch_norm, concat, concat_shape, conv2d, dense, global_avg_pool, max_pool2d,
    relu, relu_v2, softmax, BatchNormParams, PadMode, Padding2d, ResolvedWindow, Window2d,
};
pub use shape::Shape;
pub use tensor::{Tensor, TensorView};
