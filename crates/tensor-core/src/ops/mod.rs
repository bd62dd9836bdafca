// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CPU kernels.
//!
//! Each kernel writes into a pre-allocated output tensor and validates the
//! shapes and dtypes of every operand before touching memory. Only `F32`
//! computation is supported.

mod batch_norm_op;
mod concat_op;
mod conv_op;
mod dense_op;
mod pool_op;
mod relu_op;
mod softmax_op;
mod window;

pub use batch_norm_op::{batch_norm, BatchNormParams};
pub use concat_op::{concat, concat_shape};
pub use conv_op::conv2d;
pub use dense_op::dense;
pub use pool_op::{avg_pool2d, global_avg_pool, max_pool2d};
pub use relu_op::{relu, relu_v2};
pub use softmax_op::softmax;
pub use window::{PadMode, Padding2d, ResolvedWindow, Window2d};
