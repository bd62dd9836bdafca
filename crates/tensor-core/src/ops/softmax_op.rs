// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax over class scores.

use crate::{DType, Tensor, TensorError, TensorView};

/// Computes softmax along the last dimension, subtracting the row maximum
/// before exponentiation.
///
/// Both `input` and `output` must have the same shape and be `F32`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
/// Returns [`TensorError::UnsupportedDType`] if the dtype is not `F32`.
pub fn softmax(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    if input.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op: "softmax",
            dtype: input.dtype(),
        });
    }
    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "softmax",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }

    let classes = input.shape().dims().last().copied().unwrap_or(1);
    if classes == 0 {
        return Ok(());
    }

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();
    for (row_src, row_dst) in src.chunks_exact(classes).zip(dst.chunks_exact_mut(classes)) {
        let max_val = row_src.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0f32;
        for (d, &s) in row_dst.iter_mut().zip(row_src) {
            *d = (s - max_val).exp();
            sum += *d;
        }
        if sum > 0.0 {
            row_dst.iter_mut().for_each(|d| *d /= sum);
        }
    }

    Ok(())
}
