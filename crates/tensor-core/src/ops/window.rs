// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sliding-window geometry shared by convolution and pooling.
//!
//! Graph shape inference and the kernels both resolve a [`Window2d`]
//! through [`Window2d::resolve`], so the output extents the IR records are
//! exactly the extents the kernels produce.

use crate::TensorError;

/// How a sliding window treats the borders of its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadMode {
    /// No padding; windows that would cross the border are dropped.
    Valid,
    /// Output extent is `ceil(input / stride)`; padding is split evenly
    /// with the odd element going to the bottom/right side.
    Same,
    /// Explicit symmetric padding of `h` rows and `w` columns.
    Pad { h: usize, w: usize },
}

/// Explicit per-side padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding2d {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

/// Kernel size, stride and padding mode of a 2-D window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Window2d {
    /// `(height, width)` of the window.
    pub kernel: (usize, usize),
    /// `(vertical, horizontal)` stride.
    pub stride: (usize, usize),
    pub pad_mode: PadMode,
}

/// A window resolved against a concrete input extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub padding: Padding2d,
    pub out_h: usize,
    pub out_w: usize,
}

impl Window2d {
    /// Square window with equal strides.
    pub fn square(kernel: usize, stride: usize, pad_mode: PadMode) -> Self {
        Self {
            kernel: (kernel, kernel),
            stride: (stride, stride),
            pad_mode,
        }
    }

    /// Computes padding and output extents for an `in_h × in_w` input.
    ///
    /// # Errors
    /// Returns [`TensorError::InvalidArgument`] for zero kernels or strides,
    /// or when the (padded) input is smaller than the kernel.
    pub fn resolve(&self, op: &'static str, in_h: usize, in_w: usize) -> Result<ResolvedWindow, TensorError> {
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        if kh == 0 || kw == 0 || sh == 0 || sw == 0 {
            return Err(TensorError::InvalidArgument {
                op,
                detail: format!("kernel {:?} and stride {:?} must be non-zero", self.kernel, self.stride),
            });
        }
        let (pad_h, pad_w) = match self.pad_mode {
            PadMode::Pad { h, w } => (Some(h), Some(w)),
            _ => (None, None),
        };
        let (top, bottom, out_h) = resolve_axis(op, self.pad_mode, pad_h, in_h, kh, sh)?;
        let (left, right, out_w) = resolve_axis(op, self.pad_mode, pad_w, in_w, kw, sw)?;
        Ok(ResolvedWindow {
            padding: Padding2d {
                top,
                bottom,
                left,
                right,
            },
            out_h,
            out_w,
        })
    }
}

/// Returns `(pad_before, pad_after, output_extent)` along one axis.
fn resolve_axis(
    op: &'static str,
    mode: PadMode,
    explicit: Option<usize>,
    input: usize,
    kernel: usize,
    stride: usize,
) -> Result<(usize, usize, usize), TensorError> {
    let too_small = || TensorError::InvalidArgument {
        op,
        detail: format!("input extent {input} is smaller than kernel {kernel}"),
    };
    let overflow = || TensorError::InvalidArgument {
        op,
        detail: format!("padded extent of {input} overflows"),
    };
    match mode {
        PadMode::Valid => {
            if input < kernel {
                return Err(too_small());
            }
            Ok((0, 0, (input - kernel) / stride + 1))
        }
        PadMode::Same => {
            if input == 0 {
                return Err(too_small());
            }
            let out = input.div_ceil(stride);
            let span = (out - 1)
                .checked_mul(stride)
                .and_then(|v| v.checked_add(kernel))
                .ok_or_else(overflow)?;
            let total = span.saturating_sub(input);
            let before = total / 2;
            Ok((before, total - before, out))
        }
        PadMode::Pad { .. } => {
            let pad = explicit.unwrap_or(0);
            let padded = pad
                .checked_mul(2)
                .and_then(|p| p.checked_add(input))
                .ok_or_else(overflow)?;
            if padded < kernel {
                return Err(too_small());
            }
            Ok((pad, pad, (padded - kernel) / stride + 1))
        }
    }
}
