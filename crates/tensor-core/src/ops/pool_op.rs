// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Spatial pooling over NCHW tensors.

use crate::{DType, Shape, Tensor, TensorError, TensorView, Window2d};

#[derive(Clone, Copy)]
enum Reduce {
    Max,
    Mean,
}

/// Max pooling. Padded positions never win.
///
/// # Errors
/// Returns errors for non-NCHW input, an output shape that differs from the
/// resolved window, or a non-`F32` dtype.
pub fn max_pool2d(
    input: &TensorView<'_>,
    window: &Window2d,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    pool2d("max_pool2d", Reduce::Max, input, window, output)
}

/// Average pooling. The divisor counts only positions inside the input,
/// so border windows under `Same` padding are not diluted by zeros.
///
/// # Errors
/// Same conditions as [`max_pool2d`].
pub fn avg_pool2d(
    input: &TensorView<'_>,
    window: &Window2d,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    pool2d("avg_pool2d", Reduce::Mean, input, window, output)
}

/// Averages each `[H, W]` plane into a single value; output is `[N, C, 1, 1]`.
///
/// # Errors
/// Returns errors for non-NCHW input or a mismatched output.
pub fn global_avg_pool(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    let (n, c, h, w) = nchw("global_avg_pool", input)?;
    let expected = Shape::nchw(n, c, 1, 1);
    if output.shape() != &expected || output.dtype() != DType::F32 {
        return Err(TensorError::ShapeMismatch {
            op: "global_avg_pool",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }
    let plane = h * w;
    let src = input.as_f32_slice();
    for (i, d) in output.as_f32_slice_mut().iter_mut().enumerate() {
        let sum: f32 = src[i * plane..(i + 1) * plane].iter().sum();
        *d = sum / plane as f32;
    }
    Ok(())
}

fn nchw(op: &'static str, input: &TensorView<'_>) -> Result<(usize, usize, usize, usize), TensorError> {
    if input.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op,
            dtype: input.dtype(),
        });
    }
    input.shape().as_nchw().ok_or_else(|| TensorError::InvalidArgument {
        op,
        detail: format!("input must be NCHW, got {}", input.shape()),
    })
}

fn pool2d(
    op: &'static str,
    reduce: Reduce,
    input: &TensorView<'_>,
    window: &Window2d,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let (n, c, h, w) = nchw(op, input)?;
    let resolved = window.resolve(op, h, w)?;
    let (oh, ow) = (resolved.out_h, resolved.out_w);
    let expected = Shape::nchw(n, c, oh, ow);
    if output.shape() != &expected || output.dtype() != DType::F32 {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let (kh, kw) = window.kernel;
    let (sh, sw) = window.stride;
    let (top, left) = (resolved.padding.top as isize, resolved.padding.left as isize);
    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    for plane in 0..n * c {
        let in_plane = &src[plane * h * w..][..h * w];
        let out_plane = &mut dst[plane * oh * ow..][..oh * ow];
        for oy in 0..oh {
            // Clamp the window to the unpadded input.
            let y0 = (oy * sh) as isize - top;
            let ys = y0.clamp(0, h as isize) as usize..(y0 + kh as isize).clamp(0, h as isize) as usize;
            for ox in 0..ow {
                let x0 = (ox * sw) as isize - left;
                let xs = x0.clamp(0, w as isize) as usize..(x0 + kw as isize).clamp(0, w as isize) as usize;

                let mut acc = match reduce {
                    Reduce::Max => f32::NEG_INFINITY,
                    Reduce::Mean => 0.0,
                };
                let mut count = 0usize;
                for y in ys.clone() {
                    for &v in &in_plane[y * w + xs.start..y * w + xs.end] {
                        acc = match reduce {
                            Reduce::Max => acc.max(v),
                            Reduce::Mean => acc + v,
                        };
                        count += 1;
                    }
                }
                out_plane[oy * ow + ox] = match reduce {
                    Reduce::Max => acc,
                    Reduce::Mean if count > 0 => acc / count as f32,
                    Reduce::Mean => 0.0,
                };
            }
        }
    }

    Ok(())
}
