// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 2-D convolution over NCHW tensors.

use crate::{DType, Shape, Tensor, TensorError, TensorView, Window2d};

/// Convolves `input` (`[N, C, H, W]`) with `weight` (`[O, C, kh, kw]`).
///
/// `window.kernel` must match the weight's spatial extent. `bias`, when
/// given, is `[O]`. `output` must be `[N, O, out_h, out_w]` as resolved by
/// [`Window2d::resolve`]. Dilation is 1 and there is a single group.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] for any inconsistent operand and
/// [`TensorError::UnsupportedDType`] for non-`F32` operands.
pub fn conv2d(
    input: &TensorView<'_>,
    weight: &TensorView<'_>,
    bias: Option<&TensorView<'_>>,
    window: &Window2d,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    for t in [input, weight].into_iter().chain(bias) {
        if t.dtype() != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "conv2d",
                dtype: t.dtype(),
            });
        }
    }

    let (n, c, h, w) = input.shape().as_nchw().ok_or_else(|| TensorError::InvalidArgument {
        op: "conv2d",
        detail: format!("input must be NCHW, got {}", input.shape()),
    })?;
    let (o, wc, kh, kw) = weight.shape().as_nchw().ok_or_else(|| TensorError::InvalidArgument {
        op: "conv2d",
        detail: format!("weight must be OIHW, got {}", weight.shape()),
    })?;
    if wc != c || (kh, kw) != window.kernel {
        return Err(TensorError::ShapeMismatch {
            op: "conv2d (weight)",
            lhs: input.shape().clone(),
            rhs: weight.shape().clone(),
        });
    }
    if let Some(b) = bias {
        if b.shape() != &Shape::vector(o) {
            return Err(TensorError::ShapeMismatch {
                op: "conv2d (bias)",
                lhs: Shape::vector(o),
                rhs: b.shape().clone(),
            });
        }
    }

    let resolved = window.resolve("conv2d", h, w)?;
    let (oh, ow) = (resolved.out_h, resolved.out_w);
    let expected = Shape::nchw(n, o, oh, ow);
    if output.shape() != &expected || output.dtype() != DType::F32 {
        return Err(TensorError::ShapeMismatch {
            op: "conv2d (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let src = input.as_f32_slice();
    let wt = weight.as_f32_slice();
    let bias = bias.map(|b| b.as_f32_slice());
    let dst = output.as_f32_slice_mut();
    let (sh, sw) = window.stride;
    let (top, left) = (resolved.padding.top, resolved.padding.left);

    for b in 0..n {
        for oc in 0..o {
            let out_plane = &mut dst[(b * o + oc) * oh * ow..][..oh * ow];
            out_plane.fill(bias.map_or(0.0, |v| v[oc]));

            for ic in 0..c {
                let in_plane = &src[(b * c + ic) * h * w..][..h * w];
                let kernel = &wt[(oc * c + ic) * kh * kw..][..kh * kw];

                for ky in 0..kh {
                    for kx in 0..kw {
                        let wv = kernel[ky * kw + kx];
                        for oy in 0..oh {
                            // Row index in the unpadded input.
                            let Some(iy) = (oy * sh + ky).checked_sub(top) else {
                                continue;
                            };
                            if iy >= h {
                                continue;
                            }
                            let in_row = &in_plane[iy * w..][..w];
                            let out_row = &mut out_plane[oy * ow..][..ow];
                            for (ox, acc) in out_row.iter_mut().enumerate() {
                                match (ox * sw + kx).checked_sub(left) {
                                    Some(ix) if ix < w => *acc += wv * in_row[ix],
                                    _ => {}
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PadMode;

    #[test]
    fn test_identity_kernel() {
        let input = Tensor::from_f32(Shape::nchw(1, 1, 2, 2), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let weight = Tensor::from_f32(Shape::nchw(1, 1, 1, 1), &[2.0]).unwrap();
        let mut output = Tensor::zeros(Shape::nchw(1, 1, 2, 2), DType::F32);
        conv2d(
            &input.view(),
            &weight.view(),
            None,
            &Window2d::square(1, 1, PadMode::Valid),
            &mut output,
        )
        .unwrap();
        assert_eq!(output.as_f32_slice(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_valid_3x3_sum() {
        // A 3x3 all-ones kernel over a 3x3 input yields the sum.
        let input = Tensor::from_f32(
            Shape::nchw(1, 1, 3, 3),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
        )
        .unwrap();
        let weight = Tensor::ones(Shape::nchw(1, 1, 3, 3));
        let bias = Tensor::from_f32(Shape::vector(1), &[0.5]).unwrap();
        let mut output = Tensor::zeros(Shape::nchw(1, 1, 1, 1), DType::F32);
        conv2d(
            &input.view(),
            &weight.view(),
            Some(&bias.view()),
            &Window2d::square(3, 1, PadMode::Valid),
            &mut output,
        )
        .unwrap();
        assert_eq!(output.as_f32_slice(), &[45.5]);
    }

    #[test]
    fn test_same_padding_corners() {
        // With zero padding, the corner of a 3x3 ones-conv over ones sees 4 values.
        let input = Tensor::ones(Shape::nchw(1, 1, 3, 3));
        let weight = Tensor::ones(Shape::nchw(1, 1, 3, 3));
        let mut output = Tensor::zeros(Shape::nchw(1, 1, 3, 3), DType::F32);
        conv2d(
            &input.view(),
            &weight.view(),
            None,
            &Window2d::square(3, 1, PadMode::Same),
            &mut output,
        )
        .unwrap();
        assert_eq!(
            output.as_f32_slice(),
            &[4.0, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0]
        );
    }

    #[test]
    fn test_multi_channel_stride() {
        // Two input channels summed, stride 2 over a 4x4 input.
        let input = Tensor::ones(Shape::nchw(1, 2, 4, 4));
        let weight = Tensor::ones(Shape::nchw(3, 2, 2, 2));
        let mut output = Tensor::zeros(Shape::nchw(1, 3, 2, 2), DType::F32);
        conv2d(
            &input.view(),
            &weight.view(),
            None,
            &Window2d::square(2, 2, PadMode::Valid),
            &mut output,
        )
        .unwrap();
        assert!(output.as_f32_slice().iter().all(|&x| x == 8.0));
    }

    #[test]
    fn test_channel_mismatch() {
        let input = Tensor::ones(Shape::nchw(1, 2, 4, 4));
        let weight = Tensor::ones(Shape::nchw(1, 3, 1, 1));
        let mut output = Tensor::zeros(Shape::nchw(1, 1, 4, 4), DType::F32);
        let r = conv2d(
            &input.view(),
            &weight.view(),
            None,
            &Window2d::square(1, 1, PadMode::Valid),
            &mut output,
        );
        assert!(matches!(r, Err(TensorError::ShapeMismatch { .. })));
    }
}
