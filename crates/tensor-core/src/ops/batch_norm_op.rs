// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference-time batch normalization.

use crate::{DType, Shape, Tensor, TensorError, TensorView};

/// Per-channel statistics and affine parameters, each `[C]`.
#[derive(Debug, Clone, Copy)]
pub struct BatchNormParams<'a> {
    pub gamma: TensorView<'a>,
    pub beta: TensorView<'a>,
    pub moving_mean: TensorView<'a>,
    pub moving_variance: TensorView<'a>,
}

/// Normalizes along axis 1 using running statistics:
///
/// `output = gamma * (x - mean) / sqrt(var + eps) + beta`
///
/// `input` is `[N, C, ...]`; `output` must have the same shape.
///
/// # Errors
/// Returns errors if shapes are incompatible or dtype is not F32.
pub fn batch_norm(
    input: &TensorView<'_>,
    params: &BatchNormParams<'_>,
    eps: f32,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    if input.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op: "batch_norm",
            dtype: input.dtype(),
        });
    }
    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "batch_norm",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    let dims = input.shape().dims();
    if dims.len() < 2 {
        return Err(TensorError::InvalidArgument {
            op: "batch_norm",
            detail: format!("expected at least 2 dims, got {}", input.shape()),
        });
    }

    let (batch, channels) = (dims[0], dims[1]);
    let inner: usize = dims[2..].iter().product();
    let stat_shape = Shape::vector(channels);
    for p in [
        &params.gamma,
        &params.beta,
        &params.moving_mean,
        &params.moving_variance,
    ] {
        if p.shape() != &stat_shape || p.dtype() != DType::F32 {
            return Err(TensorError::ShapeMismatch {
                op: "batch_norm (params)",
                lhs: stat_shape,
                rhs: p.shape().clone(),
            });
        }
    }

    let gamma = params.gamma.as_f32_slice();
    let beta = params.beta.as_f32_slice();
    let mean = params.moving_mean.as_f32_slice();
    let var = params.moving_variance.as_f32_slice();
    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    for b in 0..batch {
        for c in 0..channels {
            let scale = gamma[c] / (var[c] + eps).sqrt();
            let shift = beta[c] - mean[c] * scale;
            let offset = (b * channels + c) * inner;
            for (d, &x) in dst[offset..offset + inner]
                .iter_mut()
                .zip(&src[offset..offset + inner])
            {
                *d = x * scale + shift;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_t(values: &[f32]) -> Tensor {
        Tensor::from_f32(Shape::vector(values.len()), values).unwrap()
    }

    #[test]
    fn test_identity_stats() {
        let input = Tensor::from_f32(Shape::nchw(1, 2, 1, 2), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let (g, b, m, v) = (vec_t(&[1.0, 1.0]), vec_t(&[0.0, 0.0]), vec_t(&[0.0, 0.0]), vec_t(&[1.0, 1.0]));
        let params = BatchNormParams {
            gamma: g.view(),
            beta: b.view(),
            moving_mean: m.view(),
            moving_variance: v.view(),
        };
        let mut output = Tensor::zeros(input.shape().clone(), DType::F32);
        batch_norm(&input.view(), &params, 0.0, &mut output).unwrap();
        assert_eq!(output.as_f32_slice(), input.as_f32_slice());
    }

    #[test]
    fn test_per_channel_affine() {
        // channel 0: (x - 1) / 2 * 3 + 1 ; channel 1: x * 0 + 5
        let input = Tensor::from_f32(Shape::nchw(1, 2, 1, 2), &[1.0, 5.0, 7.0, 9.0]).unwrap();
        let (g, b, m, v) = (vec_t(&[3.0, 0.0]), vec_t(&[1.0, 5.0]), vec_t(&[1.0, 0.0]), vec_t(&[4.0, 1.0]));
        let params = BatchNormParams {
            gamma: g.view(),
            beta: b.view(),
            moving_mean: m.view(),
            moving_variance: v.view(),
        };
        let mut output = Tensor::zeros(input.shape().clone(), DType::F32);
        batch_norm(&input.view(), &params, 0.0, &mut output).unwrap();
        assert_eq!(output.as_f32_slice(), &[1.0, 7.0, 5.0, 5.0]);
    }

    #[test]
    fn test_param_length_mismatch() {
        let input = Tensor::ones(Shape::nchw(1, 2, 2, 2));
        let short = vec_t(&[1.0]);
        let params = BatchNormParams {
            gamma: short.view(),
            beta: short.view(),
            moving_mean: short.view(),
            moving_variance: short.view(),
        };
        let mut output = Tensor::zeros(input.shape().clone(), DType::F32);
        assert!(batch_norm(&input.view(), &params, 1e-3, &mut output).is_err());
    }
}
