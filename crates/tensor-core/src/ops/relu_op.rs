// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Rectified linear activations.

use crate::{DType, Tensor, TensorError, TensorView};

/// Applies `max(x, 0)` element-wise.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
/// Returns [`TensorError::UnsupportedDType`] if the dtype is not `F32`.
pub fn relu(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    check_unary("relu", input, output)?;
    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();
    for (d, &x) in dst.iter_mut().zip(src) {
        *d = relu_scalar(x);
    }
    Ok(())
}

/// ReLU that also reports which elements were active.
///
/// `output` receives `max(x, 0)`. `mask` is a `U8` tensor of the input's
/// shape holding `1` where `x > 0` and `0` elsewhere (including NaN).
///
/// # Errors
/// Same conditions as [`relu`], plus a shape or dtype mismatch on `mask`.
pub fn relu_v2(
    input: &TensorView<'_>,
    output: &mut Tensor,
    mask: &mut Tensor,
) -> Result<(), TensorError> {
    check_unary("relu_v2", input, output)?;
    if mask.dtype() != DType::U8 {
        return Err(TensorError::UnsupportedDType {
            op: "relu_v2 (mask)",
            dtype: mask.dtype(),
        });
    }
    if mask.shape() != input.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "relu_v2 (mask)",
            lhs: input.shape().clone(),
            rhs: mask.shape().clone(),
        });
    }

    let src = input.as_f32_slice();
    for (d, &x) in output.as_f32_slice_mut().iter_mut().zip(src) {
        *d = relu_scalar(x);
    }
    for (m, &x) in mask.as_u8_slice_mut().iter_mut().zip(src) {
        *m = u8::from(x > 0.0);
    }
    Ok(())
}

#[inline(always)]
fn relu_scalar(x: f32) -> f32 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

fn check_unary(op: &'static str, input: &TensorView<'_>, output: &Tensor) -> Result<(), TensorError> {
    if input.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op,
            dtype: input.dtype(),
        });
    }
    if output.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op,
            dtype: output.dtype(),
        });
    }
    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    #[test]
    fn test_relu() {
        let input = Tensor::from_f32(Shape::vector(4), &[-2.0, 0.0, 0.5, 3.0]).unwrap();
        let mut output = Tensor::zeros(Shape::vector(4), DType::F32);
        relu(&input.view(), &mut output).unwrap();
        assert_eq!(output.as_f32_slice(), &[0.0, 0.0, 0.5, 3.0]);
    }

    #[test]
    fn test_relu_v2_output_and_mask() {
        let shape = Shape::nchw(1, 1, 3, 3);
        let input = Tensor::from_f32(
            shape.clone(),
            &[-1.0, 1.0, 10.0, 1.0, -1.0, 1.0, 10.0, 1.0, -1.0],
        )
        .unwrap();
        let mut output = Tensor::zeros(shape.clone(), DType::F32);
        let mut mask = Tensor::zeros(shape, DType::U8);

        relu_v2(&input.view(), &mut output, &mut mask).unwrap();

        assert_eq!(
            output.as_f32_slice(),
            &[0.0, 1.0, 10.0, 1.0, 0.0, 1.0, 10.0, 1.0, 0.0]
        );
        assert_eq!(mask.as_u8_slice(), &[0, 1, 1, 1, 0, 1, 1, 1, 0]);
    }

    #[test]
    fn test_relu_v2_zero_is_inactive() {
        let input = Tensor::from_f32(Shape::vector(2), &[0.0, -0.0]).unwrap();
        let mut output = Tensor::zeros(Shape::vector(2), DType::F32);
        let mut mask = Tensor::zeros(Shape::vector(2), DType::U8);
        relu_v2(&input.view(), &mut output, &mut mask).unwrap();
        assert_eq!(mask.as_u8_slice(), &[0, 0]);
    }

    #[test]
    fn test_relu_v2_mask_dtype() {
        let input = Tensor::zeros(Shape::vector(2), DType::F32);
        let mut output = Tensor::zeros(Shape::vector(2), DType::F32);
        let mut mask = Tensor::zeros(Shape::vector(2), DType::F32);
        assert!(relu_v2(&input.view(), &mut output, &mut mask).is_err());
    }

    #[test]
    fn test_relu_shape_mismatch() {
        let input = Tensor::zeros(Shape::vector(3), DType::F32);
        let mut output = Tensor::zeros(Shape::vector(4), DType::F32);
        assert!(relu(&input.view(), &mut output).is_err());
    }
}
