// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully connected layer: `output = input @ weightᵀ + bias`.

use crate::{DType, Shape, Tensor, TensorError, TensorView};

/// Applies a dense layer.
///
/// `input` is `[N, K]`, `weight` is `[M, K]` (one row per output feature),
/// `bias` is `[M]`, and `output` must be `[N, M]`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if dimensions are incompatible.
/// Returns [`TensorError::UnsupportedDType`] if any operand is not `F32`.
pub fn dense(
    input: &TensorView<'_>,
    weight: &TensorView<'_>,
    bias: Option<&TensorView<'_>>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    for t in [input, weight].into_iter().chain(bias) {
        if t.dtype() != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "dense",
                dtype: t.dtype(),
            });
        }
    }

    let (n, k) = match input.shape().dims() {
        &[n, k] => (n, k),
        _ => {
            return Err(TensorError::InvalidArgument {
                op: "dense",
                detail: format!("input must be 2-D, got {}", input.shape()),
            })
        }
    };
    let m = match weight.shape().dims() {
        &[m, wk] if wk == k => m,
        _ => {
            return Err(TensorError::ShapeMismatch {
                op: "dense (weight)",
                lhs: input.shape().clone(),
                rhs: weight.shape().clone(),
            })
        }
    };
    if let Some(b) = bias {
        if b.shape() != &Shape::vector(m) {
            return Err(TensorError::ShapeMismatch {
                op: "dense (bias)",
                lhs: Shape::vector(m),
                rhs: b.shape().clone(),
            });
        }
    }
    let expected = Shape::matrix(n, m);
    if output.shape() != &expected || output.dtype() != DType::F32 {
        return Err(TensorError::ShapeMismatch {
            op: "dense (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let x = input.as_f32_slice();
    let w = weight.as_f32_slice();
    let b = bias.map(|b| b.as_f32_slice());
    let y = output.as_f32_slice_mut();

    // Both operands are walked row-wise, so the inner loop is a contiguous dot product.
    for i in 0..n {
        let x_row = &x[i * k..(i + 1) * k];
        for j in 0..m {
            let w_row = &w[j * k..(j + 1) * k];
            let dot: f32 = x_row.iter().zip(w_row).map(|(a, b)| a * b).sum();
            y[i * m + j] = dot + b.map_or(0.0, |b| b[j]);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_known_values() {
        // x = [[1, 2]], W = [[1, 0], [0, 1], [1, 1]], b = [0, 1, 2]
        let x = Tensor::from_f32(Shape::matrix(1, 2), &[1.0, 2.0]).unwrap();
        let w = Tensor::from_f32(Shape::matrix(3, 2), &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let b = Tensor::from_f32(Shape::vector(3), &[0.0, 1.0, 2.0]).unwrap();
        let mut y = Tensor::zeros(Shape::matrix(1, 3), DType::F32);

        dense(&x.view(), &w.view(), Some(&b.view()), &mut y).unwrap();
        assert_eq!(y.as_f32_slice(), &[1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_dense_no_bias_batch() {
        let x = Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 1.0, 2.0, 3.0]).unwrap();
        let w = Tensor::from_f32(Shape::matrix(1, 2), &[2.0, -1.0]).unwrap();
        let mut y = Tensor::zeros(Shape::matrix(2, 1), DType::F32);

        dense(&x.view(), &w.view(), None, &mut y).unwrap();
        assert_eq!(y.as_f32_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn test_dense_inner_dim_mismatch() {
        let x = Tensor::zeros(Shape::matrix(1, 3), DType::F32);
        let w = Tensor::zeros(Shape::matrix(2, 4), DType::F32);
        let mut y = Tensor::zeros(Shape::matrix(1, 2), DType::F32);
        assert!(dense(&x.view(), &w.view(), None, &mut y).is_err());
    }

    #[test]
    fn test_dense_wrong_output() {
        let x = Tensor::zeros(Shape::matrix(1, 2), DType::F32);
        let w = Tensor::zeros(Shape::matrix(3, 2), DType::F32);
        let mut y = Tensor::zeros(Shape::matrix(1, 2), DType::F32);
        assert!(dense(&x.view(), &w.view(), None, &mut y).is_err());
    }
}
