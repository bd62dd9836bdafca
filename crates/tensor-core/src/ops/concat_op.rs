// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Concatenation along an axis.

use crate::{DType, Shape, Tensor, TensorError, TensorView};

/// Computes the shape produced by concatenating `shapes` along `axis`.
///
/// # Errors
/// Returns [`TensorError::InvalidArgument`] for an empty input list or an
/// out-of-range axis, and [`TensorError::ShapeMismatch`] when any
/// non-concatenated dimension differs.
pub fn concat_shape(shapes: &[&Shape], axis: usize) -> Result<Shape, TensorError> {
    let first = shapes.first().ok_or_else(|| TensorError::InvalidArgument {
        op: "concat",
        detail: "no inputs".into(),
    })?;
    if axis >= first.rank() {
        return Err(TensorError::InvalidArgument {
            op: "concat",
            detail: format!("axis {axis} out of range for {first}"),
        });
    }
    let mut total = 0usize;
    for s in shapes {
        let same_rank = s.rank() == first.rank();
        let others_match = same_rank
            && s.dims()
                .iter()
                .zip(first.dims())
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
        if !others_match {
            return Err(TensorError::ShapeMismatch {
                op: "concat",
                lhs: (*first).clone(),
                rhs: (*s).clone(),
            });
        }
        total = total
            .checked_add(s.dims()[axis])
            .ok_or_else(|| TensorError::InvalidArgument {
                op: "concat",
                detail: format!("axis {axis} extent overflows"),
            })?;
    }
    Ok(first.with_dim(axis, total))
}

/// Concatenates `inputs` along `axis` into `output`.
///
/// # Errors
/// See [`concat_shape`]; additionally fails if `output` has the wrong shape
/// or any operand is not `F32`.
pub fn concat(inputs: &[TensorView<'_>], axis: usize, output: &mut Tensor) -> Result<(), TensorError> {
    if let Some(bad) = inputs.iter().find(|t| t.dtype() != DType::F32) {
        return Err(TensorError::UnsupportedDType {
            op: "concat",
            dtype: bad.dtype(),
        });
    }
    let shapes: Vec<&Shape> = inputs.iter().map(|t| t.shape()).collect();
    let expected = concat_shape(&shapes, axis)?;
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "concat (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let outer: usize = expected.dims()[..axis].iter().product();
    let inner: usize = expected.dims()[axis + 1..].iter().product();
    let dst = output.as_f32_slice_mut();
    let mut cursor = 0;
    for o in 0..outer {
        for t in inputs {
            let chunk = t.shape().dims()[axis] * inner;
            let src = &t.as_f32_slice()[o * chunk..(o + 1) * chunk];
            dst[cursor..cursor + chunk].copy_from_slice(src);
            cursor += chunk;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_channels() {
        let a = Tensor::from_f32(Shape::nchw(1, 1, 1, 2), &[1.0, 2.0]).unwrap();
        let b = Tensor::from_f32(Shape::nchw(1, 2, 1, 2), &[3.0, 4.0, 5.0, 6.0]).unwrap();
        let mut out = Tensor::zeros(Shape::nchw(1, 3, 1, 2), DType::F32);
        concat(&[a.view(), b.view()], 1, &mut out).unwrap();
        assert_eq!(out.as_f32_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_concat_interleaves_batches() {
        let a = Tensor::from_f32(Shape::matrix(2, 1), &[1.0, 2.0]).unwrap();
        let b = Tensor::from_f32(Shape::matrix(2, 2), &[10.0, 11.0, 20.0, 21.0]).unwrap();
        let mut out = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
        concat(&[a.view(), b.view()], 1, &mut out).unwrap();
        assert_eq!(out.as_f32_slice(), &[1.0, 10.0, 11.0, 2.0, 20.0, 21.0]);
    }

    #[test]
    fn test_concat_shape_mismatch() {
        let a = Shape::nchw(1, 2, 4, 4);
        let b = Shape::nchw(1, 2, 5, 4);
        assert!(concat_shape(&[&a, &b], 1).is_err());
        assert_eq!(concat_shape(&[&a, &a], 1).unwrap(), Shape::nchw(1, 4, 4, 4));
    }

    #[test]
    fn test_concat_extent_overflow() {
        let a = Shape::matrix(1, usize::MAX);
        let b = Shape::matrix(1, 1);
        let err = concat_shape(&[&a, &b], 1).unwrap_err();
        assert!(matches!(err, TensorError::InvalidArgument { op: "concat", .. }));
    }

    #[test]
    fn test_concat_bad_axis() {
        let a = Shape::matrix(1, 2);
        assert!(concat_shape(&[&a], 2).is_err());
    }
}
