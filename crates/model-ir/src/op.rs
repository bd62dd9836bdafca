// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator kinds and their shape inference rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use tensor_core::{concat_shape, DType, Shape, TensorError, Window2d};

/// The computation a graph node performs.
///
/// Operand order is fixed per operator and documented on each variant.
/// Parameters (weights, statistics) are ordinary node inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OpKind {
    /// 2-D convolution. Inputs: `x [N,C,H,W]`, `weight [O,C,kh,kw]`, optional `bias [O]`.
    Conv2d { window: Window2d, has_bias: bool },
    /// Inference batch normalization over axis 1.
    /// Inputs: `x`, `gamma`, `beta`, `moving_mean`, `moving_variance`.
    BatchNorm { eps: f32 },
    /// Rectified linear unit.
    Relu,
    /// ReLU with a second `U8` output marking the positive elements.
    ReluV2,
    MaxPool { window: Window2d },
    AvgPool { window: Window2d },
    /// Mean over the spatial axes, keeping them as extent 1.
    GlobalAvgPool,
    Concat { axis: usize },
    /// Collapses every axis after the batch axis.
    Flatten,
    /// Fully connected layer. Inputs: `x [N,K]`, `weight [M,K]`, optional `bias [M]`.
    Dense { has_bias: bool },
    /// Identity at inference time; `keep_prob` is kept for exporters.
    Dropout { keep_prob: f32 },
    /// Softmax over the last axis.
    Softmax,
}

impl OpKind {
    /// Returns the operator name used in logs and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Conv2d { .. } => "Conv2d",
            OpKind::BatchNorm { .. } => "BatchNorm",
            OpKind::Relu => "Relu",
            OpKind::ReluV2 => "ReluV2",
            OpKind::MaxPool { .. } => "MaxPool",
            OpKind::AvgPool { .. } => "AvgPool",
            OpKind::GlobalAvgPool => "GlobalAvgPool",
            OpKind::Concat { .. } => "Concat",
            OpKind::Flatten => "Flatten",
            OpKind::Dense { .. } => "Dense",
            OpKind::Dropout { .. } => "Dropout",
            OpKind::Softmax => "Softmax",
        }
    }

    /// Number of values the node produces.
    pub fn num_outputs(&self) -> usize {
        match self {
            OpKind::ReluV2 => 2,
            _ => 1,
        }
    }

    /// Infers output shapes and dtypes from the operand descriptors.
    ///
    /// # Errors
    /// Returns a [`TensorError`] when the operand count, ranks, dtypes or
    /// extents are incompatible with the operator.
    pub fn infer(&self, inputs: &[(&Shape, DType)]) -> Result<Vec<(Shape, DType)>, TensorError> {
        let op = self.name();
        self.check_arity(inputs.len())?;
        for &(_, dtype) in inputs {
            if dtype != DType::F32 {
                return Err(TensorError::UnsupportedDType { op, dtype });
            }
        }
        let x = inputs[0].0;

        let out = match self {
            OpKind::Conv2d { window, has_bias } => {
                let (n, c, h, w) = nchw(op, x)?;
                let weight = inputs[1].0;
                let [o, wc, kh, kw] = weight.dims() else {
                    return Err(rank_error(op, "weight", 4, weight));
                };
                if *wc != c || (*kh, *kw) != window.kernel {
                    return Err(TensorError::ShapeMismatch {
                        op,
                        lhs: x.clone(),
                        rhs: weight.clone(),
                    });
                }
                if *has_bias {
                    expect_shape(op, inputs[2].0, &Shape::vector(*o))?;
                }
                let resolved = window.resolve(op, h, w)?;
                vec![(Shape::nchw(n, *o, resolved.out_h, resolved.out_w), DType::F32)]
            }
            OpKind::BatchNorm { .. } => {
                let channels = x.dim(1).ok_or_else(|| rank_error(op, "input", 2, x))?;
                let expected = Shape::vector(channels);
                for &(param, _) in &inputs[1..] {
                    expect_shape(op, param, &expected)?;
                }
                vec![(x.clone(), DType::F32)]
            }
            OpKind::Relu | OpKind::Dropout { .. } | OpKind::Softmax => vec![(x.clone(), DType::F32)],
            OpKind::ReluV2 => vec![(x.clone(), DType::F32), (x.clone(), DType::U8)],
            OpKind::MaxPool { window } | OpKind::AvgPool { window } => {
                let (n, c, h, w) = nchw(op, x)?;
                let resolved = window.resolve(op, h, w)?;
                vec![(Shape::nchw(n, c, resolved.out_h, resolved.out_w), DType::F32)]
            }
            OpKind::GlobalAvgPool => {
                let (n, c, _, _) = nchw(op, x)?;
                vec![(Shape::nchw(n, c, 1, 1), DType::F32)]
            }
            OpKind::Concat { axis } => {
                let shapes: Vec<&Shape> = inputs.iter().map(|(s, _)| *s).collect();
                vec![(concat_shape(&shapes, *axis)?, DType::F32)]
            }
            OpKind::Flatten => {
                let Some((&n, rest)) = x.dims().split_first() else {
                    return Err(rank_error(op, "input", 1, x));
                };
                let features = Shape::new(rest.to_vec()).checked_num_elements().ok_or_else(|| {
                    TensorError::InvalidArgument {
                        op,
                        detail: format!("element count of {x} overflows"),
                    }
                })?;
                vec![(Shape::matrix(n, features), DType::F32)]
            }
            OpKind::Dense { has_bias } => {
                let weight = inputs[1].0;
                let [n, k] = x.dims() else {
                    return Err(rank_error(op, "input", 2, x));
                };
                let [m, wk] = weight.dims() else {
                    return Err(rank_error(op, "weight", 2, weight));
                };
                if k != wk {
                    return Err(TensorError::ShapeMismatch {
                        op,
                        lhs: x.clone(),
                        rhs: weight.clone(),
                    });
                }
                if *has_bias {
                    expect_shape(op, inputs[2].0, &Shape::vector(*m))?;
                }
                vec![(Shape::matrix(*n, *m), DType::F32)]
            }
        };
        Ok(out)
    }

    fn check_arity(&self, got: usize) -> Result<(), TensorError> {
        let (min, max) = match self {
            OpKind::Conv2d { has_bias, .. } | OpKind::Dense { has_bias } => {
                let n = if *has_bias { 3 } else { 2 };
                (n, n)
            }
            OpKind::BatchNorm { .. } => (5, 5),
            OpKind::Concat { .. } => (1, usize::MAX),
            _ => (1, 1),
        };
        if got < min || got > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("at least {min}")
            };
            return Err(TensorError::InvalidArgument {
                op: self.name(),
                detail: format!("expected {expected} inputs, got {got}"),
            });
        }
        Ok(())
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Conv2d { window, .. } | OpKind::MaxPool { window } | OpKind::AvgPool { window } => write!(
                f,
                "{}({}x{}, stride {}x{}, {:?})",
                self.name(),
                window.kernel.0,
                window.kernel.1,
                window.stride.0,
                window.stride.1,
                window.pad_mode,
            ),
            OpKind::Concat { axis } => write!(f, "Concat(axis {axis})"),
            OpKind::Dropout { keep_prob } => write!(f, "Dropout(keep {keep_prob})"),
            OpKind::BatchNorm { eps } => write!(f, "BatchNorm(eps {eps})"),
            _ => f.write_str(self.name()),
        }
    }
}

fn nchw(op: &'static str, shape: &Shape) -> Result<(usize, usize, usize, usize), TensorError> {
    shape.as_nchw().ok_or_else(|| rank_error(op, "input", 4, shape))
}

fn rank_error(op: &'static str, operand: &str, rank: usize, shape: &Shape) -> TensorError {
    TensorError::InvalidArgument {
        op,
        detail: format!("{operand} must have rank {rank}, got {shape}"),
    }
}

fn expect_shape(op: &'static str, actual: &Shape, expected: &Shape) -> Result<(), TensorError> {
    if actual != expected {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: expected.clone(),
            rhs: actual.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::PadMode;

    fn f32s<'a>(shapes: &'a [Shape]) -> Vec<(&'a Shape, DType)> {
        shapes.iter().map(|s| (s, DType::F32)).collect()
    }

    #[test]
    fn test_conv_same_and_valid() {
        let shapes = [Shape::nchw(1, 3, 299, 299), Shape::new(vec![32, 3, 3, 3])];
        let valid = OpKind::Conv2d {
            window: Window2d::square(3, 2, PadMode::Valid),
            has_bias: false,
        };
        assert_eq!(valid.infer(&f32s(&shapes)).unwrap()[0].0, Shape::nchw(1, 32, 149, 149));

        let same = OpKind::Conv2d {
            window: Window2d::square(3, 1, PadMode::Same),
            has_bias: false,
        };
        let shapes = [Shape::nchw(1, 3, 35, 35), Shape::new(vec![8, 3, 3, 3])];
        assert_eq!(same.infer(&f32s(&shapes)).unwrap()[0].0, Shape::nchw(1, 8, 35, 35));
    }

    #[test]
    fn test_conv_channel_mismatch() {
        let op = OpKind::Conv2d {
            window: Window2d::square(1, 1, PadMode::Valid),
            has_bias: false,
        };
        let shapes = [Shape::nchw(1, 3, 8, 8), Shape::new(vec![4, 2, 1, 1])];
        assert!(matches!(op.infer(&f32s(&shapes)), Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_relu_v2_outputs() {
        let shapes = [Shape::nchw(1, 1, 3, 3)];
        let out = OpKind::ReluV2.infer(&f32s(&shapes)).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], (Shape::nchw(1, 1, 3, 3), DType::F32));
        assert_eq!(out[1], (Shape::nchw(1, 1, 3, 3), DType::U8));
    }

    #[test]
    fn test_dense_and_flatten() {
        let shapes = [Shape::nchw(2, 16, 5, 5)];
        let flat = OpKind::Flatten.infer(&f32s(&shapes)).unwrap();
        assert_eq!(flat[0].0, Shape::matrix(2, 400));

        let shapes = [Shape::matrix(2, 400), Shape::matrix(120, 400), Shape::vector(120)];
        let out = OpKind::Dense { has_bias: true }.infer(&f32s(&shapes)).unwrap();
        assert_eq!(out[0].0, Shape::matrix(2, 120));
    }

    #[test]
    fn test_flatten_overflow_is_invalid_argument() {
        let shapes = [Shape::nchw(1, 1 << 32, 1 << 32, 1 << 32)];
        let err = OpKind::Flatten.infer(&f32s(&shapes)).unwrap_err();
        assert!(matches!(err, TensorError::InvalidArgument { op: "Flatten", .. }), "{err}");
    }

    #[test]
    fn test_arity_checked() {
        let shapes = [Shape::nchw(1, 4, 2, 2)];
        let err = OpKind::BatchNorm { eps: 1e-3 }.infer(&f32s(&shapes)).unwrap_err();
        assert!(err.to_string().contains("expected 5 inputs"));
    }

    #[test]
    fn test_non_f32_operand_rejected() {
        let shape = Shape::vector(4);
        let err = OpKind::Relu.infer(&[(&shape, DType::U8)]).unwrap_err();
        assert!(matches!(err, TensorError::UnsupportedDType { .. }));
    }

    #[test]
    fn test_serde_tagged() {
        let op = OpKind::Concat { axis: 1 };
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"{"op":"concat","axis":1}"#);
        let back: OpKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
