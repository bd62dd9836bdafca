// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named, shaped network parameters.

use crate::{Initializer, NetworkError};
use model_ir::{GraphBuilder, ValueId};
use rand::rngs::StdRng;
use tensor_core::{DType, Shape, Tensor};

/// A trainable tensor owned by a cell.
///
/// Data is allocated lazily: a freshly constructed network only knows its
/// parameter shapes until it is initialized or a checkpoint is loaded.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    shape: Shape,
    init: Initializer,
    data: Option<Tensor>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, shape: Shape, init: Initializer) -> Self {
        Self {
            name: name.into(),
            shape,
            init,
            data: None,
        }
    }

    /// Fully qualified name, e.g. `stem.conv2d_1a_3x3.bn.gamma`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn initializer(&self) -> Initializer {
        self.init
    }

    pub fn data(&self) -> Option<&Tensor> {
        self.data.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.data.is_some()
    }

    /// Replaces the parameter data.
    ///
    /// # Errors
    /// [`NetworkError::ShapeMismatch`] or [`NetworkError::DTypeMismatch`]
    /// if `data` does not match the declared shape or is not `f32`.
    pub fn set_data(&mut self, data: Tensor) -> Result<(), NetworkError> {
        if data.shape() != &self.shape {
            return Err(NetworkError::ShapeMismatch {
                name: self.name.clone(),
                expected: self.shape.clone(),
                actual: data.shape().clone(),
            });
        }
        if data.dtype() != DType::F32 {
            return Err(NetworkError::DTypeMismatch {
                name: self.name.clone(),
                dtype: data.dtype(),
            });
        }
        self.data = Some(data);
        Ok(())
    }

    /// Generates data with the parameter's initializer.
    pub fn materialize(&mut self, rng: &mut StdRng) {
        self.data = Some(self.init.generate(&self.shape, rng));
    }

    /// Registers the parameter with a graph being traced. Parameters
    /// without data are declared by shape only.
    pub fn trace(&self, builder: &mut GraphBuilder) -> ValueId {
        match &self.data {
            Some(data) => builder.parameter(self.name.clone(), data.clone()),
            None => builder.declare_parameter(self.name.clone(), self.shape.clone(), DType::F32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_set_data_checks_shape() {
        let mut p = Parameter::new("fc.bias", Shape::vector(3), Initializer::Zeros);
        assert!(!p.is_initialized());
        let err = p.set_data(Tensor::ones(Shape::vector(4))).unwrap_err();
        assert!(matches!(err, NetworkError::ShapeMismatch { .. }));
        p.set_data(Tensor::ones(Shape::vector(3))).unwrap();
        assert!(p.is_initialized());
    }

    #[test]
    fn test_set_data_checks_dtype() {
        let mut p = Parameter::new("mask", Shape::vector(2), Initializer::Zeros);
        let err = p.set_data(Tensor::from_u8(Shape::vector(2), vec![0, 1]).unwrap()).unwrap_err();
        assert!(matches!(err, NetworkError::DTypeMismatch { .. }));
    }

    #[test]
    fn test_materialize() {
        let mut p = Parameter::new("bn.gamma", Shape::vector(2), Initializer::Ones);
        p.materialize(&mut StdRng::seed_from_u64(0));
        assert_eq!(p.data().unwrap().as_f32_slice(), &[1.0, 1.0]);
    }
}
