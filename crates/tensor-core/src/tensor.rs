// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type and view abstractions.

use crate::{DType, Shape, TensorError};

/// Backing buffer. `F32` tensors keep typed storage so that slices are
/// always correctly aligned; every other dtype is kept as raw bytes.
#[derive(Debug, Clone, PartialEq)]
enum Storage {
    F32(Vec<f32>),
    Raw(Vec<u8>),
}

/// An owned, n-dimensional tensor stored in contiguous memory.
///
/// `Tensor` is the data carrier for parameters, graph inputs and kernel
/// outputs. It owns its buffer and exposes immutable views via [`TensorView`].
///
/// # Memory Layout
/// Data is stored in row-major (C) order. Byte access through
/// [`as_bytes`](Tensor::as_bytes) is little-endian, which is also the layout
/// SafeTensors files use.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    storage: Storage,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let storage = match dtype {
            DType::F32 => Storage::F32(vec![0.0; shape.num_elements()]),
            _ => Storage::Raw(vec![0u8; shape.size_bytes(dtype)]),
        };
        Self {
            shape,
            dtype,
            storage,
        }
    }

    /// Creates an `F32` tensor filled with `value`.
    pub fn full(shape: Shape, value: f32) -> Self {
        let n = shape.num_elements();
        Self {
            shape,
            dtype: DType::F32,
            storage: Storage::F32(vec![value; n]),
        }
    }

    /// Creates an `F32` tensor filled with ones.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::ones(Shape::nchw(1, 3, 2, 2));
    /// assert!(t.as_f32_slice().iter().all(|&x| x == 1.0));
    /// ```
    pub fn ones(shape: Shape) -> Self {
        Self::full(shape, 1.0)
    }

    /// Creates a tensor from raw little-endian bytes.
    ///
    /// Returns an error if the buffer size does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: Vec<u8>) -> Result<Self, TensorError> {
        let expected = shape
            .checked_size_bytes(dtype)
            .ok_or_else(|| unaddressable("from_bytes", &shape))?;
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let storage = match dtype {
            DType::F32 => Storage::F32(bytemuck::pod_collect_to_vec::<u8, f32>(&data)),
            _ => Storage::Raw(data),
        };
        Ok(Self {
            shape,
            dtype,
            storage,
        })
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_f32_slice(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_f32_vec(shape, values.to_vec())
    }

    /// Creates a tensor that takes ownership of a `Vec<f32>`.
    pub fn from_f32_vec(shape: Shape, values: Vec<f32>) -> Result<Self, TensorError> {
        let expected_elements = shape
            .checked_num_elements()
            .ok_or_else(|| unaddressable("from_f32", &shape))?;
        if values.len() != expected_elements {
            return Err(TensorError::BufferSizeMismatch {
                expected: expected_elements * DType::F32.size_bytes(),
                actual: values.len() * DType::F32.size_bytes(),
            });
        }
        Ok(Self {
            shape,
            dtype: DType::F32,
            storage: Storage::F32(values),
        })
    }

    /// Creates a `U8` tensor from owned bytes.
    pub fn from_u8(shape: Shape, values: Vec<u8>) -> Result<Self, TensorError> {
        Self::from_bytes(shape, DType::U8, values)
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns an immutable view over this tensor's data.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            shape: &self.shape,
            dtype: self.dtype,
            storage: &self.storage,
        }
    }

    /// Returns the raw byte slice backing this tensor.
    pub fn as_bytes(&self) -> &[u8] {
        storage_bytes(&self.storage)
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.as_bytes().len()
    }

    /// Interprets the buffer as a slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice(&self) -> &[f32] {
        match &self.storage {
            Storage::F32(v) => v,
            Storage::Raw(_) => panic!("as_f32_slice called on {:?} tensor", self.dtype),
        }
    }

    /// Interprets the buffer as a mutable slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        match &mut self.storage {
            Storage::F32(v) => v,
            Storage::Raw(_) => panic!("as_f32_slice_mut called on {:?} tensor", self.dtype),
        }
    }

    /// Returns the elements of a `U8` tensor.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::U8`.
    pub fn as_u8_slice(&self) -> &[u8] {
        assert_eq!(
            self.dtype,
            DType::U8,
            "as_u8_slice called on {:?} tensor",
            self.dtype
        );
        storage_bytes(&self.storage)
    }

    /// Returns a mutable slice over a `U8` tensor.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::U8`.
    pub fn as_u8_slice_mut(&mut self) -> &mut [u8] {
        assert_eq!(
            self.dtype,
            DType::U8,
            "as_u8_slice_mut called on {:?} tensor",
            self.dtype
        );
        match &mut self.storage {
            Storage::Raw(b) => b,
            Storage::F32(_) => unreachable!("U8 tensors use raw storage"),
        }
    }

    /// Converts a floating-point tensor to `F32`.
    ///
    /// `F16` and `BF16` values are widened exactly; `F32` is cloned.
    ///
    /// # Errors
    /// Returns [`TensorError::UnsupportedDType`] for integer tensors.
    pub fn to_f32(&self) -> Result<Tensor, TensorError> {
        let bytes = self.as_bytes();
        let values: Vec<f32> = match self.dtype {
            DType::F32 => return Ok(self.clone()),
            DType::F16 => bytes
                .chunks_exact(2)
                .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
            DType::BF16 => bytes
                .chunks_exact(2)
                .map(|c| half::bf16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
            dtype => {
                return Err(TensorError::UnsupportedDType {
                    op: "to_f32",
                    dtype,
                })
            }
        };
        Tensor::from_f32_vec(self.shape.clone(), values)
    }
}

fn unaddressable(op: &'static str, shape: &Shape) -> TensorError {
    TensorError::InvalidArgument {
        op,
        detail: format!("{shape} exceeds the addressable size"),
    }
}

fn storage_bytes(storage: &Storage) -> &[u8] {
    match storage {
        Storage::F32(v) => bytemuck::cast_slice(v),
        Storage::Raw(b) => b,
    }
}

/// A borrowed, read-only view over a [`Tensor`]'s data.
///
/// Views are zero-copy and tied to the lifetime of the source tensor,
/// enforced by the borrow checker.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    shape: &'a Shape,
    dtype: DType,
    storage: &'a Storage,
}

impl<'a> TensorView<'a> {
    /// Returns the shape of the viewed tensor.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the data type of the viewed tensor.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the raw byte slice.
    pub fn as_bytes(&self) -> &'a [u8] {
        storage_bytes(self.storage)
    }

    /// Interprets the view as a slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice(&self) -> &'a [f32] {
        match self.storage {
            Storage::F32(v) => v,
            Storage::Raw(_) => panic!("as_f32_slice called on {:?} view", self.dtype),
        }
    }
}
