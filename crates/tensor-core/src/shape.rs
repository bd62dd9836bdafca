// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor extents.

use std::fmt;

/// Extents of a [`crate::Tensor`], outermost first.
///
/// Image batches are NCHW everywhere in the workspace. A rank-0 shape holds
/// a single element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![8, 1536]);
    /// assert_eq!(s.rank(), 2);
    /// assert_eq!(s.num_elements(), 12288);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    pub fn nchw(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self {
            dims: vec![n, c, h, w],
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Element count.
    ///
    /// Only call this on shapes that passed [`Shape::checked_num_elements`]
    /// (every value of a compiled graph, every allocated tensor); anything
    /// read from a file goes through the checked form first.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Element count, or `None` when it does not fit in `usize`.
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Byte footprint for `dtype`, or `None` on overflow.
    pub fn checked_size_bytes(&self, dtype: super::DType) -> Option<usize> {
        self.checked_num_elements()?.checked_mul(dtype.size_bytes())
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    pub fn as_nchw(&self) -> Option<(usize, usize, usize, usize)> {
        match self.dims.as_slice() {
            &[n, c, h, w] => Some((n, c, h, w)),
            _ => None,
        }
    }

    /// Copy with the extent of `axis` replaced.
    ///
    /// # Panics
    /// Panics if `axis >= self.rank()`.
    pub fn with_dim(&self, axis: usize, value: usize) -> Shape {
        let mut dims = self.dims.clone();
        dims[axis] = value;
        Shape { dims }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}
