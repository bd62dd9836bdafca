// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element type mapping between [`DType`] and the SafeTensors header.

use safetensors::Dtype;
use tensor_core::DType;

/// SafeTensors dtype for a tensor dtype.
pub fn to_safetensors_dtype(dtype: DType) -> Dtype {
    match dtype {
        DType::F32 => Dtype::F32,
        DType::F16 => Dtype::F16,
        DType::BF16 => Dtype::BF16,
        DType::I8 => Dtype::I8,
        DType::U8 => Dtype::U8,
    }
}

/// Tensor dtype for a SafeTensors dtype, if representable.
pub fn from_safetensors_dtype(dtype: Dtype) -> Option<DType> {
    match dtype {
        Dtype::F32 => Some(DType::F32),
        Dtype::F16 => Some(DType::F16),
        Dtype::BF16 => Some(DType::BF16),
        Dtype::I8 => Some(DType::I8),
        Dtype::U8 => Some(DType::U8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_symmetric() {
        for dtype in [DType::F32, DType::F16, DType::BF16, DType::I8, DType::U8] {
            assert_eq!(from_safetensors_dtype(to_safetensors_dtype(dtype)), Some(dtype));
        }
        assert_eq!(from_safetensors_dtype(Dtype::F64), None);
    }
}
