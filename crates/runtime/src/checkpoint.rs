// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Checkpoint I/O in SafeTensors format with memory-mapped reads.
//!
//! Checkpoints are opened read-only and mapped with `memmap2`; the file on
//! disk is never written by [`load_checkpoint`]. Half-precision entries are
//! upcast to `f32` on load, since every kernel computes in `f32`.

use crate::{fsutil, RuntimeError};
use model_ir::{from_safetensors_dtype, to_safetensors_dtype};
use network::Cell;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tensor_core::{DType, Shape, Tensor};

/// How many unused checkpoint keys are named individually in the log.
const UNUSED_KEYS_LOGGED: usize = 8;

/// Parameter tensors keyed by name, in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamDict {
    tensors: BTreeMap<String, Tensor>,
}

impl ParamDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(name.into(), tensor)
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Tensor> {
        self.tensors.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total size of all tensors in bytes.
    pub fn size_bytes(&self) -> usize {
        self.tensors.values().map(Tensor::size_bytes).sum()
    }
}

/// Reads a SafeTensors checkpoint into a [`ParamDict`].
///
/// Keys starting with any entry of `filter_prefix` are skipped.
///
/// # Errors
/// - [`RuntimeError::CheckpointNotFound`] if `path` does not exist.
/// - [`RuntimeError::MalformedCheckpoint`] if the file is not valid
///   SafeTensors or holds an unsupported dtype.
pub fn load_checkpoint(path: &Path, filter_prefix: &[String]) -> Result<ParamDict, RuntimeError> {
    if !path.is_file() {
        return Err(RuntimeError::CheckpointNotFound { path: path.to_path_buf() });
    }
    let malformed = |detail: String| RuntimeError::MalformedCheckpoint {
        path: path.to_path_buf(),
        detail,
    };

    let file = std::fs::File::open(path).map_err(|e| RuntimeError::io(path, e))?;
    // SAFETY: the mapping is read-only and dropped before returning; tensors
    // are copied out of it.
    let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| RuntimeError::io(path, e))?;
    tracing::info!(
        "checkpoint: mmap'd {} ({:.2} MB)",
        path.display(),
        mmap.len() as f64 / (1024.0 * 1024.0),
    );

    let st = safetensors::SafeTensors::deserialize(&mmap).map_err(|e| malformed(format!("SafeTensors parse error: {e}")))?;

    let mut dict = ParamDict::new();
    let mut filtered = 0usize;
    for (name, view) in st.tensors() {
        if filter_prefix.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            filtered += 1;
            continue;
        }
        let dtype = from_safetensors_dtype(view.dtype())
            .ok_or_else(|| malformed(format!("tensor '{name}' has unsupported dtype {:?}", view.dtype())))?;
        let tensor = Tensor::from_bytes(Shape::new(view.shape().to_vec()), dtype, view.data().to_vec())
            .map_err(|e| malformed(format!("tensor '{name}': {e}")))?;
        let tensor = if matches!(dtype, DType::F16 | DType::BF16) {
            tensor.to_f32().map_err(|e| malformed(format!("tensor '{name}': {e}")))?
        } else {
            tensor
        };
        dict.insert(name, tensor);
    }

    tracing::info!(
        "checkpoint: {} tensors loaded, {} filtered ({:.2} MB)",
        dict.len(),
        filtered,
        dict.size_bytes() as f64 / (1024.0 * 1024.0),
    );
    Ok(dict)
}

/// Writes every initialized parameter of `cell` to a SafeTensors file.
///
/// The file is written atomically. Returns the number of tensors written.
pub fn save_checkpoint(cell: &dyn Cell, path: &Path) -> Result<usize, RuntimeError> {
    let params = cell.parameters();
    let mut views = Vec::with_capacity(params.len());
    let mut skipped = 0usize;
    for param in &params {
        let Some(data) = param.data() else {
            skipped += 1;
            continue;
        };
        let view = safetensors::tensor::TensorView::new(
            to_safetensors_dtype(data.dtype()),
            data.shape().dims().to_vec(),
            data.as_bytes(),
        )
        .map_err(|e| RuntimeError::InvalidInput(format!("parameter '{}': {e}", param.name())))?;
        views.push((param.name().to_string(), view));
    }
    if skipped > 0 {
        tracing::warn!("checkpoint: {skipped} uninitialized parameter(s) of '{}' not saved", cell.name());
    }

    let count = views.len();
    let bytes = safetensors::serialize(views, None)
        .map_err(|e| RuntimeError::InvalidInput(format!("cannot serialize checkpoint: {e}")))?;
    fsutil::write_atomic(path, &bytes)?;
    tracing::info!("checkpoint: wrote {count} tensors to {}", path.display());
    Ok(count)
}

/// Copies checkpoint tensors into the matching parameters of `cell`.
///
/// Returns the names of network parameters the checkpoint did not provide
/// (always empty when `strict`). Checkpoint keys the network does not use
/// are logged and ignored.
///
/// # Errors
/// - [`RuntimeError::ParameterShapeMismatch`] if a tensor's shape differs
///   from its parameter's.
/// - [`RuntimeError::MissingParameters`] if `strict` and any parameter is
///   missing from `dict`.
///
/// The network is left untouched when an error is returned.
pub fn load_param_into_net(cell: &mut dyn Cell, dict: &ParamDict, strict: bool) -> Result<Vec<String>, RuntimeError> {
    let mut missing = Vec::new();
    let mut used = HashSet::new();
    for param in cell.parameters() {
        match dict.get(param.name()) {
            Some(tensor) => {
                if tensor.shape() != param.shape() {
                    return Err(RuntimeError::ParameterShapeMismatch {
                        name: param.name().to_string(),
                        expected: param.shape().clone(),
                        actual: tensor.shape().clone(),
                    });
                }
                if tensor.dtype() != DType::F32 {
                    return Err(network::NetworkError::DTypeMismatch {
                        name: param.name().to_string(),
                        dtype: tensor.dtype(),
                    }
                    .into());
                }
                used.insert(param.name().to_string());
            }
            None => missing.push(param.name().to_string()),
        }
    }
    if strict && !missing.is_empty() {
        return Err(RuntimeError::MissingParameters { missing });
    }

    let mut loaded = 0usize;
    for param in cell.parameters_mut() {
        if let Some(tensor) = dict.get(param.name()) {
            param.set_data(tensor.clone())?;
            loaded += 1;
        }
    }

    let unused: Vec<&str> = dict.iter().map(|(k, _)| k).filter(|k| !used.contains(*k)).collect();
    if !unused.is_empty() {
        let shown = unused.iter().take(UNUSED_KEYS_LOGGED).copied().collect::<Vec<_>>().join(", ");
        tracing::warn!(
            "{} checkpoint key(s) not used by '{}': {}{}",
            unused.len(),
            cell.name(),
            shown,
            if unused.len() > UNUSED_KEYS_LOGGED { ", ..." } else { "" },
        );
    }
    for name in &missing {
        tracing::warn!("parameter '{name}' not loaded from checkpoint");
    }
    tracing::info!("loaded {loaded} parameters into '{}'", cell.name());
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use network::{init_parameters, LeNet5};
    use tempfile::tempdir;

    fn lenet_dict() -> ParamDict {
        let mut net = LeNet5::new(1, 10).unwrap();
        init_parameters(&mut net, 11);
        let mut dict = ParamDict::new();
        for p in net.parameters() {
            dict.insert(p.name(), p.data().unwrap().clone());
        }
        dict
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lenet.safetensors");
        let mut net = LeNet5::new(1, 10).unwrap();
        init_parameters(&mut net, 5);
        assert_eq!(save_checkpoint(&net, &path).unwrap(), 8);

        let dict = load_checkpoint(&path, &[]).unwrap();
        assert_eq!(dict.len(), 8);
        let original = net.parameters()[0].data().unwrap().clone();
        assert_eq!(dict.get("conv1.weight"), Some(&original));
    }

    #[test]
    fn test_missing_file() {
        let err = load_checkpoint(Path::new("/nonexistent/net.safetensors"), &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::CheckpointNotFound { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.safetensors");
        std::fs::write(&path, b"definitely not safetensors").unwrap();
        let err = load_checkpoint(&path, &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::MalformedCheckpoint { .. }));
    }

    #[test]
    fn test_filter_prefix_and_upcast() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed.safetensors");
        let half: Vec<u8> = [1.5f32, -2.0]
            .iter()
            .flat_map(|v| half::f16::from_f32(*v).to_le_bytes())
            .collect();
        let moment = Tensor::ones(Shape::vector(2));
        let views = vec![
            (
                "fc.bias".to_string(),
                safetensors::tensor::TensorView::new(safetensors::Dtype::F16, vec![2], &half).unwrap(),
            ),
            (
                "moments.fc.bias".to_string(),
                safetensors::tensor::TensorView::new(safetensors::Dtype::F32, vec![2], moment.as_bytes()).unwrap(),
            ),
        ];
        std::fs::write(&path, safetensors::serialize(views, None).unwrap()).unwrap();

        let dict = load_checkpoint(&path, &["moments.".to_string()]).unwrap();
        assert_eq!(dict.len(), 1);
        let bias = dict.get("fc.bias").unwrap();
        assert_eq!(bias.dtype(), DType::F32);
        assert_eq!(bias.as_f32_slice(), &[1.5, -2.0]);
    }

    #[test]
    fn test_strict_load_rejects_missing() {
        let mut dict = lenet_dict();
        dict.remove("fc3.bias");
        let mut net = LeNet5::new(1, 10).unwrap();
        let err = load_param_into_net(&mut net, &dict, true).unwrap_err();
        match err {
            RuntimeError::MissingParameters { missing } => assert_eq!(missing, vec!["fc3.bias"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(net.parameters().iter().all(|p| !p.is_initialized()));
    }

    #[test]
    fn test_lenient_load_reports_missing() {
        let mut dict = lenet_dict();
        dict.remove("fc3.bias");
        dict.insert("global_step", Tensor::ones(Shape::vector(1)));
        let mut net = LeNet5::new(1, 10).unwrap();
        let missing = load_param_into_net(&mut net, &dict, false).unwrap();
        assert_eq!(missing, vec!["fc3.bias"]);
        assert_eq!(net.parameters().iter().filter(|p| p.is_initialized()).count(), 7);
    }

    #[test]
    fn test_shape_mismatch_always_fails() {
        let mut dict = lenet_dict();
        dict.insert("fc3.bias", Tensor::ones(Shape::vector(7)));
        let mut net = LeNet5::new(1, 10).unwrap();
        let err = load_param_into_net(&mut net, &dict, false).unwrap_err();
        assert!(matches!(err, RuntimeError::ParameterShapeMismatch { .. }));
    }
}
