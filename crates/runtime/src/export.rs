// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network → deployment artifact.
//!
//! ```text
//! ExportConfig
//!     │  normalize, validate
//!     ▼
//! Context ── build network ── load checkpoint (strict) ── ones input
//!     │
//!     ▼
//! trace → compile → encode (in memory) → atomic write
//! ```
//!
//! Every step before the final write can fail; when one does, no artifact
//! is created and an existing file at the target path is left as it was.

use crate::checkpoint::{load_checkpoint, load_param_into_net};
use crate::{fsutil, resolve_device_id, Context, DeviceTarget, ExportConfig, RuntimeError};
use model_ir::ExportFormat;
use network::{trace_network, Cell};
use std::path::{Path, PathBuf};
use tensor_core::{DType, Shape, Tensor};

/// Returns `file_name` with the format's extension appended unless it
/// already ends in it.
pub fn artifact_path(file_name: &Path, format: ExportFormat) -> PathBuf {
    let ext = format.extension();
    match file_name.extension() {
        Some(current) if current.eq_ignore_ascii_case(ext) => file_name.to_path_buf(),
        _ => {
            let mut name = file_name.as_os_str().to_os_string();
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        }
    }
}

/// Traces `cell` with the shape of `input` and writes the artifact.
///
/// Returns the path actually written.
///
/// # Errors
/// - [`RuntimeError::UnsupportedFormat`] if `ctx` cannot produce `format`.
/// - [`RuntimeError::InvalidInput`] if `input` is not `F32`.
/// - Tracing, compilation (e.g. uninitialized parameters) and encoding
///   errors from the network and IR crates.
pub fn export(
    ctx: &Context,
    cell: &dyn Cell,
    input: &Tensor,
    file_name: &Path,
    format: ExportFormat,
) -> Result<PathBuf, RuntimeError> {
    if !ctx.supports_format(format) {
        return Err(RuntimeError::UnsupportedFormat {
            format,
            device: ctx.device_target(),
        });
    }
    if input.dtype() != DType::F32 {
        return Err(RuntimeError::InvalidInput(format!(
            "export input must be F32, got {}",
            input.dtype()
        )));
    }

    let graph = trace_network(cell, input.shape().clone())?.compile()?;
    tracing::info!("{}", graph.summary());

    let bytes = format.encode(&graph)?;
    let path = artifact_path(file_name, format);
    fsutil::write_atomic(&path, &bytes)?;
    tracing::info!("export: wrote {} ({} bytes, {format})", path.display(), bytes.len());
    Ok(path)
}

/// Runs the complete export described by `config`.
///
/// The tracing input is a ones tensor of shape
/// `[1, in_channels, height, width]`.
pub fn run_export(config: &ExportConfig) -> Result<PathBuf, RuntimeError> {
    config.validate()?;
    let config = config.clone().normalized();

    let mut ctx = Context::new(config.mode, config.device_target)?;
    if config.device_target == DeviceTarget::Ascend {
        ctx = ctx.with_device_id(resolve_device_id(config.device_id));
    }
    tracing::info!(
        "export: {} ({} classes) from {} as {}",
        config.network,
        config.num_classes,
        config.ckpt_file.display(),
        config.file_format
    );
    if !ctx.supports_format(config.file_format) {
        return Err(RuntimeError::UnsupportedFormat {
            format: config.file_format,
            device: ctx.device_target(),
        });
    }

    let mut net = config.network.build(config.num_classes, config.in_channels)?;
    let dict = load_checkpoint(&config.ckpt_file, &config.filter_prefix)?;
    let missing = load_param_into_net(net.as_mut(), &dict, config.strict_load)?;
    if !missing.is_empty() {
        tracing::warn!("export: {} parameter(s) left uninitialized", missing.len());
    }

    let input = Tensor::ones(Shape::nchw(config.batch_size, config.in_channels, config.height, config.width));
    export(&ctx, net.as_ref(), &input, &config.file_name, config.file_format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExecutionMode;

    #[test]
    fn test_artifact_path() {
        let p = artifact_path(Path::new("out/inceptionv4"), ExportFormat::MindIr);
        assert_eq!(p, PathBuf::from("out/inceptionv4.mindir"));
        let p = artifact_path(Path::new("net.ONNX"), ExportFormat::Onnx);
        assert_eq!(p, PathBuf::from("net.ONNX"));
        let p = artifact_path(Path::new("net.v2"), ExportFormat::Onnx);
        assert_eq!(p, PathBuf::from("net.v2.onnx"));
    }

    #[test]
    fn test_air_rejected_on_cpu() {
        let ctx = Context::new(ExecutionMode::Graph, DeviceTarget::Cpu).unwrap();
        let net = network::LeNet5::new(1, 10).unwrap();
        let input = Tensor::ones(Shape::nchw(1, 1, 32, 32));
        let dir = tempfile::tempdir().unwrap();
        let err = export(&ctx, &net, &input, &dir.path().join("lenet"), ExportFormat::Air).unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedFormat { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_uninitialized_network_not_exported() {
        let ctx = Context::new(ExecutionMode::Graph, DeviceTarget::Cpu).unwrap();
        let net = network::LeNet5::new(1, 10).unwrap();
        let input = Tensor::ones(Shape::nchw(1, 1, 32, 32));
        let dir = tempfile::tempdir().unwrap();
        let err = export(&ctx, &net, &input, &dir.path().join("lenet"), ExportFormat::MindIr).unwrap_err();
        assert!(matches!(err, RuntimeError::ModelError(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_run_export_rejects_invalid_config() {
        let config = ExportConfig::default();
        assert!(matches!(run_export(&config), Err(RuntimeError::ConfigError(_))));
    }
}
