// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: checkpoint → network → artifact.
//!
//! LeNet-5 keeps the artifacts small; Inception-v4 goes through the same
//! pipeline with the same code paths.

use model_ir::onnx::proto::ModelProto;
use model_ir::{decode_mindir, ExportFormat};
use network::{init_parameters, trace_network, InceptionV4, LeNet5, NetworkKind};
use prost::Message;
use runtime::{
    load_checkpoint, load_param_into_net, run_export, save_checkpoint, Context, DeviceTarget, ExecutionMode,
    Executor, ExportConfig, RuntimeError,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tensor_core::{Shape, Tensor};

// ── Helpers ────────────────────────────────────────────────────

const CLASSES: usize = 10;

/// Writes a seeded LeNet-5 checkpoint and returns its path.
fn write_checkpoint(dir: &Path) -> PathBuf {
    let mut net = LeNet5::new(1, CLASSES).unwrap();
    init_parameters(&mut net, 7);
    let path = dir.join("lenet.safetensors");
    save_checkpoint(&net, &path).unwrap();
    path
}

fn lenet_config(dir: &TempDir) -> ExportConfig {
    ExportConfig {
        in_channels: 1,
        num_classes: CLASSES,
        ckpt_file: write_checkpoint(dir.path()),
        file_name: dir.path().join("lenet"),
        ..ExportConfig::for_network(NetworkKind::LeNet5)
    }
}

fn file_count(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

// ── Export properties ──────────────────────────────────────────

#[test]
fn test_export_writes_non_empty_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = run_export(&lenet_config(&dir)).unwrap();
    assert_eq!(path, dir.path().join("lenet.mindir"));
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn test_export_leaves_checkpoint_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = lenet_config(&dir);
    let before = std::fs::read(&config.ckpt_file).unwrap();
    run_export(&config).unwrap();
    assert_eq!(std::fs::read(&config.ckpt_file).unwrap(), before);
}

#[test]
fn test_repeated_export_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    for format in [ExportFormat::MindIr, ExportFormat::Onnx] {
        let first = ExportConfig {
            file_name: dir.path().join("first"),
            file_format: format,
            ..lenet_config(&dir)
        };
        let second = ExportConfig {
            file_name: dir.path().join("second"),
            ..first.clone()
        };
        let a = std::fs::read(run_export(&first).unwrap()).unwrap();
        let b = std::fs::read(run_export(&second).unwrap()).unwrap();
        assert_eq!(a, b, "{format} export differs between runs");
    }
}

#[test]
fn test_missing_parameter_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        filter_prefix: vec!["fc3.".into()],
        ..lenet_config(&dir)
    };
    let files = file_count(&dir);
    let err = run_export(&config).unwrap_err();
    match err {
        RuntimeError::MissingParameters { missing } => {
            assert_eq!(missing, ["fc3.weight", "fc3.bias"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(file_count(&dir), files);
}

#[test]
fn test_lenient_load_with_missing_parameter_still_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        filter_prefix: vec!["fc3.".into()],
        strict_load: false,
        ..lenet_config(&dir)
    };
    let files = file_count(&dir);
    assert!(matches!(run_export(&config), Err(RuntimeError::ModelError(_))));
    assert_eq!(file_count(&dir), files);
}

#[test]
fn test_failed_export_keeps_existing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        num_classes: 5,
        ..lenet_config(&dir)
    };
    let target = dir.path().join("lenet.mindir");
    std::fs::write(&target, b"previous").unwrap();
    let err = run_export(&config).unwrap_err();
    assert!(matches!(err, RuntimeError::ParameterShapeMismatch { .. }));
    assert_eq!(std::fs::read(&target).unwrap(), b"previous");
}

#[test]
fn test_missing_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        ckpt_file: dir.path().join("absent.safetensors"),
        ..lenet_config(&dir)
    };
    assert!(matches!(run_export(&config), Err(RuntimeError::CheckpointNotFound { .. })));
}

#[test]
fn test_unsupported_device_and_format() {
    let dir = tempfile::tempdir().unwrap();
    let gpu = ExportConfig {
        device_target: DeviceTarget::Gpu,
        ..lenet_config(&dir)
    };
    assert!(matches!(run_export(&gpu), Err(RuntimeError::UnsupportedDevice(DeviceTarget::Gpu))));

    let air = ExportConfig {
        file_format: ExportFormat::Air,
        ..lenet_config(&dir)
    };
    assert!(matches!(run_export(&air), Err(RuntimeError::UnsupportedFormat { .. })));
    assert!(!dir.path().join("lenet.air").exists());
}

#[test]
fn test_onnx_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        file_format: ExportFormat::Onnx,
        ..lenet_config(&dir)
    };
    let path = run_export(&config).unwrap();
    assert_eq!(path.extension().unwrap(), "onnx");
    let model = ModelProto::decode(std::fs::read(path).unwrap().as_slice()).unwrap();
    let graph = model.graph.unwrap();
    let conv1 = graph.initializer.iter().find(|t| t.name == "conv1.weight").unwrap();
    assert_eq!(conv1.dims, [6, 1, 5, 5]);
    assert_eq!(conv1.raw_data.len(), 6 * 25 * 4);
    assert_eq!(graph.input[0].name, "x");
    assert_eq!(graph.output.len(), 1);
}

#[test]
fn test_zero_batch_size_exports_with_batch_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        batch_size: 0,
        ..lenet_config(&dir)
    };
    let artifact = run_export(&config).unwrap();
    let graph = decode_mindir(&std::fs::read(artifact).unwrap()).unwrap();
    assert_eq!(graph.value(graph.inputs()[0]).shape, Shape::nchw(1, 1, 32, 32));
}

#[test]
fn test_export_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = lenet_config(&dir);
    let config_path = dir.path().join("export.toml");
    std::fs::write(&config_path, config.to_toml().unwrap()).unwrap();
    let loaded = ExportConfig::from_file(&config_path).unwrap();
    assert_eq!(loaded, config);
    assert!(run_export(&loaded).unwrap().exists());
}

// ── Artifact round trip ────────────────────────────────────────

#[test]
fn test_mindir_artifact_runs_like_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let config = lenet_config(&dir);
    let artifact = run_export(&config).unwrap();
    let decoded = decode_mindir(&std::fs::read(artifact).unwrap()).unwrap();

    let mut net = LeNet5::new(1, CLASSES).unwrap();
    let dict = load_checkpoint(&config.ckpt_file, &[]).unwrap();
    load_param_into_net(&mut net, &dict, true).unwrap();
    let direct = trace_network(&net, Shape::nchw(1, 1, 32, 32)).unwrap().compile().unwrap();

    let input = Tensor::ones(Shape::nchw(1, 1, 32, 32));
    let executor = Executor::new(Context::new(ExecutionMode::Graph, DeviceTarget::Cpu).unwrap());
    let from_artifact = executor.run(&decoded, std::slice::from_ref(&input)).unwrap();
    let from_network = executor.run(&direct, &[input]).unwrap();

    assert_eq!(from_artifact.outputs[0].shape(), &Shape::matrix(1, CLASSES));
    assert_eq!(from_artifact.outputs[0].as_f32_slice(), from_network.outputs[0].as_f32_slice());
}

// ── Full-size network ──────────────────────────────────────────

/// Writes about 170 MB per artifact; run with `--ignored`.
#[test]
#[ignore]
fn test_inceptionv4_checkpoint_exports_and_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let mut net = InceptionV4::new(3, 1000).unwrap();
    init_parameters(&mut net, 1);
    let ckpt_file = dir.path().join("inceptionv4.safetensors");
    save_checkpoint(&net, &ckpt_file).unwrap();

    let config = ExportConfig {
        ckpt_file,
        file_name: dir.path().join("inceptionv4"),
        ..ExportConfig::default()
    };
    let artifact = run_export(&config).unwrap();
    assert_eq!(artifact.extension().unwrap(), "mindir");

    let graph = decode_mindir(&std::fs::read(&artifact).unwrap()).unwrap();
    assert_eq!(graph.parameter_count(), 42_742_984);
    assert_eq!(graph.num_nodes(), 494);
    assert_eq!(graph.value(graph.inputs()[0]).shape, Shape::nchw(1, 3, 299, 299));
    assert_eq!(graph.value(graph.outputs()[0]).shape, Shape::matrix(1, 1000));
}
