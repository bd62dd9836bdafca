// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Export configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! network = "inceptionv4"
//! batch_size = 1
//! width = 299
//! height = 299
//! num_classes = 1000
//! ckpt_file = "./inceptionv4.safetensors"
//! file_name = "inceptionv4"
//! file_format = "MINDIR"
//! device_target = "CPU"
//! ```

use crate::{DeviceTarget, ExecutionMode, RuntimeError};
use model_ir::ExportFormat;
use network::NetworkKind;
use std::path::{Path, PathBuf};

/// Configuration of one export run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Network architecture to build.
    pub network: NetworkKind,
    /// Batch dimension of the tracing input. Export always traces with 1.
    pub batch_size: usize,
    pub width: usize,
    pub height: usize,
    /// Channels of the tracing input.
    pub in_channels: usize,
    /// Size of the classifier output.
    pub num_classes: usize,
    /// SafeTensors checkpoint to load (never modified).
    pub ckpt_file: PathBuf,
    /// Artifact path; the format extension is appended when missing.
    pub file_name: PathBuf,
    pub file_format: ExportFormat,
    pub device_target: DeviceTarget,
    /// Device id for Ascend targets; falls back to `$DEVICE_ID`, then 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<u32>,
    pub mode: ExecutionMode,
    /// Fail when the checkpoint lacks any network parameter.
    pub strict_load: bool,
    /// Checkpoint keys starting with any of these prefixes are dropped
    /// before loading (optimizer state, step counters).
    pub filter_prefix: Vec<String>,
}

impl ExportConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str).map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self).map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Default configuration for a network, using its native input size.
    pub fn for_network(network: NetworkKind) -> Self {
        let (height, width) = network.default_input_size();
        Self {
            network,
            height,
            width,
            file_name: PathBuf::from(network.as_str()),
            ..Default::default()
        }
    }

    /// Returns the configuration export actually runs with: batch size 1.
    pub fn normalized(mut self) -> Self {
        if self.batch_size != 1 {
            tracing::debug!(batch_size = self.batch_size, "export traces with batch size 1");
        }
        self.batch_size = 1;
        self
    }

    /// Checks that the spatial dimensions, channel and class counts are
    /// non-zero and that the input and output paths are set.
    ///
    /// `batch_size` is not checked: [`ExportConfig::normalized`] pins it.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        let dims = [
            ("width", self.width),
            ("height", self.height),
            ("in_channels", self.in_channels),
            ("num_classes", self.num_classes),
        ];
        if let Some((field, _)) = dims.iter().find(|(_, v)| *v == 0) {
            return Err(RuntimeError::ConfigError(format!("{field} must be greater than zero")));
        }
        if self.ckpt_file.as_os_str().is_empty() {
            return Err(RuntimeError::ConfigError("ckpt_file must be set".into()));
        }
        if self.file_name.as_os_str().is_empty() {
            return Err(RuntimeError::ConfigError("file_name must be set".into()));
        }
        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            network: NetworkKind::InceptionV4,
            batch_size: 1,
            width: 299,
            height: 299,
            in_channels: 3,
            num_classes: 1000,
            ckpt_file: PathBuf::new(),
            file_name: PathBuf::from("inceptionv4"),
            file_format: ExportFormat::MindIr,
            device_target: DeviceTarget::Cpu,
            device_id: None,
            mode: ExecutionMode::Graph,
            strict_load: true,
            filter_prefix: Vec::new(),
        }
    }
}
