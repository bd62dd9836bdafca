// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution context: how graphs run and on which device.
//!
//! A [`Context`] is an ordinary value handed to the executor and the
//! exporter; there is no process-wide state.

use crate::RuntimeError;
use model_ir::ExportFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable consulted when no device id is configured.
pub const DEVICE_ID_ENV: &str = "DEVICE_ID";

/// How a compiled graph is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Whole-graph execution with liveness-based release of intermediates.
    #[default]
    Graph,
    /// Op-by-op dispatch; every intermediate is kept for inspection.
    PyNative,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionMode::Graph => "graph",
            ExecutionMode::PyNative => "pynative",
        })
    }
}

impl FromStr for ExecutionMode {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "graph" | "graph_mode" => Ok(ExecutionMode::Graph),
            "pynative" | "pynative_mode" => Ok(ExecutionMode::PyNative),
            other => Err(RuntimeError::ConfigError(format!(
                "unknown execution mode '{other}'; expected 'graph' or 'pynative'"
            ))),
        }
    }
}

/// Hardware a context targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceTarget {
    #[default]
    #[serde(rename = "CPU")]
    Cpu,
    #[serde(rename = "GPU")]
    Gpu,
    Ascend,
}

impl DeviceTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceTarget::Cpu => "CPU",
            DeviceTarget::Gpu => "GPU",
            DeviceTarget::Ascend => "Ascend",
        }
    }

    /// Whether this build ships kernels for the target.
    pub fn has_backend(self) -> bool {
        matches!(self, DeviceTarget::Cpu)
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceTarget {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [DeviceTarget::Cpu, DeviceTarget::Gpu, DeviceTarget::Ascend]
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                RuntimeError::ConfigError(format!("unknown device target '{s}'; expected CPU, GPU or Ascend"))
            })
    }
}

/// Execution mode, device target and profiling switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    mode: ExecutionMode,
    device_target: DeviceTarget,
    device_id: Option<u32>,
    profiling: bool,
}

impl Context {
    /// Creates a context.
    ///
    /// # Errors
    /// [`RuntimeError::UnsupportedDevice`] if the target has no backend.
    pub fn new(mode: ExecutionMode, device_target: DeviceTarget) -> Result<Self, RuntimeError> {
        if !device_target.has_backend() {
            return Err(RuntimeError::UnsupportedDevice(device_target));
        }
        tracing::debug!(%mode, %device_target, "context created");
        Ok(Self {
            mode,
            device_target,
            device_id: None,
            profiling: false,
        })
    }

    /// Sets the device id. Only Ascend targets use it; other targets keep `None`.
    pub fn with_device_id(mut self, device_id: u32) -> Self {
        if self.device_target == DeviceTarget::Ascend {
            self.device_id = Some(device_id);
        } else {
            tracing::debug!(device_id, target = %self.device_target, "device id ignored for non-Ascend target");
        }
        self
    }

    /// Enables per-node timing in the executor.
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiling = enabled;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn device_target(&self) -> DeviceTarget {
        self.device_target
    }

    pub fn device_id(&self) -> Option<u32> {
        self.device_id
    }

    pub fn profiling(&self) -> bool {
        self.profiling
    }

    /// Whether `format` can be produced from this context. AIR needs Ascend.
    pub fn supports_format(&self, format: ExportFormat) -> bool {
        match format {
            ExportFormat::MindIr | ExportFormat::Onnx => true,
            ExportFormat::Air => self.device_target == DeviceTarget::Ascend,
        }
    }
}

/// Resolves the device id: the configured value, else [`DEVICE_ID_ENV`], else 0.
pub fn resolve_device_id(configured: Option<u32>) -> u32 {
    resolve_device_id_from(configured, std::env::var(DEVICE_ID_ENV).ok().as_deref())
}

fn resolve_device_id_from(configured: Option<u32>, env: Option<&str>) -> u32 {
    configured
        .or_else(|| env.and_then(|v| v.trim().parse().ok()))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_context() {
        let ctx = Context::new(ExecutionMode::Graph, DeviceTarget::Cpu).unwrap();
        assert_eq!(ctx.mode(), ExecutionMode::Graph);
        assert!(!ctx.profiling());
        assert!(ctx.supports_format(ExportFormat::MindIr));
        assert!(ctx.supports_format(ExportFormat::Onnx));
        assert!(!ctx.supports_format(ExportFormat::Air));
    }

    #[test]
    fn test_unsupported_targets() {
        for target in [DeviceTarget::Gpu, DeviceTarget::Ascend] {
            let err = Context::new(ExecutionMode::Graph, target).unwrap_err();
            assert!(matches!(err, RuntimeError::UnsupportedDevice(t) if t == target));
        }
    }

    #[test]
    fn test_device_id_ignored_on_cpu() {
        let ctx = Context::new(ExecutionMode::PyNative, DeviceTarget::Cpu)
            .unwrap()
            .with_device_id(3);
        assert_eq!(ctx.device_id(), None);
    }

    #[test]
    fn test_device_id_resolution() {
        assert_eq!(resolve_device_id_from(Some(2), Some("5")), 2);
        assert_eq!(resolve_device_id_from(None, Some(" 5 ")), 5);
        assert_eq!(resolve_device_id_from(None, Some("x")), 0);
        assert_eq!(resolve_device_id_from(None, None), 0);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("cpu".parse::<DeviceTarget>().unwrap(), DeviceTarget::Cpu);
        assert_eq!("ASCEND".parse::<DeviceTarget>().unwrap(), DeviceTarget::Ascend);
        assert!("tpu".parse::<DeviceTarget>().is_err());
        assert_eq!("GRAPH_MODE".parse::<ExecutionMode>().unwrap(), ExecutionMode::Graph);
        assert_eq!("PyNative".parse::<ExecutionMode>().unwrap(), ExecutionMode::PyNative);
    }
}
