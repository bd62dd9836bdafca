// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Deployment artifact formats.

use crate::graph::{Compiled, Graph};
use crate::{mindir, onnx, ModelError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serialization target for an exported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    /// Self-describing graph + parameters container (the default).
    #[default]
    MindIr,
    /// ONNX `ModelProto`, IR version 7, opset 13.
    Onnx,
    /// Ascend intermediate representation; needs the Ascend toolchain.
    Air,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::MindIr, ExportFormat::Onnx, ExportFormat::Air];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::MindIr => "MINDIR",
            ExportFormat::Onnx => "ONNX",
            ExportFormat::Air => "AIR",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::MindIr => "mindir",
            ExportFormat::Onnx => "onnx",
            ExportFormat::Air => "air",
        }
    }

    /// Serializes a compiled graph into this format.
    ///
    /// # Errors
    /// [`ModelError::Encode`] if the format cannot be produced in-process
    /// (AIR) or serialization fails.
    pub fn encode(self, graph: &Graph<Compiled>) -> Result<Vec<u8>, ModelError> {
        match self {
            ExportFormat::MindIr => mindir::encode(graph),
            ExportFormat::Onnx => onnx::encode(graph),
            ExportFormat::Air => Err(ModelError::Encode {
                format: "AIR",
                detail: "AIR artifacts are produced by the Ascend graph compiler".into(),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("mindir".parse::<ExportFormat>().unwrap(), ExportFormat::MindIr);
        assert_eq!("Onnx".parse::<ExportFormat>().unwrap(), ExportFormat::Onnx);
        assert_eq!("AIR".parse::<ExportFormat>().unwrap(), ExportFormat::Air);
        assert!(matches!("tflite".parse::<ExportFormat>(), Err(ModelError::UnknownFormat(_))));
    }

    #[test]
    fn test_serde_upper_case() {
        assert_eq!(serde_json::to_string(&ExportFormat::Onnx).unwrap(), "\"ONNX\"");
        let parsed: ExportFormat = serde_json::from_str("\"MINDIR\"").unwrap();
        assert_eq!(parsed, ExportFormat::MindIr);
    }

    #[test]
    fn test_extensions() {
        let exts: Vec<_> = ExportFormat::ALL.iter().map(|f| f.extension()).collect();
        assert_eq!(exts, ["mindir", "onnx", "air"]);
    }
}
