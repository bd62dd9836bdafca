// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network selection by name.

use crate::{inceptionv4, lenet, Cell, InceptionV4, LeNet5, NetworkError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The networks cellzoo can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    #[default]
    InceptionV4,
    LeNet5,
}

impl NetworkKind {
    pub const ALL: [NetworkKind; 2] = [NetworkKind::InceptionV4, NetworkKind::LeNet5];

    pub fn as_str(self) -> &'static str {
        match self {
            NetworkKind::InceptionV4 => "inceptionv4",
            NetworkKind::LeNet5 => "lenet5",
        }
    }

    /// Constructs the network with uninitialized parameters.
    pub fn build(self, classes: usize, in_channels: usize) -> Result<Box<dyn Cell>, NetworkError> {
        let cell: Box<dyn Cell> = match self {
            NetworkKind::InceptionV4 => Box::new(InceptionV4::new(in_channels, classes)?),
            NetworkKind::LeNet5 => Box::new(LeNet5::new(in_channels, classes)?),
        };
        Ok(cell)
    }

    /// `(height, width)` the network was designed for.
    pub fn default_input_size(self) -> (usize, usize) {
        match self {
            NetworkKind::InceptionV4 => (inceptionv4::INPUT_SIZE, inceptionv4::INPUT_SIZE),
            NetworkKind::LeNet5 => (lenet::INPUT_SIZE, lenet::INPUT_SIZE),
        }
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkKind {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| *c != '_' && *c != '-').collect();
        NetworkKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| NetworkError::UnknownNetwork(s.to_string()))
    }
}
