// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # network
//!
//! Networks as trees of [`Cell`]s. A cell owns named [`Parameter`]s and
//! records its forward pass into a [`model_ir::GraphBuilder`]; tracing a
//! whole network yields the graph the runtime executes and exports.
//!
//! - [`layers`]: convolution, batch norm, dense, pooling, activations.
//! - [`InceptionV4`], [`LeNet5`]: the image classifiers.
//! - [`NetworkKind`]: selection by name for configuration files.

mod cell;
mod error;
pub mod inceptionv4;
mod init;
mod kind;
pub mod layers;
pub mod lenet;
mod parameter;

pub use cell::{init_parameters, trace_network, Branches, Cell, Sequential};
pub use error::NetworkError;
pub use inceptionv4::InceptionV4;
pub use init::Initializer;
pub use kind::NetworkKind;
pub use lenet::LeNet5;
pub use parameter::Parameter;
