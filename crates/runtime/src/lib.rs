// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Everything between a network definition and a file on disk:
//!
//! - [`Context`]: execution mode and device target, passed explicitly.
//! - Checkpoint I/O: SafeTensors parameter dictionaries, loaded read-only
//!   through a memory map, and copied into a network's parameters.
//! - [`Executor`]: runs a `Graph<Compiled>` on the CPU kernels of
//!   `tensor-core`, in graph mode (intermediates released after last use)
//!   or PyNative mode (every intermediate kept).
//! - Export: trace, compile, encode, write atomically.
//!
//! # Example
//! ```no_run
//! use runtime::{run_export, ExportConfig};
//!
//! # fn main() -> Result<(), runtime::RuntimeError> {
//! let config = ExportConfig::from_file("export.toml".as_ref())?;
//! let artifact = run_export(&config)?;
//! println!("wrote {}", artifact.display());
//! # Ok(())
//! # }
//! ```

mod checkpoint;
mod config;
mod context;
mod error;
mod executor;
mod export;
mod fsutil;
mod metrics;

pub use checkpoint::{load_checkpoint, load_param_into_net, save_checkpoint, ParamDict};
pub use config::ExportConfig;
pub use context::{resolve_device_id, Context, DeviceTarget, ExecutionMode, DEVICE_ID_ENV};
pub use error::RuntimeError;
pub use executor::{Executor, RunOutput};
pub use export::{artifact_path, export, run_export};
pub use metrics::{ExecutionMetrics, NodeMetrics};
