// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cellzoo
//!
//! Command-line interface for the cellzoo export pipeline.
//!
//! ## Usage
//! ```bash
//! # Export Inception-v4 from a checkpoint
//! cellzoo export --ckpt-file ./inceptionv4.safetensors --file-name ./inceptionv4
//!
//! # Same, driven by a config file
//! cellzoo -c export.toml export --file-format ONNX
//!
//! # Inspect a checkpoint or an artifact
//! cellzoo inspect ./inceptionv4.mindir
//!
//! # Execute an artifact on a ones input
//! cellzoo run --artifact ./inceptionv4.mindir --top-k 5
//!
//! # Write a freshly initialized checkpoint
//! cellzoo init --network lenet5 --num-classes 10 --output ./lenet.safetensors
//! ```

mod commands;

use clap::{Args, Parser, Subcommand};
use model_ir::ExportFormat;
use network::NetworkKind;
use runtime::{DeviceTarget, ExecutionMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cellzoo",
    about = "Export, inspect and run image classification networks",
    version,
    author
)]
struct Cli {
    /// Path to a TOML export configuration; CLI flags override its values.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override fields of the export configuration.
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// Network architecture: inceptionv4, lenet5.
    #[arg(long)]
    pub network: Option<NetworkKind>,

    /// SafeTensors checkpoint to load.
    #[arg(long)]
    pub ckpt_file: Option<PathBuf>,

    /// Number of classifier outputs.
    #[arg(long)]
    pub num_classes: Option<usize>,

    /// Input channels.
    #[arg(long)]
    pub in_channels: Option<usize>,

    #[arg(long)]
    pub width: Option<usize>,

    #[arg(long)]
    pub height: Option<usize>,

    /// Device target: CPU, GPU, Ascend.
    #[arg(long)]
    pub device_target: Option<DeviceTarget>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a network and its checkpoint to a deployment artifact.
    Export {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Artifact path; the format extension is appended when missing.
        #[arg(long)]
        file_name: Option<PathBuf>,

        /// Artifact format: MINDIR, ONNX, AIR.
        #[arg(long)]
        file_format: Option<ExportFormat>,
    },

    /// Print a checkpoint's parameter table or an artifact's graph.
    Inspect {
        /// `.safetensors` checkpoint or `.mindir` artifact.
        path: PathBuf,
    },

    /// Execute a network on a ones input and print the top classes.
    Run {
        /// MINDIR artifact to execute. Without it, the configured network
        /// and checkpoint are used.
        #[arg(short, long)]
        artifact: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Execution mode: graph, pynative.
        #[arg(short, long, default_value = "graph")]
        mode: ExecutionMode,

        /// Number of classes to print.
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
    },

    /// Write a freshly initialized checkpoint for a network.
    Init {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Seed for the parameter initializers.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Output checkpoint path.
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Export {
            overrides,
            file_name,
            file_format,
        } => commands::export::execute(cli.config, overrides, file_name, file_format),
        Commands::Inspect { path } => commands::inspect::execute(path),
        Commands::Run {
            artifact,
            overrides,
            mode,
            top_k,
        } => commands::run::execute(cli.config, artifact, overrides, mode, top_k),
        Commands::Init {
            overrides,
            seed,
            output,
        } => commands::init::execute(cli.config, overrides, seed, output),
    }
}
