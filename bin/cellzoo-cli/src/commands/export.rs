// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cellzoo export`: checkpoint → network → artifact.

use super::{banner, load_config};
use crate::ConfigOverrides;
use anyhow::Context as _;
use model_ir::ExportFormat;
use std::path::PathBuf;
use std::time::Instant;

pub fn execute(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    file_name: Option<PathBuf>,
    file_format: Option<ExportFormat>,
) -> anyhow::Result<()> {
    banner("Export");

    let mut config = load_config(config_path.as_deref(), overrides)?;
    if let Some(file_name) = file_name {
        config.file_name = file_name;
    }
    if let Some(file_format) = file_format {
        config.file_format = file_format;
    }
    let config = config.normalized();

    println!("  Config:");
    println!("   Network:    {} ({} classes)", config.network, config.num_classes);
    println!(
        "   Input:      [1, {}, {}, {}]",
        config.in_channels, config.height, config.width
    );
    println!("   Checkpoint: {}", config.ckpt_file.display());
    println!("   Target:     {} / {} mode", config.device_target, config.mode);
    println!("   Output:     {} ({})", config.file_name.display(), config.file_format);
    println!();

    let start = Instant::now();
    let artifact = runtime::run_export(&config)
        .with_context(|| format!("export of {} failed", config.network))?;
    let size = std::fs::metadata(&artifact)
        .with_context(|| format!("cannot stat '{}'", artifact.display()))?
        .len();

    println!("  Wrote {} ({} bytes) in {:.2?}", artifact.display(), size, start.elapsed());
    println!();
    Ok(())
}
