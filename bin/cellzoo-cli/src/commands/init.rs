// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cellzoo init`: write a seeded, freshly initialized checkpoint.

use super::{banner, load_config, megabytes};
use crate::ConfigOverrides;
use anyhow::Context as _;
use std::path::PathBuf;

pub fn execute(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    seed: u64,
    output: PathBuf,
) -> anyhow::Result<()> {
    banner("Initializer");

    let config = load_config(config_path.as_deref(), overrides)?;
    let mut net = config.network.build(config.num_classes, config.in_channels)?;
    println!(
        "  Network: {} ({} classes, {} parameters)",
        config.network,
        config.num_classes,
        net.parameter_count()
    );
    println!("  Seed:    {seed}");

    network::init_parameters(net.as_mut(), seed);
    let written = runtime::save_checkpoint(net.as_ref(), &output)
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    let size = std::fs::metadata(&output)
        .with_context(|| format!("cannot stat '{}'", output.display()))?
        .len();

    println!(
        "  Wrote {written} tensors to {} ({:.2} MB)",
        output.display(),
        megabytes(size as usize)
    );
    println!();
    Ok(())
}
