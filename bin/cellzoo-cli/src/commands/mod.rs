// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared helpers.

pub mod export;
pub mod init;
pub mod inspect;
pub mod run;

use crate::ConfigOverrides;
use anyhow::Context as _;
use runtime::ExportConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over the `-v` count.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Reads the config file when given, else the defaults, then applies the
/// CLI overrides.
pub fn load_config(path: Option<&Path>, overrides: ConfigOverrides) -> anyhow::Result<ExportConfig> {
    let mut config = match path {
        Some(path) => ExportConfig::from_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => match overrides.network {
            Some(network) => ExportConfig::for_network(network),
            None => ExportConfig::default(),
        },
    };

    if let Some(network) = overrides.network {
        config.network = network;
    }
    if let Some(ckpt_file) = overrides.ckpt_file {
        config.ckpt_file = ckpt_file;
    }
    if let Some(num_classes) = overrides.num_classes {
        config.num_classes = num_classes;
    }
    if let Some(in_channels) = overrides.in_channels {
        config.in_channels = in_channels;
    }
    if let Some(width) = overrides.width {
        config.width = width;
    }
    if let Some(height) = overrides.height {
        config.height = height;
    }
    if let Some(device_target) = overrides.device_target {
        config.device_target = device_target;
    }
    Ok(config)
}

/// Prints the boxed banner every command starts with.
pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║{:^54}║", format!("cellzoo · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}

/// Truncates a string to `max_len` with ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

pub fn megabytes(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
