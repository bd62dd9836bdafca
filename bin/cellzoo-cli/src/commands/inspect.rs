// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cellzoo inspect`: parameter table of a checkpoint, or graph summary and
//! node table of a MINDIR artifact.

use super::{banner, megabytes, truncate};
use anyhow::Context as _;
use model_ir::ExportFormat;
use std::path::{Path, PathBuf};

pub fn execute(path: PathBuf) -> anyhow::Result<()> {
    banner("Inspector");

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ext == ExportFormat::MindIr.extension() {
        inspect_artifact(&path)
    } else if ext == ExportFormat::Onnx.extension() || ext == ExportFormat::Air.extension() {
        anyhow::bail!("'{}': reading .{ext} artifacts is not supported", path.display())
    } else {
        inspect_checkpoint(&path)
    }
}

fn inspect_checkpoint(path: &Path) -> anyhow::Result<()> {
    let dict = runtime::load_checkpoint(path, &[])
        .with_context(|| format!("failed to load checkpoint '{}'", path.display()))?;

    // ── Summary ────────────────────────────────────────────────
    let scalars: usize = dict.iter().map(|(_, t)| t.shape().num_elements()).sum();
    println!("  Checkpoint: {}", path.display());
    println!("  Tensors:    {}", dict.len());
    println!("  Parameters: {scalars}");
    println!("  Size:       {:.2} MB", megabytes(dict.size_bytes()));
    println!();

    // ── Per-Tensor Detail ──────────────────────────────────────
    println!("  {:<48} {:<22} {:>10}", "Name", "Shape", "Size");
    println!("  {}", "-".repeat(82));
    for (name, tensor) in dict.iter() {
        println!(
            "  {:<48} {:<22} {:>7.1} KB",
            truncate(name, 48),
            tensor.shape().to_string(),
            tensor.size_bytes() as f64 / 1024.0,
        );
    }
    println!();
    Ok(())
}

fn inspect_artifact(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read '{}'", path.display()))?;
    let graph = model_ir::decode_mindir(&bytes)
        .with_context(|| format!("failed to decode '{}'", path.display()))?;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", graph.summary());
    println!();
    println!("  Operators:");
    for (op, count) in graph.op_histogram() {
        println!("   {op:<16} {count:>5}");
    }
    println!();

    // ── Per-Node Detail ────────────────────────────────────────
    println!("  {:<5} {:<44} {:<14} {:>20}", "Idx", "Node", "Op", "Output");
    println!("  {}", "-".repeat(86));
    for (index, node) in graph.nodes().iter().enumerate() {
        let output = node
            .outputs
            .first()
            .map(|&id| graph.value(id).shape.to_string())
            .unwrap_or_default();
        println!(
            "  {:<5} {:<44} {:<14} {:>20}",
            index,
            truncate(&node.name, 44),
            node.op.name(),
            output,
        );
    }
    println!();
    Ok(())
}
