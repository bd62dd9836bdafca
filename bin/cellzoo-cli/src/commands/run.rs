// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cellzoo run`: execute a network on a ones input.
//!
//! ```text
//! artifact ── decode_mindir ──┐
//!                             ├─► Graph<Compiled> ─► Executor ─► softmax ─► top-k
//! network + checkpoint ─ trace┘
//! ```

use super::{banner, load_config, truncate};
use crate::ConfigOverrides;
use anyhow::Context as _;
use model_ir::{Compiled, Graph};
use runtime::{Context, ExecutionMode, Executor, RunOutput};
use std::path::{Path, PathBuf};
use tensor_core::{DType, Shape, Tensor};

pub fn execute(
    config_path: Option<PathBuf>,
    artifact: Option<PathBuf>,
    overrides: ConfigOverrides,
    mode: ExecutionMode,
    top_k: usize,
) -> anyhow::Result<()> {
    banner("Runner");

    let config = load_config(config_path.as_deref(), overrides)?;
    let ctx = Context::new(mode, config.device_target)?.with_profiling(true);

    // Step 1: obtain a compiled graph.
    println!("  [1/2] Loading graph...");
    let graph = match &artifact {
        Some(path) => load_artifact(path)?,
        None => trace_from_checkpoint(&config)?,
    };
    println!("        {}", graph.summary());
    println!();

    // Step 2: execute.
    println!("  [2/2] Executing in {mode} mode...");
    let inputs = graph
        .inputs()
        .iter()
        .map(|&id| {
            let value = graph.value(id);
            match value.dtype {
                DType::F32 => Ok(Tensor::ones(value.shape.clone())),
                dtype => Err(anyhow::anyhow!("input '{}' has unsupported dtype {dtype}", value.name)),
            }
        })
        .collect::<anyhow::Result<Vec<Tensor>>>()?;
    let output = Executor::new(ctx).run(&graph, &inputs)?;
    println!();

    print_results(&output, top_k)
}

fn load_artifact(path: &Path) -> anyhow::Result<Graph<Compiled>> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read '{}'", path.display()))?;
    model_ir::decode_mindir(&bytes).with_context(|| format!("failed to decode '{}'", path.display()))
}

fn trace_from_checkpoint(config: &runtime::ExportConfig) -> anyhow::Result<Graph<Compiled>> {
    let mut net = config.network.build(config.num_classes, config.in_channels)?;
    let dict = runtime::load_checkpoint(&config.ckpt_file, &config.filter_prefix)
        .with_context(|| format!("failed to load checkpoint '{}'", config.ckpt_file.display()))?;
    runtime::load_param_into_net(net.as_mut(), &dict, true)?;
    let shape = Shape::nchw(1, config.in_channels, config.height, config.width);
    Ok(network::trace_network(net.as_ref(), shape)?.compile()?)
}

fn print_results(output: &RunOutput, top_k: usize) -> anyhow::Result<()> {
    let logits = output.outputs.first().context("graph produced no outputs")?;
    let mut probs = Tensor::zeros(logits.shape().clone(), DType::F32);
    tensor_core::softmax(&logits.view(), &mut probs)?;

    let mut ranked: Vec<(usize, f32)> = probs.as_f32_slice().iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!("  Results:");
    println!("   Output shape: {}", logits.shape());
    for (class, p) in ranked.iter().take(top_k) {
        println!("   class {class:>5}  {p:.6}");
    }
    println!();

    println!("  Slowest nodes:");
    for node in output.metrics.slowest(5) {
        println!(
            "   {:<44} {:<14} {:>9.3} ms",
            truncate(&node.node_name, 44),
            node.op,
            node.duration.as_secs_f64() * 1000.0,
        );
    }
    println!();
    println!("  Metrics:");
    println!("   {}", output.metrics.summary());
    println!();
    Ok(())
}
