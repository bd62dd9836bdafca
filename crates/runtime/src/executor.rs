// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CPU executor for compiled graphs.
//!
//! ```text
//! Graph<Compiled> + inputs
//!     │  bind inputs, read parameters in place
//!     ▼
//! for node in topological order:
//!     allocate outputs → dispatch kernel → store
//!     (graph mode) release intermediates past their last use
//!     ▼
//!   RunOutput
//! ```
//!
//! Both execution modes produce identical outputs; PyNative mode also keeps
//! every intermediate for inspection.

use crate::{Context, ExecutionMetrics, ExecutionMode, RuntimeError};
use model_ir::{Compiled, Graph, OpKind, ValueId, ValueKind};
use std::collections::BTreeMap;
use std::time::Instant;
use tensor_core::{BatchNormParams, Tensor, TensorError, TensorView};

/// The result of a single graph execution.
#[derive(Debug)]
pub struct RunOutput {
    /// Values of the graph outputs, in declaration order.
    pub outputs: Vec<Tensor>,
    /// Every intermediate keyed by value name. Only filled in PyNative mode.
    pub intermediates: Option<BTreeMap<String, Tensor>>,
    pub metrics: ExecutionMetrics,
}

/// Runs compiled graphs on the CPU.
#[derive(Debug, Clone)]
pub struct Executor {
    ctx: Context,
}

impl Executor {
    pub fn new(ctx: Context) -> Self {
        tracing::debug!("executor created in {} mode on {}", ctx.mode(), ctx.device_target());
        Self { ctx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Executes `graph` with one tensor per graph input.
    ///
    /// # Errors
    /// [`RuntimeError::InvalidInput`] when the inputs do not match the graph
    /// signature, [`RuntimeError::Execution`] when a kernel fails.
    pub fn run(&self, graph: &Graph<Compiled>, inputs: &[Tensor]) -> Result<RunOutput, RuntimeError> {
        let run_start = Instant::now();
        check_inputs(graph, inputs)?;

        let mode = self.ctx.mode();
        let profiling = self.ctx.profiling();
        let liveness = match mode {
            ExecutionMode::Graph => graph.liveness(),
            ExecutionMode::PyNative => vec![None; graph.values().len()],
        };
        let mut metrics = ExecutionMetrics::new(mode);

        let mut slots: Vec<Option<Tensor>> = vec![None; graph.values().len()];
        for (&id, tensor) in graph.inputs().iter().zip(inputs) {
            slots[id.0] = Some(tensor.clone());
        }
        let mut live_bytes = 0usize;

        tracing::debug!("running '{}': {} nodes, mode {}", graph.name(), graph.num_nodes(), mode);

        for (index, node) in graph.nodes().iter().enumerate() {
            let node_start = Instant::now();

            let mut outputs: Vec<Tensor> = node
                .outputs
                .iter()
                .map(|&id| {
                    let value = graph.value(id);
                    Tensor::zeros(value.shape.clone(), value.dtype)
                })
                .collect();
            {
                let operands = node
                    .inputs
                    .iter()
                    .map(|&id| fetch(graph, &slots, id))
                    .collect::<Result<Vec<&Tensor>, RuntimeError>>()?;
                let views: Vec<TensorView<'_>> = operands.iter().map(|t| t.view()).collect();
                dispatch(&node.op, &views, &mut outputs).map_err(|source| RuntimeError::Execution {
                    node: node.name.clone(),
                    source,
                })?;
            }

            let output_bytes: usize = outputs.iter().map(Tensor::size_bytes).sum();
            if profiling {
                metrics.record_node(node.name.clone(), node.op.name(), node_start.elapsed(), output_bytes);
            }
            for (&id, tensor) in node.outputs.iter().zip(outputs) {
                slots[id.0] = Some(tensor);
            }
            live_bytes += output_bytes;
            metrics.observe_live_bytes(live_bytes);

            // Release everything whose last reader was this node.
            for &id in &node.inputs {
                if liveness[id.0] == Some(index) {
                    if let Some(freed) = slots[id.0].take() {
                        live_bytes -= freed.size_bytes();
                        metrics.released_values += 1;
                    }
                }
            }
        }

        let outputs = graph
            .outputs()
            .iter()
            .map(|&id| fetch(graph, &slots, id).cloned())
            .collect::<Result<Vec<Tensor>, RuntimeError>>()?;

        let intermediates = match mode {
            ExecutionMode::Graph => None,
            ExecutionMode::PyNative => Some(
                graph
                    .values()
                    .iter()
                    .zip(slots)
                    .filter(|(value, _)| value.kind == ValueKind::Intermediate)
                    .filter_map(|(value, slot)| slot.map(|t| (value.name.clone(), t)))
                    .collect(),
            ),
        };

        metrics.finalise(run_start.elapsed(), graph.num_nodes());
        tracing::info!("{}", metrics.summary());

        Ok(RunOutput {
            outputs,
            intermediates,
            metrics,
        })
    }
}

fn check_inputs(graph: &Graph<Compiled>, inputs: &[Tensor]) -> Result<(), RuntimeError> {
    if inputs.len() != graph.inputs().len() {
        return Err(RuntimeError::InvalidInput(format!(
            "graph '{}' takes {} input(s), got {}",
            graph.name(),
            graph.inputs().len(),
            inputs.len()
        )));
    }
    for (&id, tensor) in graph.inputs().iter().zip(inputs) {
        let value = graph.value(id);
        if tensor.shape() != &value.shape || tensor.dtype() != value.dtype {
            return Err(RuntimeError::InvalidInput(format!(
                "input '{}' expects {} {}, got {} {}",
                value.name,
                value.shape,
                value.dtype,
                tensor.shape(),
                tensor.dtype()
            )));
        }
    }
    Ok(())
}

/// Parameters are read straight from the graph; everything else from the slots.
fn fetch<'a>(graph: &'a Graph<Compiled>, slots: &'a [Option<Tensor>], id: ValueId) -> Result<&'a Tensor, RuntimeError> {
    let value = graph.value(id);
    let tensor = match value.kind {
        ValueKind::Parameter => value.data.as_ref(),
        ValueKind::Input | ValueKind::Intermediate => slots[id.0].as_ref(),
    };
    tensor.ok_or_else(|| RuntimeError::InvalidInput(format!("value '{}' ({id}) is not available", value.name)))
}

fn dispatch(op: &OpKind, inputs: &[TensorView<'_>], outputs: &mut [Tensor]) -> Result<(), TensorError> {
    let [output, rest @ ..] = outputs else {
        return Err(TensorError::InvalidArgument {
            op: op.name(),
            detail: "node has no outputs".into(),
        });
    };
    match op {
        OpKind::Conv2d { window, has_bias } => {
            let bias = has_bias.then(|| &inputs[2]);
            tensor_core::conv2d(&inputs[0], &inputs[1], bias, window, output)
        }
        OpKind::BatchNorm { eps } => {
            let params = BatchNormParams {
                gamma: inputs[1],
                beta: inputs[2],
                moving_mean: inputs[3],
                moving_variance: inputs[4],
            };
            tensor_core::batch_norm(&inputs[0], &params, *eps, output)
        }
        OpKind::Relu => tensor_core::relu(&inputs[0], output),
        OpKind::ReluV2 => {
            let got = rest.len() + 1;
            let [mask] = rest else {
                return Err(TensorError::InvalidArgument {
                    op: "ReluV2",
                    detail: format!("expected 2 outputs, got {got}"),
                });
            };
            tensor_core::relu_v2(&inputs[0], output, mask)
        }
        OpKind::MaxPool { window } => tensor_core::max_pool2d(&inputs[0], window, output),
        OpKind::AvgPool { window } => tensor_core::avg_pool2d(&inputs[0], window, output),
        OpKind::GlobalAvgPool => tensor_core::global_avg_pool(&inputs[0], output),
        OpKind::Concat { axis } => tensor_core::concat(inputs, *axis, output),
        OpKind::Dense { has_bias } => {
            let bias = has_bias.then(|| &inputs[2]);
            tensor_core::dense(&inputs[0], &inputs[1], bias, output)
        }
        OpKind::Softmax => tensor_core::softmax(&inputs[0], output),
        // Inference-time identities: same elements, possibly a new shape.
        OpKind::Flatten | OpKind::Dropout { .. } => copy_elements(op.name(), &inputs[0], output),
    }
}

fn copy_elements(op: &'static str, input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    if input.as_bytes().len() != output.size_bytes() || input.dtype() != output.dtype() {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    match output.dtype() {
        tensor_core::DType::F32 => output.as_f32_slice_mut().copy_from_slice(input.as_f32_slice()),
        dtype => return Err(TensorError::UnsupportedDType { op, dtype }),
    }
    Ok(())
}
