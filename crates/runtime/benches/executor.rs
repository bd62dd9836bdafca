// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for whole-graph execution in both modes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use network::{init_parameters, trace_network, LeNet5};
use runtime::{Context, DeviceTarget, ExecutionMode, Executor};
use tensor_core::{Shape, Tensor};

fn bench_lenet(c: &mut Criterion) {
    let mut net = LeNet5::new(1, 10).unwrap();
    init_parameters(&mut net, 0);
    let shape = Shape::nchw(1, 1, 32, 32);
    let graph = trace_network(&net, shape.clone()).unwrap().compile().unwrap();
    let inputs = [Tensor::ones(shape)];

    for mode in [ExecutionMode::Graph, ExecutionMode::PyNative] {
        let executor = Executor::new(Context::new(mode, DeviceTarget::Cpu).unwrap());
        c.bench_function(&format!("lenet5_{mode}"), |b| {
            b.iter(|| black_box(executor.run(&graph, &inputs).unwrap()))
        });
    }
}

criterion_group!(benches, bench_lenet);
criterion_main!(benches);
