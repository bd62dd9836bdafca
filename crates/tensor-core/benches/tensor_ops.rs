// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the CPU kernels.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tensor_core::{conv2d, relu_v2, DType, PadMode, Shape, Tensor, Window2d};

fn bench_conv2d(c: &mut Criterion) {
    // Inception-A branch: 384 -> 96 channels, 1x1, 35x35.
    let input = Tensor::ones(Shape::nchw(1, 384, 35, 35));
    let weight = Tensor::full(Shape::nchw(96, 384, 1, 1), 0.01);
    let window = Window2d::square(1, 1, PadMode::Same);
    let mut output = Tensor::zeros(Shape::nchw(1, 96, 35, 35), DType::F32);

    c.bench_function("conv2d_1x1_384x35x35", |b| {
        b.iter(|| {
            conv2d(&input.view(), &weight.view(), None, &window, &mut output).unwrap();
            black_box(&output);
        })
    });

    let input = Tensor::ones(Shape::nchw(1, 64, 35, 35));
    let weight = Tensor::full(Shape::nchw(96, 64, 3, 3), 0.01);
    let window = Window2d::square(3, 1, PadMode::Same);
    let mut output = Tensor::zeros(Shape::nchw(1, 96, 35, 35), DType::F32);

    c.bench_function("conv2d_3x3_64x35x35", |b| {
        b.iter(|| {
            conv2d(&input.view(), &weight.view(), None, &window, &mut output).unwrap();
            black_box(&output);
        })
    });
}

fn bench_relu_v2(c: &mut Criterion) {
    let shape = Shape::nchw(1, 384, 35, 35);
    let input = Tensor::full(shape.clone(), -0.5);
    let mut output = Tensor::zeros(shape.clone(), DType::F32);
    let mut mask = Tensor::zeros(shape, DType::U8);

    c.bench_function("relu_v2_384x35x35", |b| {
        b.iter(|| {
            relu_v2(&input.view(), &mut output, &mut mask).unwrap();
            black_box(&mask);
        })
    });
}

criterion_group!(benches, bench_conv2d, bench_relu_v2);
criterion_main!(benches);
