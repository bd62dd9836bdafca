// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inception-v4 (Szegedy et al., 2016).
//!
//! ```text
//! 299x299x3 ─ stem ─ 35x35x384 ─ 4x A ─ reduction A ─ 17x17x1024
//!           ─ 7x B ─ reduction B ─ 8x8x1536 ─ 3x C ─ pool ─ dropout ─ dense
//! ```

use crate::cell::{Branches, Sequential};
use crate::layers::{avg_pool2d, dropout, flatten, global_avg_pool, max_pool2d, BasicConv2d, Dense};
use crate::{Cell, NetworkError, Parameter};
use model_ir::{GraphBuilder, ValueId};
use tensor_core::PadMode;

/// Input side length the network is designed for.
pub const INPUT_SIZE: usize = 299;

const NUM_INCEPTION_A: usize = 4;
const NUM_INCEPTION_B: usize = 7;
const NUM_INCEPTION_C: usize = 3;
const KEEP_PROB: f32 = 0.8;

type BoxedCell = Box<dyn Cell>;

fn conv(name: String, cin: usize, cout: usize, kernel: (usize, usize)) -> BoxedCell {
    Box::new(BasicConv2d::new(name, cin, cout, kernel, 1, PadMode::Same))
}

fn conv_reduce(name: String, cin: usize, cout: usize) -> BoxedCell {
    Box::new(BasicConv2d::new(name, cin, cout, (3, 3), 2, PadMode::Valid))
}

fn seq(name: String, cells: Vec<BoxedCell>) -> BoxedCell {
    Box::new(Sequential::new(name, cells))
}

fn stem(name: &str, in_channels: usize) -> Sequential {
    let mixed_3a = Branches::new(
        format!("{name}.mixed_3a"),
        vec![
            Box::new(max_pool2d(format!("{name}.mixed_3a.branch_0"), 3, 2, PadMode::Valid)),
            conv_reduce(format!("{name}.mixed_3a.branch_1"), 64, 96),
        ],
    );
    let b = |branch: &str, layer: &str| format!("{name}.mixed_4a.{branch}.{layer}");
    let mixed_4a = Branches::new(
        format!("{name}.mixed_4a"),
        vec![
            seq(
                format!("{name}.mixed_4a.branch_0"),
                vec![
                    conv(b("branch_0", "0"), 160, 64, (1, 1)),
                    Box::new(BasicConv2d::new(b("branch_0", "1"), 64, 96, (3, 3), 1, PadMode::Valid)),
                ],
            ),
            seq(
                format!("{name}.mixed_4a.branch_1"),
                vec![
                    conv(b("branch_1", "0"), 160, 64, (1, 1)),
                    conv(b("branch_1", "1"), 64, 64, (1, 7)),
                    conv(b("branch_1", "2"), 64, 64, (7, 1)),
                    Box::new(BasicConv2d::new(b("branch_1", "3"), 64, 96, (3, 3), 1, PadMode::Valid)),
                ],
            ),
        ],
    );
    let mixed_5a = Branches::new(
        format!("{name}.mixed_5a"),
        vec![
            conv_reduce(format!("{name}.mixed_5a.branch_0"), 192, 192),
            Box::new(max_pool2d(format!("{name}.mixed_5a.branch_1"), 3, 2, PadMode::Valid)),
        ],
    );
    Sequential::new(
        name,
        vec![
            Box::new(BasicConv2d::new(format!("{name}.conv2d_1a_3x3"), in_channels, 32, (3, 3), 2, PadMode::Valid)),
            Box::new(BasicConv2d::new(format!("{name}.conv2d_2a_3x3"), 32, 32, (3, 3), 1, PadMode::Valid)),
            conv(format!("{name}.conv2d_2b_3x3"), 32, 64, (3, 3)),
            Box::new(mixed_3a),
            Box::new(mixed_4a),
            Box::new(mixed_5a),
        ],
    )
}

/// 35x35x384 → 35x35x384.
fn inception_a(name: &str) -> Branches {
    let n = |layer: &str| format!("{name}.{layer}");
    Branches::new(
        name,
        vec![
            conv(n("branch_0"), 384, 96, (1, 1)),
            seq(
                n("branch_1"),
                vec![conv(n("branch_1.0"), 384, 64, (1, 1)), conv(n("branch_1.1"), 64, 96, (3, 3))],
            ),
            seq(
                n("branch_2"),
                vec![
                    conv(n("branch_2.0"), 384, 64, (1, 1)),
                    conv(n("branch_2.1"), 64, 96, (3, 3)),
                    conv(n("branch_2.2"), 96, 96, (3, 3)),
                ],
            ),
            seq(
                n("branch_3"),
                vec![
                    Box::new(avg_pool2d(n("branch_3.pool"), 3, 1, PadMode::Same)),
                    conv(n("branch_3.1"), 384, 96, (1, 1)),
                ],
            ),
        ],
    )
}

/// 35x35x384 → 17x17x1024.
fn reduction_a(name: &str) -> Branches {
    let n = |layer: &str| format!("{name}.{layer}");
    Branches::new(
        name,
        vec![
            conv_reduce(n("branch_0"), 384, 384),
            seq(
                n("branch_1"),
                vec![
                    conv(n("branch_1.0"), 384, 192, (1, 1)),
                    conv(n("branch_1.1"), 192, 224, (3, 3)),
                    conv_reduce(n("branch_1.2"), 224, 256),
                ],
            ),
            Box::new(max_pool2d(n("branch_2"), 3, 2, PadMode::Valid)),
        ],
    )
}

/// 17x17x1024 → 17x17x1024.
fn inception_b(name: &str) -> Branches {
    let n = |layer: &str| format!("{name}.{layer}");
    Branches::new(
        name,
        vec![
            conv(n("branch_0"), 1024, 384, (1, 1)),
            seq(
                n("branch_1"),
                vec![
                    conv(n("branch_1.0"), 1024, 192, (1, 1)),
                    conv(n("branch_1.1"), 192, 224, (1, 7)),
                    conv(n("branch_1.2"), 224, 256, (7, 1)),
                ],
            ),
            seq(
                n("branch_2"),
                vec![
                    conv(n("branch_2.0"), 1024, 192, (1, 1)),
                    conv(n("branch_2.1"), 192, 192, (7, 1)),
                    conv(n("branch_2.2"), 192, 224, (1, 7)),
                    conv(n("branch_2.3"), 224, 224, (7, 1)),
                    conv(n("branch_2.4"), 224, 256, (1, 7)),
                ],
            ),
            seq(
                n("branch_3"),
                vec![
                    Box::new(avg_pool2d(n("branch_3.pool"), 3, 1, PadMode::Same)),
                    conv(n("branch_3.1"), 1024, 128, (1, 1)),
                ],
            ),
        ],
    )
}

/// 17x17x1024 → 8x8x1536.
fn reduction_b(name: &str) -> Branches {
    let n = |layer: &str| format!("{name}.{layer}");
    Branches::new(
        name,
        vec![
            seq(
                n("branch_0"),
                vec![conv(n("branch_0.0"), 1024, 192, (1, 1)), conv_reduce(n("branch_0.1"), 192, 192)],
            ),
            seq(
                n("branch_1"),
                vec![
                    conv(n("branch_1.0"), 1024, 256, (1, 1)),
                    conv(n("branch_1.1"), 256, 256, (1, 7)),
                    conv(n("branch_1.2"), 256, 320, (7, 1)),
                    conv_reduce(n("branch_1.3"), 320, 320),
                ],
            ),
            Box::new(max_pool2d(n("branch_2"), 3, 2, PadMode::Valid)),
        ],
    )
}

/// 8x8x1536 → 8x8x1536. Branches 1 and 2 fork into a 1x3 / 3x1 pair.
fn inception_c(name: &str) -> Branches {
    let n = |layer: &str| format!("{name}.{layer}");
    let fork = |prefix: &str, cin: usize| -> BoxedCell {
        Box::new(Branches::new(
            n(&format!("{prefix}.fork")),
            vec![
                conv(n(&format!("{prefix}.fork.0")), cin, 256, (1, 3)),
                conv(n(&format!("{prefix}.fork.1")), cin, 256, (3, 1)),
            ],
        ))
    };
    Branches::new(
        name,
        vec![
            conv(n("branch_0"), 1536, 256, (1, 1)),
            seq(n("branch_1"), vec![conv(n("branch_1.0"), 1536, 384, (1, 1)), fork("branch_1", 384)]),
            seq(
                n("branch_2"),
                vec![
                    conv(n("branch_2.0"), 1536, 384, (1, 1)),
                    conv(n("branch_2.1"), 384, 448, (3, 1)),
                    conv(n("branch_2.2"), 448, 512, (1, 3)),
                    fork("branch_2", 512),
                ],
            ),
            seq(
                n("branch_3"),
                vec![
                    Box::new(avg_pool2d(n("branch_3.pool"), 3, 1, PadMode::Same)),
                    conv(n("branch_3.1"), 1536, 256, (1, 1)),
                ],
            ),
        ],
    )
}

/// Inception-v4 image classifier.
#[derive(Debug)]
pub struct InceptionV4 {
    in_channels: usize,
    classes: usize,
    body: Sequential,
}

impl InceptionV4 {
    /// # Errors
    /// [`NetworkError::InvalidConfig`] for zero channels or classes.
    pub fn new(in_channels: usize, classes: usize) -> Result<Self, NetworkError> {
        if in_channels == 0 || classes == 0 {
            return Err(NetworkError::InvalidConfig(format!(
                "inceptionv4 needs at least one input channel and one class (got {in_channels} channels, {classes} classes)"
            )));
        }
        let mut cells: Vec<BoxedCell> = vec![Box::new(stem("stem", in_channels))];
        cells.extend((0..NUM_INCEPTION_A).map(|i| Box::new(inception_a(&format!("inception_a.{i}"))) as BoxedCell));
        cells.push(Box::new(reduction_a("reduction_a")));
        cells.extend((0..NUM_INCEPTION_B).map(|i| Box::new(inception_b(&format!("inception_b.{i}"))) as BoxedCell));
        cells.push(Box::new(reduction_b("reduction_b")));
        cells.extend((0..NUM_INCEPTION_C).map(|i| Box::new(inception_c(&format!("inception_c.{i}"))) as BoxedCell));
        cells.push(Box::new(global_avg_pool("avgpool")));
        cells.push(Box::new(flatten("flatten")));
        cells.push(Box::new(dropout("dropout", KEEP_PROB)));
        cells.push(Box::new(Dense::new("dense", 1536, classes)));

        Ok(Self {
            in_channels,
            classes,
            body: Sequential::new("inceptionv4", cells),
        })
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn classes(&self) -> usize {
        self.classes
    }
}

impl Cell for InceptionV4 {
    fn name(&self) -> &str {
        self.body.name()
    }

    fn trace(&self, builder: &mut GraphBuilder, input: ValueId) -> Result<ValueId, NetworkError> {
        self.body.trace(builder, input)
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.body.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.body.parameters_mut()
    }
}
