// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution profiling metrics.
//!
//! [`ExecutionMetrics`] collects per-node timing and the amount of
//! intermediate memory held at once. Node entries are only recorded when
//! the context has profiling enabled; the totals are always filled in.

use crate::ExecutionMode;
use std::time::Duration;

/// Metrics for a single node's execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeMetrics {
    pub node_name: String,
    /// Operator name, e.g. `Conv2d`.
    pub op: &'static str,
    /// Time spent in the kernel.
    pub duration: Duration,
    /// Bytes written to the node's outputs.
    pub output_bytes: usize,
}

/// Aggregate metrics for one graph execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionMetrics {
    pub mode: ExecutionMode,
    /// Total wall-clock time for the run.
    pub total_duration: Duration,
    /// Sum of the recorded node durations.
    pub compute_duration: Duration,
    /// Largest number of intermediate bytes held at the same time.
    pub peak_live_bytes: usize,
    /// Intermediates released before the run finished.
    pub released_values: usize,
    /// Number of nodes executed.
    pub nodes_executed: usize,
    /// Per-node metrics, in execution order.
    pub node_metrics: Vec<NodeMetrics>,
}

impl ExecutionMetrics {
    /// Creates an empty metrics container.
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            total_duration: Duration::ZERO,
            compute_duration: Duration::ZERO,
            peak_live_bytes: 0,
            released_values: 0,
            nodes_executed: 0,
            node_metrics: Vec::new(),
        }
    }

    /// Records metrics for a single node.
    pub fn record_node(&mut self, name: String, op: &'static str, duration: Duration, output_bytes: usize) {
        self.compute_duration += duration;
        self.node_metrics.push(NodeMetrics {
            node_name: name,
            op,
            duration,
            output_bytes,
        });
    }

    /// Tracks the current amount of live intermediate memory.
    pub fn observe_live_bytes(&mut self, live: usize) {
        if live > self.peak_live_bytes {
            self.peak_live_bytes = live;
        }
    }

    /// Finalises metrics with the total wall-clock time and node count.
    pub fn finalise(&mut self, total: Duration, nodes_executed: usize) {
        self.total_duration = total;
        self.nodes_executed = nodes_executed;
    }

    /// The `n` slowest recorded nodes, slowest first.
    pub fn slowest(&self, n: usize) -> Vec<&NodeMetrics> {
        let mut sorted: Vec<&NodeMetrics> = self.node_metrics.iter().collect();
        sorted.sort_by(|a, b| b.duration.cmp(&a.duration));
        sorted.truncate(n);
        sorted
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let peak_mb = self.peak_live_bytes as f64 / (1024.0 * 1024.0);
        format!(
            "Execution ({}): {:.2}ms total, {} nodes, {:.2}ms profiled compute, \
             peak {:.2} MB live, {} intermediates released",
            self.mode,
            self.total_duration.as_secs_f64() * 1000.0,
            self.nodes_executed,
            self.compute_duration.as_secs_f64() * 1000.0,
            peak_mb,
            self.released_values,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let m = ExecutionMetrics::new(ExecutionMode::Graph);
        assert_eq!(m.compute_duration, Duration::ZERO);
        assert!(m.slowest(3).is_empty());
    }

    #[test]
    fn test_record_and_finalise() {
        let mut m = ExecutionMetrics::new(ExecutionMode::PyNative);
        m.record_node("conv1".into(), "Conv2d", Duration::from_millis(10), 4096);
        m.record_node("relu1".into(), "Relu", Duration::from_millis(2), 4096);
        m.observe_live_bytes(8192);
        m.observe_live_bytes(4096);
        m.finalise(Duration::from_millis(15), 2);

        assert_eq!(m.node_metrics.len(), 2);
        assert_eq!(m.compute_duration, Duration::from_millis(12));
        assert_eq!(m.peak_live_bytes, 8192);
        assert_eq!(m.slowest(1)[0].node_name, "conv1");
    }

    #[test]
    fn test_summary_format() {
        let mut m = ExecutionMetrics::new(ExecutionMode::Graph);
        m.released_values = 3;
        m.finalise(Duration::from_millis(10), 5);

        let s = m.summary();
        assert!(s.contains("Execution (graph)"));
        assert!(s.contains("5 nodes"));
        assert!(s.contains("3 intermediates released"));
    }
}
