//! Streaming Pipeline
//!
//! ## Task Layout
//!
//! ```text
//! SampleSource (1 task / machine)
//!     │  bounded ingestion channel (send().await = backpressure)
//!     ▼
//! Dispatcher ── shard_for(machine_id) ──► Worker 0..N (bounded lane each)
//!                                            │  WindowBuffer → FeatureExtractor → EnsembleClassifier
//!                                            ▼
//!                                   bounded result channel
//!                                            ▼
//!                                   ResultSink (LatestResults)
//! ```
//!
//! A machine always maps to the same worker, so at most one tick per machine
//! is ever in flight and per-machine order is preserved end to end.
//! Dropping the last ingestion sender drains and stops every stage in turn.

pub mod router;
pub mod sink;
pub mod source;
mod stream;
pub mod window;
pub mod worker;

pub use router::{shard_for, Dispatcher};
pub use sink::{run_sink, LatestResults, ResultSink, SinkStats};
pub use source::{run_producer, ReplaySource, SampleSource, SourceEvent, SyntheticSource};
pub use stream::{PipelineChannels, PipelineHandle, StreamPipeline};
pub use window::WindowBuffer;
pub use worker::{MachineSlot, TickPhase, Worker};

use thiserror::Error;

use crate::types::MachineId;

/// Structural failures that stop the pipeline.
///
/// Per-tick numeric and model failures never surface here; workers count
/// them as skipped ticks.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Machine {machine_id} delivered to worker {worker}, but its shard is worker {expected}")]
    RoutingViolation {
        machine_id: MachineId,
        worker: usize,
        expected: usize,
    },

    #[error("{0} channel closed unexpectedly")]
    ChannelClosed(&'static str),

    #[error("Pipeline task panicked: {0}")]
    TaskPanicked(String),
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters for one worker, returned when the worker exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker: usize,
    pub batches_received: u64,
    pub results_emitted: u64,
    pub ticks_skipped: u64,
    pub machines: usize,
}

/// Aggregate counters for a finished pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub events_routed: u64,
    pub workers: Vec<WorkerStats>,
}

impl PipelineStats {
    pub fn batches_received(&self) -> u64 {
        self.workers.iter().map(|w| w.batches_received).sum()
    }

    pub fn results_emitted(&self) -> u64 {
        self.workers.iter().map(|w| w.results_emitted).sum()
    }

    pub fn ticks_skipped(&self) -> u64 {
        self.workers.iter().map(|w| w.ticks_skipped).sum()
    }

    pub fn machines(&self) -> usize {
        self.workers.iter().map(|w| w.machines).sum()
    }
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pipeline: {} batches over {} machines, {} results, {} skipped ticks",
            self.batches_received(),
            self.machines(),
            self.results_emitted(),
            self.ticks_skipped()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_totals() {
        let stats = PipelineStats {
            events_routed: 7,
            workers: vec![
                WorkerStats {
                    worker: 0,
                    batches_received: 4,
                    results_emitted: 3,
                    ticks_skipped: 1,
                    machines: 2,
                },
                WorkerStats {
                    worker: 1,
                    batches_received: 3,
                    results_emitted: 3,
                    ticks_skipped: 0,
                    machines: 1,
                },
            ],
        };
        assert_eq!(stats.batches_received(), 7);
        assert_eq!(stats.results_emitted(), 6);
        assert_eq!(stats.ticks_skipped(), 1);
        assert_eq!(stats.machines(), 3);
        assert!(stats.to_string().contains("6 results"));
    }
}
