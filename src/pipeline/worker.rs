//! Sharded processing worker
//!
//! Each worker exclusively owns the `MachineSlot`s of the machines routed to
//! it and runs their ticks sequentially: append → extract → classify → emit.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::router::shard_for;
use super::window::WindowBuffer;
use super::{PipelineError, WorkerStats};
use crate::config::defaults::PROGRESS_LOG_INTERVAL;
use crate::ensemble::EnsembleClassifier;
use crate::processing::FeatureExtractor;
use crate::types::{ClassificationResult, FeatureSummary, MachineId, SampleEvent};

/// Per-machine tick state.
///
/// `Idle` only before the first batch. A tick moves through `Buffering`
/// (window not yet full) or `Ready` (full), then `Emitting` while the result
/// is handed off, then back to `Buffering` / `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPhase {
    #[default]
    Idle,
    Buffering,
    Ready,
    Emitting,
}

/// Everything a worker keeps for one machine.
#[derive(Debug, Clone, Default)]
pub struct MachineSlot {
    window: WindowBuffer,
    phase: TickPhase,
    ticks: u64,
    emitted: u64,
    skipped: u64,
}

impl MachineSlot {
    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn settle(&mut self) {
        self.phase = if self.window.is_full() {
            TickPhase::Ready
        } else {
            TickPhase::Buffering
        };
    }
}

pub struct Worker {
    index: usize,
    workers: usize,
    extractor: FeatureExtractor,
    classifier: Arc<EnsembleClassifier>,
    slots: HashMap<MachineId, MachineSlot>,
    stats: WorkerStats,
}

impl Worker {
    pub fn new(index: usize, workers: usize, classifier: Arc<EnsembleClassifier>) -> Self {
        Self {
            index,
            workers,
            extractor: FeatureExtractor::new(),
            classifier,
            slots: HashMap::new(),
            stats: WorkerStats {
                worker: index,
                ..Default::default()
            },
        }
    }

    pub fn slot(&self, machine_id: MachineId) -> Option<&MachineSlot> {
        self.slots.get(&machine_id)
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            machines: self.slots.len(),
            ..self.stats.clone()
        }
    }

    /// Run one tick for the event's machine.
    ///
    /// Returns `Ok(None)` for a skipped tick. On `Ok(Some(_))` the slot is
    /// left in `Emitting` until [`Worker::complete_emit`] is called.
    pub fn tick(&mut self, event: SampleEvent) -> Result<Option<ClassificationResult>, PipelineError> {
        let expected = shard_for(event.machine_id, self.workers);
        if expected != self.index {
            return Err(PipelineError::RoutingViolation {
                machine_id: event.machine_id,
                worker: self.index,
                expected,
            });
        }

        self.stats.batches_received += 1;
        let machine_id = event.machine_id;
        let slot = self.slots.entry(machine_id).or_default();
        slot.ticks += 1;
        slot.window.append(event.batch);
        slot.settle();

        let samples = slot.window.snapshot();
        let features = match self.extractor.extract(&samples) {
            Ok(f) => f,
            Err(e) => {
                if e.is_recoverable() {
                    debug!(machine = %machine_id, error = %e, "Tick skipped");
                } else {
                    warn!(machine = %machine_id, error = %e, "Feature extraction failed, tick skipped");
                }
                slot.skipped += 1;
                self.stats.ticks_skipped += 1;
                return Ok(None);
            }
        };

        let decision = match self.classifier.predict(&features) {
            Ok(d) => d,
            Err(e) => {
                warn!(machine = %machine_id, error = %e, "Classification failed, tick skipped");
                slot.skipped += 1;
                self.stats.ticks_skipped += 1;
                return Ok(None);
            }
        };

        slot.phase = TickPhase::Emitting;
        Ok(Some(ClassificationResult {
            machine_id,
            expected_label: event.expected_label,
            predicted_label: decision.predicted_label,
            confidence: decision.confidence,
            models: decision.votes,
            summary: FeatureSummary::from_features(&features),
            produced_at: Utc::now(),
        }))
    }

    /// Mark the machine's result as handed off.
    pub fn complete_emit(&mut self, machine_id: MachineId) {
        if let Some(slot) = self.slots.get_mut(&machine_id) {
            slot.emitted += 1;
            slot.settle();
        }
        self.stats.results_emitted += 1;
        if self.stats.results_emitted % PROGRESS_LOG_INTERVAL == 0 {
            debug!(
                worker = self.index,
                emitted = self.stats.results_emitted,
                skipped = self.stats.ticks_skipped,
                machines = self.slots.len(),
                "Worker progress"
            );
        }
    }

    /// Process the lane until it closes, then report statistics.
    pub async fn run(
        mut self,
        mut lane: mpsc::Receiver<SampleEvent>,
        results: mpsc::Sender<ClassificationResult>,
    ) -> Result<WorkerStats, PipelineError> {
        debug!(worker = self.index, "[Worker] Task starting");

        while let Some(event) = lane.recv().await {
            let machine_id = event.machine_id;
            if let Some(result) = self.tick(event)? {
                results
                    .send(result)
                    .await
                    .map_err(|_| PipelineError::ChannelClosed("result"))?;
                self.complete_emit(machine_id);
            }
        }

        let stats = self.stats();
        info!(
            worker = stats.worker,
            machines = stats.machines,
            batches = stats.batches_received,
            emitted = stats.results_emitted,
            skipped = stats.ticks_skipped,
            "[Worker] Lane closed, exiting"
        );
        Ok(stats)
    }
}
