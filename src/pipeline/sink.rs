//! Result sink: latest classification per machine
//!
//! `LatestResults` is a cheaply clonable handle over shared state. The sink
//! task writes to it and any number of readers query it concurrently.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

use crate::types::{ClassificationResult, Confidence, MachineId};

/// Destination for completed ticks.
#[async_trait]
pub trait ResultSink: Send + Sync + 'static {
    async fn publish(&self, result: ClassificationResult);
}

#[derive(Debug, Clone)]
struct Entry {
    result: ClassificationResult,
    updated_at: DateTime<Utc>,
}

/// Last result per machine plus the time it arrived.
#[derive(Debug, Clone)]
pub struct LatestResults {
    entries: Arc<RwLock<HashMap<MachineId, Entry>>>,
    stale_after: Duration,
}

impl LatestResults {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            stale_after,
        }
    }

    pub fn from_secs(stale_after_secs: u64) -> Self {
        let secs = i64::try_from(stale_after_secs).unwrap_or(i64::MAX);
        Self::new(Duration::try_seconds(secs).unwrap_or(Duration::MAX))
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Store `result` as the machine's latest, stamped at `at`.
    pub async fn record_at(&self, result: ClassificationResult, at: DateTime<Utc>) {
        let mut entries = self.entries.write().await;
        entries.insert(result.machine_id, Entry { result, updated_at: at });
    }

    pub async fn latest(&self, machine_id: MachineId) -> Option<ClassificationResult> {
        self.entries
            .read()
            .await
            .get(&machine_id)
            .map(|e| e.result.clone())
    }

    pub async fn updated_at(&self, machine_id: MachineId) -> Option<DateTime<Utc>> {
        self.entries.read().await.get(&machine_id).map(|e| e.updated_at)
    }

    /// All latest results ordered by machine id.
    pub async fn snapshot(&self) -> Vec<ClassificationResult> {
        let entries = self.entries.read().await;
        let mut results: Vec<_> = entries.values().map(|e| e.result.clone()).collect();
        results.sort_by_key(|r| r.machine_id);
        results
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// A machine with no result yet counts as stale.
    pub async fn is_stale_at(&self, machine_id: MachineId, now: DateTime<Utc>) -> bool {
        match self.updated_at(machine_id).await {
            Some(updated) => now - updated > self.stale_after,
            None => true,
        }
    }

    pub async fn is_stale(&self, machine_id: MachineId) -> bool {
        self.is_stale_at(machine_id, Utc::now()).await
    }

    /// Known machines whose last update is older than the staleness window.
    pub async fn stale_machines_at(&self, now: DateTime<Utc>) -> Vec<MachineId> {
        let entries = self.entries.read().await;
        let mut stale: Vec<_> = entries
            .iter()
            .filter(|(_, e)| now - e.updated_at > self.stale_after)
            .map(|(id, _)| *id)
            .collect();
        stale.sort();
        stale
    }
}

#[async_trait]
impl ResultSink for LatestResults {
    async fn publish(&self, result: ClassificationResult) {
        self.record_at(result, Utc::now()).await;
    }
}

// ============================================================================
// Sink Task
// ============================================================================

/// Counters kept by the sink task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub received: u64,
    /// Predictions matching the source's ground truth
    pub correct: u64,
    pub low_confidence: u64,
}

/// Drain the result channel into `sink` until every worker has exited.
pub async fn run_sink<S: ResultSink>(
    mut results: mpsc::Receiver<ClassificationResult>,
    sink: S,
) -> SinkStats {
    let mut stats = SinkStats::default();

    while let Some(result) = results.recv().await {
        stats.received += 1;
        if result.is_correct() {
            stats.correct += 1;
        }
        if result.confidence == Confidence::Low {
            stats.low_confidence += 1;
        }

        info!(
            machine = %result.machine_id,
            expected = %result.expected_label,
            predicted = %result.predicted_label,
            confidence = %result.confidence,
            svm = %result.models.svm,
            knn = %result.models.knn,
            gnb = %result.models.gnb,
            rms_x = result.summary.x.rms,
            "Classification"
        );

        sink.publish(result).await;
    }

    info!(received = stats.received, "[Sink] Result channel closed");
    stats
}
