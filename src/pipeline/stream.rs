//! StreamPipeline - spawns the dispatcher and workers and supervises them

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info};

use super::router::Dispatcher;
use super::worker::Worker;
use super::{PipelineError, PipelineStats, WorkerStats};
use crate::config::PipelineConfig;
use crate::ensemble::EnsembleClassifier;
use crate::types::{ClassificationResult, SampleEvent};

enum StageOutcome {
    Dispatcher { routed: u64 },
    Worker(WorkerStats),
}

/// Producer and consumer ends of a running pipeline.
///
/// Clone `ingest` once per producer and drop the original: the pipeline
/// drains and stops when the last sender is gone.
pub struct PipelineChannels {
    pub ingest: mpsc::Sender<SampleEvent>,
    pub results: mpsc::Receiver<ClassificationResult>,
}

/// Join handle for the pipeline's internal supervisor.
pub struct PipelineHandle {
    supervisor: JoinHandle<Result<PipelineStats, PipelineError>>,
}

impl PipelineHandle {
    /// Wait for the pipeline to drain. Fails on the first stage error.
    pub async fn join(self) -> Result<PipelineStats, PipelineError> {
        self.supervisor
            .await
            .map_err(|e| PipelineError::TaskPanicked(e.to_string()))?
    }

    /// Abort every stage immediately.
    pub fn abort(&self) {
        self.supervisor.abort();
    }
}

pub struct StreamPipeline {
    config: PipelineConfig,
    classifier: Arc<EnsembleClassifier>,
}

impl StreamPipeline {
    pub fn new(config: PipelineConfig, classifier: Arc<EnsembleClassifier>) -> Self {
        Self { config, classifier }
    }

    pub fn workers(&self) -> usize {
        self.config.workers.max(1)
    }

    /// Spawn the dispatcher and `workers` worker tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> (PipelineChannels, PipelineHandle) {
        let workers = self.workers();
        let (ingest_tx, ingest_rx) = mpsc::channel(self.config.ingestion_capacity.max(1));
        let (result_tx, result_rx) = mpsc::channel(self.config.result_capacity.max(1));

        let mut stages: JoinSet<Result<StageOutcome, PipelineError>> = JoinSet::new();
        let mut lanes = Vec::with_capacity(workers);

        for index in 0..workers {
            let (lane_tx, lane_rx) = mpsc::channel(self.config.worker_queue_capacity.max(1));
            lanes.push(lane_tx);
            let worker = Worker::new(index, workers, Arc::clone(&self.classifier));
            let results = result_tx.clone();
            stages.spawn(async move { worker.run(lane_rx, results).await.map(StageOutcome::Worker) });
        }
        // Only the workers hold result senders now
        drop(result_tx);

        let dispatcher = Dispatcher::new(lanes);
        stages.spawn(async move {
            dispatcher
                .run(ingest_rx)
                .await
                .map(|routed| StageOutcome::Dispatcher { routed })
        });

        info!(
            workers,
            ingestion_capacity = self.config.ingestion_capacity,
            worker_queue_capacity = self.config.worker_queue_capacity,
            result_capacity = self.config.result_capacity,
            "[Pipeline] Stages spawned"
        );

        let supervisor = tokio::spawn(supervise(stages));
        (
            PipelineChannels {
                ingest: ingest_tx,
                results: result_rx,
            },
            PipelineHandle { supervisor },
        )
    }
}

/// Join all stages; the first failure aborts the rest.
async fn supervise(
    mut stages: JoinSet<Result<StageOutcome, PipelineError>>,
) -> Result<PipelineStats, PipelineError> {
    let mut stats = PipelineStats::default();

    while let Some(joined) = stages.join_next().await {
        match joined {
            Ok(Ok(StageOutcome::Dispatcher { routed })) => stats.events_routed = routed,
            Ok(Ok(StageOutcome::Worker(worker))) => stats.workers.push(worker),
            Ok(Err(e)) => {
                error!("[Pipeline] Stage failed: {}", e);
                stages.abort_all();
                return Err(e);
            }
            Err(e) => {
                error!("[Pipeline] Stage panicked: {}", e);
                stages.abort_all();
                return Err(PipelineError::TaskPanicked(e.to_string()));
            }
        }
    }

    stats.workers.sort_by_key(|w| w.worker);
    Ok(stats)
}
