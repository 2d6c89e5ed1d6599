//! Machine → worker routing

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::mpsc;
use tracing::debug;

use super::PipelineError;
use crate::types::{MachineId, SampleEvent};

/// Worker index owning `machine_id`. Stable for the process lifetime.
pub fn shard_for(machine_id: MachineId, workers: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    machine_id.hash(&mut hasher);
    (hasher.finish() % workers.max(1) as u64) as usize
}

/// Single task fanning the ingestion channel out to the worker lanes.
pub struct Dispatcher {
    lanes: Vec<mpsc::Sender<SampleEvent>>,
}

impl Dispatcher {
    pub fn new(lanes: Vec<mpsc::Sender<SampleEvent>>) -> Self {
        Self { lanes }
    }

    /// Route until the ingestion channel closes. Returns the number of events routed.
    ///
    /// Lanes are dropped on return, which lets the workers drain and exit.
    pub async fn run(self, mut ingest: mpsc::Receiver<SampleEvent>) -> Result<u64, PipelineError> {
        let mut routed = 0u64;
        while let Some(event) = ingest.recv().await {
            let shard = shard_for(event.machine_id, self.lanes.len());
            let lane = self
                .lanes
                .get(shard)
                .ok_or(PipelineError::ChannelClosed("worker"))?;
            lane.send(event)
                .await
                .map_err(|_| PipelineError::ChannelClosed("worker"))?;
            routed += 1;
        }
        debug!(routed, "[Dispatcher] Ingestion closed, releasing worker lanes");
        Ok(routed)
    }
}
