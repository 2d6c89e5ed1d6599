//! Pipeline Integration Tests
//!
//! Drives the full producer → dispatcher → worker → sink chain with injected
//! predictors and checks ordering, degenerate input handling, shard coverage
//! and drain-on-shutdown.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use vibewatch::config::PipelineConfig;
use vibewatch::config::SourceConfig;
use vibewatch::pipeline::{
    run_producer, run_sink, shard_for, LatestResults, PipelineChannels, PipelineStats, ReplaySource,
    StreamPipeline, SyntheticSource,
};
use vibewatch::{
    ClassificationResult, Confidence, EnsembleClassifier, FaultLabel, FeatureVector, MachineId,
    ModelError, Predictor, RawSample, SampleEvent,
};

// ============================================================================
// Fixtures
// ============================================================================

struct Constant(&'static str, FaultLabel);

impl Predictor for Constant {
    fn name(&self) -> &str {
        self.0
    }

    fn classify(&self, _features: &FeatureVector) -> Result<FaultLabel, ModelError> {
        Ok(self.1)
    }
}

fn classifier() -> Arc<EnsembleClassifier> {
    Arc::new(EnsembleClassifier::new(
        Box::new(Constant("svm", FaultLabel::Normal)),
        Box::new(Constant("knn", FaultLabel::Normal)),
        Box::new(Constant("gnb", FaultLabel::Unbalance)),
    ))
}

fn pipeline_config(workers: usize) -> PipelineConfig {
    // Tiny queues so producers hit backpressure
    PipelineConfig {
        workers,
        ingestion_capacity: 2,
        worker_queue_capacity: 1,
        result_capacity: 2,
    }
}

/// 100-sample batch `index` of a 50 Hz sine sampled at 20 kHz.
fn sine_batch(index: usize) -> Vec<RawSample> {
    (0..100)
        .map(|i| {
            let t = (index * 100 + i) as f64 / 20_000.0;
            let v = (2.0 * std::f64::consts::PI * 50.0 * t).sin();
            RawSample::new(t, v, 0.8 * v, 0.3 * v)
        })
        .collect()
}

fn event(machine: u32, batch: Vec<RawSample>, expected: FaultLabel) -> SampleEvent {
    SampleEvent {
        machine_id: MachineId(machine),
        batch,
        expected_label: expected,
    }
}

/// Replay `events` through a fresh pipeline and collect every result.
async fn replay(events: Vec<SampleEvent>, workers: usize) -> (Vec<ClassificationResult>, PipelineStats) {
    let (channels, handle) = StreamPipeline::new(pipeline_config(workers), classifier()).spawn();
    let PipelineChannels { ingest, mut results } = channels;

    let producer = tokio::spawn(run_producer(
        ReplaySource::new(events),
        ingest,
        CancellationToken::new(),
    ));

    let mut collected = Vec::new();
    while let Some(result) = results.recv().await {
        collected.push(result);
    }

    producer.await.expect("producer join").expect("producer");
    let stats = handle.join().await.expect("pipeline");
    (collected, stats)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn five_sine_batches_produce_five_results() {
    let events = (0..5).map(|i| event(1, sine_batch(i), FaultLabel::Normal)).collect();
    let (results, stats) = replay(events, 2).await;

    assert_eq!(results.len(), 5);
    for r in &results {
        assert_eq!(r.machine_id, MachineId(1));
        assert_eq!(r.models.svm, FaultLabel::Normal);
        assert_eq!(r.models.knn, FaultLabel::Normal);
        assert_eq!(r.models.gnb, FaultLabel::Unbalance);
        assert_eq!(r.predicted_label, FaultLabel::Normal);
        assert_eq!(r.confidence, Confidence::High);
        assert!(r.summary.x.rms.is_finite() && r.summary.x.rms > 0.0);
    }
    assert_eq!(stats.events_routed, 5);
    assert_eq!(stats.results_emitted(), 5);
    assert_eq!(stats.ticks_skipped(), 0);
    assert_eq!(stats.machines(), 1);
}

#[tokio::test]
async fn per_machine_order_is_preserved() {
    // expected_label doubles as a sequence marker
    let markers = [
        FaultLabel::Normal,
        FaultLabel::Misalignment,
        FaultLabel::Unbalance,
        FaultLabel::BearingFault,
        FaultLabel::Unbalance,
        FaultLabel::Normal,
        FaultLabel::BearingFault,
    ];

    let mut events = Vec::new();
    for (i, &marker) in markers.iter().enumerate() {
        events.push(event(3, sine_batch(i), marker));
        events.push(event(4, sine_batch(i), FaultLabel::Normal));
        events.push(event(11, sine_batch(i), FaultLabel::Misalignment));
    }

    let (results, _) = replay(events, 3).await;
    let machine3: Vec<FaultLabel> = results
        .iter()
        .filter(|r| r.machine_id == MachineId(3))
        .map(|r| r.expected_label)
        .collect();

    assert_eq!(results.len(), markers.len() * 3);
    assert_eq!(machine3, markers.to_vec());
}

#[tokio::test]
async fn all_zero_window_still_yields_result() {
    let zeros = vec![RawSample::default(); 100];
    let events = (0..5).map(|_| event(2, zeros.clone(), FaultLabel::Normal)).collect();
    let (results, stats) = replay(events, 1).await;

    assert_eq!(results.len(), 5);
    assert_eq!(stats.ticks_skipped(), 0);
    let last = results.last().expect("result");
    for axis in [last.summary.x, last.summary.y, last.summary.z] {
        assert_eq!(axis.rms, 0.0);
        assert_eq!(axis.pp, 0.0);
        assert_eq!(axis.kurtosis, 0.0);
        assert_eq!(axis.crestf, 0.0);
    }
    assert_eq!(last.predicted_label, FaultLabel::Normal);
}

#[tokio::test]
async fn empty_batches_are_skipped_not_fatal() {
    let events = vec![
        event(5, Vec::new(), FaultLabel::Normal),
        event(5, sine_batch(0), FaultLabel::Normal),
    ];
    let (results, stats) = replay(events, 2).await;

    assert_eq!(results.len(), 1);
    assert_eq!(stats.batches_received(), 2);
    assert_eq!(stats.ticks_skipped(), 1);
}

#[tokio::test]
async fn routing_covers_every_worker() {
    let workers = 4;
    let machines: Vec<u32> = (1..=64).collect();
    let events = machines
        .iter()
        .map(|&m| event(m, sine_batch(0), FaultLabel::Normal))
        .collect();
    let (results, stats) = replay(events, workers).await;

    assert_eq!(results.len(), machines.len());
    assert_eq!(stats.workers.len(), workers);
    assert_eq!(stats.machines(), machines.len());
    for w in &stats.workers {
        let expected = machines
            .iter()
            .filter(|&&m| shard_for(MachineId(m), workers) == w.worker)
            .count();
        assert_eq!(w.machines, expected, "worker {}", w.worker);
        assert!(w.machines > 0, "worker {} received no machines", w.worker);
    }
}

#[tokio::test]
async fn cancellation_drains_in_flight_ticks() {
    let (channels, handle) = StreamPipeline::new(pipeline_config(2), classifier()).spawn();
    let PipelineChannels { ingest, results } = channels;

    let latest = LatestResults::from_secs(60);
    let sink = tokio::spawn(run_sink(results, latest.clone()));

    let cancel = CancellationToken::new();
    let source_config = SourceConfig {
        seed: Some(17),
        ..Default::default()
    };
    let mut producers = Vec::new();
    for (i, condition) in FaultLabel::MODEL_LABELS.iter().enumerate() {
        let source = SyntheticSource::new(MachineId(i as u32 + 1), *condition, &source_config)
            .expect("source")
            .unpaced();
        producers.push(tokio::spawn(run_producer(source, ingest.clone(), cancel.clone())));
    }
    drop(ingest);

    let machines = FaultLabel::MODEL_LABELS.len();
    tokio::time::timeout(std::time::Duration::from_secs(10), async {
        while latest.len().await < machines {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("every machine reported before shutdown");
    cancel.cancel();

    let mut produced = 0;
    for p in producers {
        produced += p.await.expect("join").expect("producer");
    }
    let stats = handle.join().await.expect("pipeline");
    let sink_stats = sink.await.expect("sink");

    assert_eq!(stats.batches_received(), produced);
    assert_eq!(sink_stats.received, stats.results_emitted());
    assert_eq!(latest.len().await, machines);
    assert!(latest.stale_machines_at(chrono::Utc::now()).await.is_empty());
}
