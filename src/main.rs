//! VIBEWATCH - streaming vibration fault classification
//!
//! Runs one synthetic producer per machine through the sharded pipeline and
//! logs every classification until Ctrl+C or the optional duration elapses.
//!
//! # Usage
//!
//! ```bash
//! # Four machines (one per condition), two workers, models from ./models
//! vibewatch --machines 4 --workers 2
//!
//! # Explicit config and model directory, stop after 30 s
//! vibewatch --config vibewatch.toml --models /opt/models --duration 30
//! ```
//!
//! # Environment Variables
//!
//! - `VIBEWATCH_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use vibewatch::config::{VibewatchConfig, CONFIG_ENV_VAR};
use vibewatch::pipeline::{
    run_producer, run_sink, LatestResults, PipelineStats, SinkStats, StreamPipeline, SyntheticSource,
};
use vibewatch::types::{FaultLabel, MachineId};
use vibewatch::ModelStore;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "vibewatch")]
#[command(about = "Streaming vibration feature extraction and ensemble fault classification")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides the VIBEWATCH_CONFIG / ./vibewatch.toml search)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory containing svm.json, knn.json and gnb.json
    #[arg(long, value_name = "DIR")]
    models: Option<PathBuf>,

    /// Number of simulated machines
    #[arg(long)]
    machines: Option<u32>,

    /// Number of processing workers
    #[arg(long)]
    workers: Option<usize>,

    /// Batches per second per machine
    #[arg(long, value_name = "HZ")]
    rate: Option<f64>,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(long, value_name = "SECS")]
    duration: Option<u64>,
}

impl CliArgs {
    fn apply(&self, config: &mut VibewatchConfig) {
        if let Some(dir) = &self.models {
            config.models.dir = dir.clone();
        }
        if let Some(machines) = self.machines {
            config.source.machines = machines;
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if let Some(rate) = self.rate {
            config.source.rate_hz = rate;
        }
    }
}

// ============================================================================
// Task Reports for Supervisor Logging
// ============================================================================

#[derive(Debug)]
enum TaskReport {
    Producer { machine_id: MachineId, sent: u64 },
    Pipeline(PipelineStats),
    Sink(SinkStats),
}

impl std::fmt::Display for TaskReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskReport::Producer { machine_id, .. } => write!(f, "Producer[{}]", machine_id),
            TaskReport::Pipeline(_) => write!(f, "Pipeline"),
            TaskReport::Sink(_) => write!(f, "Sink"),
        }
    }
}

#[derive(Debug, Default)]
struct RunSummary {
    batches_produced: u64,
    pipeline: Option<PipelineStats>,
    sink: Option<SinkStats>,
}

/// Join every task; the first failure cancels and aborts the rest.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskReport>>,
    cancel_token: CancellationToken,
) -> Result<RunSummary> {
    info!("Supervisor: all tasks spawned, monitoring...");
    let mut summary = RunSummary::default();

    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(Ok(report)) => {
                info!("Supervisor: task {} completed normally", report);
                match report {
                    TaskReport::Producer { sent, .. } => summary.batches_produced += sent,
                    TaskReport::Pipeline(stats) => summary.pipeline = Some(stats),
                    TaskReport::Sink(stats) => summary.sink = Some(stats),
                }
            }
            Ok(Err(e)) => {
                error!("Supervisor: task failed with error: {:#}", e);
                cancel_token.cancel();
                task_set.abort_all();
                return Err(e);
            }
            Err(e) => {
                error!("Supervisor: task panicked: {}", e);
                cancel_token.cancel();
                task_set.abort_all();
                return Err(anyhow::anyhow!("Task panicked: {}", e));
            }
        }
    }

    info!("Supervisor: all tasks completed");
    Ok(summary)
}

fn log_final_statistics(summary: &RunSummary, latest: usize) {
    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("FINAL STATISTICS");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("   Batches Produced:     {}", summary.batches_produced);
    if let Some(stats) = &summary.pipeline {
        info!("   Batches Routed:       {}", stats.events_routed);
        info!("   Results Emitted:      {}", stats.results_emitted());
        info!("   Ticks Skipped:        {}", stats.ticks_skipped());
        for w in &stats.workers {
            info!(
                "   Worker {}:             {} machines, {} batches, {} results",
                w.worker, w.machines, w.batches_received, w.results_emitted
            );
        }
    }
    if let Some(sink) = &summary.sink {
        let accuracy = if sink.received > 0 {
            100.0 * sink.correct as f64 / sink.received as f64
        } else {
            0.0
        };
        info!("   Results Received:     {}", sink.received);
        info!("   Matching Expected:    {} ({:.1}%)", sink.correct, accuracy);
        info!("   Low Confidence:       {}", sink.low_confidence);
    }
    info!("   Machines Reporting:   {}", latest);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => VibewatchConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VibewatchConfig::load(),
    };
    args.apply(&mut config);
    config
        .validate()
        .with_context(|| format!("Invalid configuration (file, {} or CLI flags)", CONFIG_ENV_VAR))?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  VIBEWATCH - Vibration Fault Classification");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "Machines: {} | Workers: {} | Rate: {} Hz | Batch: {} samples",
        config.source.machines, config.pipeline.workers, config.source.rate_hz, config.source.batch_size
    );

    // Models are required; there is no degraded mode
    let classifier = ModelStore::load(&config.models.dir)
        .with_context(|| format!("Failed to load models from {}", config.models.dir.display()))?;
    let classifier = Arc::new(classifier);

    // Graceful shutdown via Ctrl+C or duration
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, draining in-flight ticks...");
        shutdown_token.cancel();
    });
    if let Some(secs) = args.duration {
        let timer_token = cancel_token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            info!("Run duration of {}s elapsed, draining in-flight ticks...", secs);
            timer_token.cancel();
        });
    }

    let mut task_set: JoinSet<Result<TaskReport>> = JoinSet::new();

    let (channels, pipeline) = StreamPipeline::new(config.pipeline.clone(), classifier).spawn();
    task_set.spawn(async move {
        let stats = pipeline.join().await?;
        info!("{}", stats);
        Ok(TaskReport::Pipeline(stats))
    });

    let latest = LatestResults::from_secs(config.sink.stale_after_secs);
    let sink_store = latest.clone();
    let results = channels.results;
    task_set.spawn(async move { Ok(TaskReport::Sink(run_sink(results, sink_store).await)) });

    for i in 0..config.source.machines {
        let machine_id = MachineId(i + 1);
        let condition = FaultLabel::MODEL_LABELS[i as usize % FaultLabel::MODEL_LABELS.len()];
        let source = SyntheticSource::new(machine_id, condition, &config.source)?;
        info!(machine = %machine_id, condition = %source.condition(), "Starting producer");

        let ingest = channels.ingest.clone();
        let token = cancel_token.clone();
        task_set.spawn(async move {
            let sent = run_producer(source, ingest, token).await?;
            Ok(TaskReport::Producer { machine_id, sent })
        });
    }
    // Producers hold the only senders; the pipeline drains once they stop
    drop(channels.ingest);

    let summary = run_supervisor(&mut task_set, cancel_token).await?;

    let stale = latest.stale_machines_at(chrono::Utc::now()).await;
    if !stale.is_empty() {
        info!("Machines without a fresh result at shutdown: {:?}", stale);
    }
    log_final_statistics(&summary, latest.len().await);

    info!("");
    info!("✓ VIBEWATCH shutdown complete");
    Ok(())
}
