//! Sample source abstraction for per-machine vibration ingestion.
//!
//! Provides a unified trait for producing sample batches:
//! synthetic signals shaped per fault condition (demo and tests) and
//! replay of pre-built batches held in memory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::PipelineError;
use crate::config::defaults::SAMPLE_RATE_HZ;
use crate::config::SourceConfig;
use crate::types::{FaultLabel, MachineId, RawBatch, RawSample, SampleEvent};

/// Events produced by a sample source.
#[derive(Debug)]
pub enum SourceEvent {
    /// One batch for one machine.
    Batch(SampleEvent),
    /// Source has nothing more to produce.
    Eof,
}

/// Trait abstracting where sample batches come from.
///
/// Implementations handle pacing internally. [`run_producer`] calls
/// [`next_event`](SampleSource::next_event) in a select! with cancellation.
#[async_trait]
pub trait SampleSource: Send + 'static {
    async fn next_event(&mut self) -> Result<SourceEvent>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// Producer Task
// ============================================================================

/// Forward a source into the ingestion channel until EOF or cancellation.
///
/// `send().await` blocks while the channel is full; nothing is dropped.
/// Returns the number of batches sent.
pub async fn run_producer<S: SampleSource>(
    mut source: S,
    ingest: mpsc::Sender<SampleEvent>,
    cancel: CancellationToken,
) -> Result<u64> {
    let mut sent = 0u64;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(source = source.source_name(), sent, "[Producer] Shutdown signal received");
                break;
            }
            result = source.next_event() => match result? {
                SourceEvent::Batch(event) => event,
                SourceEvent::Eof => {
                    info!(source = source.source_name(), sent, "[Producer] Source reached end");
                    break;
                }
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            delivered = ingest.send(event) => {
                delivered.map_err(|_| PipelineError::ChannelClosed("ingestion"))?;
                sent += 1;
            }
        }
    }

    Ok(sent)
}

// ============================================================================
// Synthetic Source
// ============================================================================

/// Ball-pass frequency as a multiple of shaft speed.
const BEARING_DEFECT_ORDER: f64 = 3.57;
/// Structural resonance excited by bearing impacts (Hz).
const BEARING_RESONANCE_HZ: f64 = 3_000.0;
/// Impact ring-down rate (1/s).
const BEARING_DECAY_PER_S: f64 = 1_500.0;

/// Triaxial sinusoidal generator for one machine in a fixed condition.
///
/// - normal: weak 1X on every axis
/// - unbalance: strong radial 1X in quadrature on x/y
/// - misalignment: 2X harmonic plus strong axial (z) 1X
/// - bearing fault: decaying resonance bursts at the defect frequency
pub struct SyntheticSource {
    machine_id: MachineId,
    condition: FaultLabel,
    batch_size: usize,
    base_frequency_hz: f64,
    noise: Normal<f64>,
    rng: StdRng,
    next_sample: u64,
    period: Option<Duration>,
    ticker: Option<Interval>,
    remaining: Option<u64>,
    name: String,
}

impl SyntheticSource {
    pub fn new(machine_id: MachineId, condition: FaultLabel, config: &SourceConfig) -> Result<Self> {
        anyhow::ensure!(
            config.noise_std.is_finite() && config.noise_std >= 0.0,
            "noise_std must be finite and >= 0, got {}",
            config.noise_std
        );
        let noise = Normal::new(0.0, config.noise_std)
            .with_context(|| format!("Invalid noise_std {}", config.noise_std))?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(u64::from(machine_id.0))),
            None => StdRng::from_entropy(),
        };
        let period = (config.rate_hz > 0.0).then(|| Duration::from_secs_f64(1.0 / config.rate_hz));

        Ok(Self {
            machine_id,
            condition,
            batch_size: config.batch_size,
            base_frequency_hz: config.base_frequency_hz,
            noise,
            rng,
            next_sample: 0,
            period,
            ticker: None,
            remaining: None,
            name: format!("synthetic-{machine_id}"),
        })
    }

    /// Stop after `batches` batches instead of running forever.
    pub fn with_limit(mut self, batches: u64) -> Self {
        self.remaining = Some(batches);
        self
    }

    /// Produce batches as fast as the channel accepts them.
    pub fn unpaced(mut self) -> Self {
        self.period = None;
        self.ticker = None;
        self
    }

    pub fn condition(&self) -> FaultLabel {
        self.condition
    }

    /// Next `batch_size` samples, continuing the time base of the previous batch.
    pub fn generate_batch(&mut self) -> RawBatch {
        let mut batch = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            let t = self.next_sample as f64 / SAMPLE_RATE_HZ;
            self.next_sample += 1;
            let (x, y, z) = self.clean_signal(t);
            batch.push(RawSample::new(
                t,
                x + self.noise.sample(&mut self.rng),
                y + self.noise.sample(&mut self.rng),
                z + self.noise.sample(&mut self.rng),
            ));
        }
        batch
    }

    fn clean_signal(&self, t: f64) -> (f64, f64, f64) {
        let w = 2.0 * PI * self.base_frequency_hz * t;
        match self.condition {
            FaultLabel::Unbalance => (w.sin(), w.cos(), 0.1 * w.sin()),
            FaultLabel::Misalignment => (
                0.4 * w.sin() + 0.6 * (2.0 * w).sin(),
                0.4 * w.cos() + 0.5 * (2.0 * w).cos(),
                0.7 * w.sin() + 0.3 * (2.0 * w).sin(),
            ),
            FaultLabel::BearingFault => {
                let defect_hz = BEARING_DEFECT_ORDER * self.base_frequency_hz;
                let since_impact = (t * defect_hz).fract() / defect_hz;
                let ring = (-BEARING_DECAY_PER_S * since_impact).exp()
                    * (2.0 * PI * BEARING_RESONANCE_HZ * t).sin();
                (
                    0.2 * w.sin() + 0.8 * ring,
                    0.2 * w.cos() + 0.6 * ring,
                    0.05 * w.sin() + 0.3 * ring,
                )
            }
            FaultLabel::Normal | FaultLabel::Suspicious => {
                (0.2 * w.sin(), 0.2 * w.cos(), 0.05 * w.sin())
            }
        }
    }
}

#[async_trait]
impl SampleSource for SyntheticSource {
    async fn next_event(&mut self) -> Result<SourceEvent> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(SourceEvent::Eof);
            }
            *remaining -= 1;
        }

        if let Some(period) = self.period {
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                interval
            });
            ticker.tick().await;
        }

        Ok(SourceEvent::Batch(SampleEvent {
            machine_id: self.machine_id,
            batch: self.generate_batch(),
            expected_label: self.condition,
        }))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Replay Source
// ============================================================================

/// Replays pre-built events with an optional inter-batch delay.
pub struct ReplaySource {
    events: VecDeque<SampleEvent>,
    delay: Duration,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn new(events: Vec<SampleEvent>) -> Self {
        Self {
            events: events.into(),
            delay: Duration::ZERO,
            yielded_first: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl SampleSource for ReplaySource {
    async fn next_event(&mut self) -> Result<SourceEvent> {
        if self.yielded_first && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.events.pop_front() {
            Some(event) => {
                self.yielded_first = true;
                Ok(SourceEvent::Batch(event))
            }
            None => Ok(SourceEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}
