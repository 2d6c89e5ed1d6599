//! System-wide default constants.
//!
//! The algorithm constants in the first two sections are fixed by the input
//! shape the trained models expect. They are not exposed through the TOML
//! config.

// ============================================================================
// Window & Feature Layout (fixed)
// ============================================================================

/// Rolling window depth in batches.
pub const WINDOW_DEPTH: usize = 5;

/// FFT bins kept per axis (500 × 5).
pub const TRUNCATION_BINS: usize = 2_500;

/// Accelerometer sampling rate the models were trained at (Hz).
pub const SAMPLE_RATE_HZ: f64 = 20_000.0;

/// Number of accelerometer axes.
pub const AXIS_COUNT: usize = 3;

/// Statistical descriptors per axis.
pub const DESCRIPTOR_COUNT: usize = 9;

/// Length of the model input vector.
pub const FEATURE_COUNT: usize = DESCRIPTOR_COUNT * AXIS_COUNT;

// ============================================================================
// Model Store (fixed)
// ============================================================================

/// File names of the three ensemble members inside the model directory.
pub const SVM_MODEL_FILE: &str = "svm.json";
pub const KNN_MODEL_FILE: &str = "knn.json";
pub const GNB_MODEL_FILE: &str = "gnb.json";

// ============================================================================
// Pipeline
// ============================================================================

/// Processing workers (shards).
pub const DEFAULT_WORKERS: usize = 2;

/// Ingestion channel capacity (events). Producers block when full.
pub const DEFAULT_INGESTION_CAPACITY: usize = 256;

/// Per-worker dispatch channel capacity (events).
pub const DEFAULT_WORKER_QUEUE_CAPACITY: usize = 64;

/// Result channel capacity (results).
pub const DEFAULT_RESULT_CAPACITY: usize = 256;

/// Log a progress line every N batches per worker.
pub const PROGRESS_LOG_INTERVAL: u64 = 100;

// ============================================================================
// Simulation
// ============================================================================

/// Simulated machines.
pub const DEFAULT_MACHINES: u32 = 2;

/// Batches per second per machine.
pub const DEFAULT_SOURCE_RATE_HZ: f64 = 20.0;

/// Samples per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Shaft frequency of the synthetic signal (Hz).
pub const DEFAULT_BASE_FREQUENCY_HZ: f64 = 50.0;

/// Standard deviation of additive Gaussian noise (g).
pub const DEFAULT_NOISE_STD: f64 = 0.05;

// ============================================================================
// Sink
// ============================================================================

/// Age after which a machine's latest result counts as stale (seconds).
pub const DEFAULT_STALE_AFTER_SECS: u64 = 5;

/// Default model directory.
pub const DEFAULT_MODEL_DIR: &str = "models";
