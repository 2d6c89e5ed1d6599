//! VibeWatch: Streaming Vibration Fault Classification
//!
//! Per-machine triaxial vibration streams are windowed, reduced to 27
//! frequency-domain statistics and classified by a three-model vote.
//!
//! ## Architecture
//!
//! - **Processing**: FFT magnitude spectrum, shared normalization, descriptors
//! - **Ensemble**: SVM / k-NN / Gaussian NB with 2-of-3 majority vote
//! - **Pipeline**: sharded workers owning per-machine windows, fed by
//!   bounded channels and drained into a latest-result sink

pub mod config;
pub mod ensemble;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use config::VibewatchConfig;

pub use types::{
    Axis, ClassificationResult, Confidence, Descriptor, FaultLabel, FeatureSummary,
    FeatureVector, MachineId, ModelVotes, RawBatch, RawSample, SampleEvent,
};

pub use processing::{FeatureExtractor, ProcessingError, SpectrumAnalyzer};

pub use ensemble::{EnsembleClassifier, ModelError, ModelStore, Predictor};

pub use pipeline::{
    LatestResults, PipelineError, PipelineStats, StreamPipeline, SyntheticSource, WindowBuffer,
};
