//! Signal processing module - spectrum and feature extraction for vibration windows

mod features;
mod fft;

pub use features::{descriptors, normalize_shared, shared_range, FeatureExtractor};
pub use fft::SpectrumAnalyzer;

use thiserror::Error;

/// Errors in signal processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Insufficient data: need {needed}, have {available}")]
    InsufficientData { needed: usize, available: usize },

    /// Every value of the window spectrum is identical, so min-max scaling
    /// has no range. The extractor degrades this to all-zero features.
    #[error("Degenerate range: all spectrum values equal {value}")]
    DegenerateRange { value: f64 },

    #[error("FFT error: {0}")]
    Fft(String),

    #[error("Invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),
}

impl ProcessingError {
    /// Whether a tick hitting this error should simply be skipped.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProcessingError::InsufficientData { .. } | ProcessingError::DegenerateRange { .. }
        )
    }
}
