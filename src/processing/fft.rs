//! FFT computation using rustfft
//!
//! One-sided magnitude spectrum of a real signal, scaled by the sample period
//! and truncated to the lowest bins the models were trained on.
//!
//! The transform length is the exact window length (no zero padding), so a
//! window of N samples yields N/2 + 1 bins before truncation.

use num_complex::Complex;
use rustfft::FftPlanner;

use super::ProcessingError;
use crate::config::defaults::{SAMPLE_RATE_HZ, TRUNCATION_BINS};

/// FFT front end with a cached planner.
///
/// Windows grow from one batch to the full depth during warm-up, so several
/// transform lengths are seen; the planner keeps one plan per length.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f64>,
    sample_rate: f64,
    truncation: usize,
}

impl SpectrumAnalyzer {
    /// Create an analyzer.
    ///
    /// # Arguments
    /// * `sample_rate` - Sampling rate in Hz
    /// * `truncation` - Maximum number of low-frequency bins to keep
    pub fn new(sample_rate: f64, truncation: usize) -> Result<Self, ProcessingError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ProcessingError::InvalidSamplingRate(sample_rate));
        }
        if truncation == 0 {
            return Err(ProcessingError::Fft("truncation length must be > 0".to_string()));
        }

        Ok(Self {
            planner: FftPlanner::new(),
            sample_rate,
            truncation,
        })
    }

    /// Compute `|X_k| · dt` for `k` in `0..min(truncation, N/2 + 1)`.
    pub fn magnitude_spectrum(&mut self, signal: &[f64]) -> Result<Vec<f64>, ProcessingError> {
        if signal.is_empty() {
            return Err(ProcessingError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }

        let n = signal.len();
        let fft = self.planner.plan_fft_forward(n);

        let mut buffer: Vec<Complex<f64>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buffer);

        let dt = 1.0 / self.sample_rate;
        let keep = self.bin_count(n);

        Ok(buffer.iter().take(keep).map(|c| c.norm() * dt).collect())
    }

    /// Bins returned for a window of `n` samples.
    pub fn bin_count(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (n / 2 + 1).min(self.truncation)
    }

    /// Frequency (Hz) of bin `k` for a window of `n` samples.
    pub fn bin_frequency(&self, k: usize, n: usize) -> f64 {
        k as f64 * self.sample_rate / n as f64
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn truncation(&self) -> usize {
        self.truncation
    }
}

impl Default for SpectrumAnalyzer {
    /// Analyzer at the training sample rate and truncation length.
    fn default() -> Self {
        Self {
            planner: FftPlanner::new(),
            sample_rate: SAMPLE_RATE_HZ,
            truncation: TRUNCATION_BINS,
        }
    }
}
