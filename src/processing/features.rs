//! Window → FeatureVector transform
//!
//! 1. Split the window into x / y / z columns (time is dropped)
//! 2. Truncated magnitude spectrum per axis
//! 3. Min-max scaling with ONE range shared by all three axes, so the axes
//!    stay comparable to each other
//! 4. Nine descriptors per axis, laid out descriptor-major
//!
//! Zero-denominator policy: shape and impulse factor divide by the mean
//! absolute value and come out `NaN` on an all-zero axis. That sentinel is
//! passed through untouched; the predictors skip NaN inputs. Crest factor,
//! kurtosis and skewness report 0.0 when there is no variation. A non-finite
//! input sample is not "no variation": it surfaces as NaN in every
//! descriptor of its axis.

use statrs::statistics::Statistics;
use tracing::debug;

use super::{ProcessingError, SpectrumAnalyzer};
use crate::config::defaults::{AXIS_COUNT, DESCRIPTOR_COUNT};
use crate::types::{Descriptor, FeatureVector, RawSample};

/// Second central moments at or below this are treated as "no variation".
/// Values are normalized to [0, 1] before this is applied.
const ZERO_VARIANCE_EPS: f64 = 1e-24;

/// Stateful only through the FFT plan cache; one per worker.
pub struct FeatureExtractor {
    analyzer: SpectrumAnalyzer,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            analyzer: SpectrumAnalyzer::default(),
        }
    }

    /// Build with a custom analyzer (tests with short truncation lengths).
    pub fn with_analyzer(analyzer: SpectrumAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Extract the 27 features of a window.
    ///
    /// Fails only with `InsufficientData` on an empty window. A flat window
    /// is not an error: every normalized value becomes 0.0.
    pub fn extract(&mut self, samples: &[RawSample]) -> Result<FeatureVector, ProcessingError> {
        if samples.is_empty() {
            return Err(ProcessingError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }

        let x: Vec<f64> = samples.iter().map(|s| s.x).collect();
        let y: Vec<f64> = samples.iter().map(|s| s.y).collect();
        let z: Vec<f64> = samples.iter().map(|s| s.z).collect();

        let mut spectra = [
            self.analyzer.magnitude_spectrum(&x)?,
            self.analyzer.magnitude_spectrum(&y)?,
            self.analyzer.magnitude_spectrum(&z)?,
        ];

        if let Err(e) = normalize_shared(&mut spectra) {
            debug!(samples = samples.len(), error = %e, "Flat window spectrum, features degrade to zero");
        }

        let mut rows = [[0.0; DESCRIPTOR_COUNT]; AXIS_COUNT];
        for (row, spectrum) in rows.iter_mut().zip(spectra.iter()) {
            *row = descriptors(spectrum);
        }

        Ok(FeatureVector::from_axis_rows(&rows))
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Min and max over the union of all spectra.
///
/// Returns `DegenerateRange` when they are equal (or nothing is finite).
pub fn shared_range(spectra: &[Vec<f64>]) -> Result<(f64, f64), ProcessingError> {
    let (min, max) = spectra
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if !min.is_finite() {
        return Err(ProcessingError::DegenerateRange { value: f64::NAN });
    }
    if max <= min {
        return Err(ProcessingError::DegenerateRange { value: min });
    }
    Ok((min, max))
}

/// Scale every spectrum in place to [0, 1] with the shared range.
///
/// On a degenerate range every value is set to 0.0 and the error is
/// returned so the caller can log it.
pub fn normalize_shared(spectra: &mut [Vec<f64>]) -> Result<(), ProcessingError> {
    match shared_range(spectra) {
        Ok((min, max)) => {
            let span = max - min;
            for v in spectra.iter_mut().flatten() {
                *v = (*v - min) / span;
            }
            Ok(())
        }
        Err(e) => {
            for v in spectra.iter_mut().flatten() {
                *v = 0.0;
            }
            Err(e)
        }
    }
}

/// The nine descriptors of one axis, in `Descriptor::ALL` order.
///
/// Population definitions throughout (std with ddof 0, excess kurtosis
/// `m4 / m2² − 3`, skewness `m3 / m2^1.5`). Skewness is the plain moment
/// ratio g1, not the bias-corrected G1 that pandas' `skew` reports, so it
/// differs from models trained on pandas output by the `sqrt(n(n-1))/(n-2)`
/// factor (negligible at window sizes).
///
/// Non-finite samples propagate: a NaN anywhere in `values` yields NaN
/// kurtosis and skewness rather than the zero used for a flat signal.
pub fn descriptors(values: &[f64]) -> [f64; DESCRIPTOR_COUNT] {
    let n = values.len() as f64;

    let mean = values.iter().mean();
    let variance = values.iter().population_variance();
    let std = variance.sqrt();
    let max = Statistics::max(values.iter());
    let min = Statistics::min(values.iter());

    let rms = (values.iter().map(|v| v * v).sum::<f64>() / n).sqrt();
    let abs_mean = values.iter().map(|v| v.abs()).sum::<f64>() / n;

    let (m3, m4) = values.iter().fold((0.0, 0.0), |(m3, m4), &v| {
        let d = v - mean;
        let d2 = d * d;
        (m3 + d2 * d, m4 + d2 * d2)
    });
    let (m3, m4) = (m3 / n, m4 / n);
    let has_variation = variance > ZERO_VARIANCE_EPS || !variance.is_finite();

    let mut out = [0.0; DESCRIPTOR_COUNT];
    out[Descriptor::Mean.index()] = mean;
    out[Descriptor::Std.index()] = std;
    // 0/0 on an all-zero axis: NaN sentinel, intentionally not coerced
    out[Descriptor::ShapeFactor.index()] = rms / abs_mean;
    out[Descriptor::Rms.index()] = rms;
    out[Descriptor::ImpulseFactor.index()] = max / abs_mean;
    out[Descriptor::PeakToPeak.index()] = max - min;
    out[Descriptor::Kurtosis.index()] = if has_variation {
        m4 / (variance * variance) - 3.0
    } else {
        0.0
    };
    out[Descriptor::CrestFactor.index()] = if rms > 0.0 || rms.is_nan() {
        max / rms
    } else {
        0.0
    };
    out[Descriptor::Skewness.index()] = if has_variation {
        m3 / variance.powf(1.5)
    } else {
        0.0
    };
    out
}
