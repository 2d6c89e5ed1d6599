//! VIBEWATCH configuration - pipeline sizing, simulation and sink settings
//!
//! Each struct implements `Default` with the values in `config::defaults`,
//! so a missing file or section behaves exactly like the built-in setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable pointing at a TOML config file.
pub const CONFIG_ENV_VAR: &str = "VIBEWATCH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "vibewatch.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `VibewatchConfig::load()` which searches:
/// 1. `$VIBEWATCH_CONFIG`
/// 2. `./vibewatch.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VibewatchConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub models: ModelConfig,

    #[serde(default)]
    pub sink: SinkConfig,
}

impl VibewatchConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only produce warnings.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate sizing and simulation values.
    ///
    /// All violations are collected so the operator sees them at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let p = &self.pipeline;
        if p.workers == 0 {
            errors.push("pipeline.workers must be at least 1".to_string());
        }
        for (name, value) in [
            ("pipeline.ingestion_capacity", p.ingestion_capacity),
            ("pipeline.worker_queue_capacity", p.worker_queue_capacity),
            ("pipeline.result_capacity", p.result_capacity),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be > 0 (bounded channels need capacity)"));
            }
        }

        let s = &self.source;
        if s.machines == 0 {
            errors.push("source.machines must be at least 1".to_string());
        }
        if !(s.rate_hz.is_finite() && s.rate_hz > 0.0) {
            errors.push(format!("source.rate_hz ({}) must be a positive number", s.rate_hz));
        }
        if s.batch_size == 0 {
            errors.push("source.batch_size must be > 0".to_string());
        }
        let nyquist = defaults::SAMPLE_RATE_HZ / 2.0;
        if !(s.base_frequency_hz > 0.0 && s.base_frequency_hz < nyquist) {
            errors.push(format!(
                "source.base_frequency_hz ({}) must be in (0, {nyquist})",
                s.base_frequency_hz
            ));
        }
        if !(s.noise_std.is_finite() && s.noise_std >= 0.0) {
            errors.push(format!("source.noise_std ({}) must be >= 0", s.noise_std));
        }

        if self.models.dir.as_os_str().is_empty() {
            errors.push("models.dir must not be empty".to_string());
        }

        if self.sink.stale_after_secs == 0 {
            errors.push("sink.stale_after_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// Channel and worker sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Processing workers; machines are sharded across them
    pub workers: usize,
    /// Bounded ingestion queue (producers block when full)
    pub ingestion_capacity: usize,
    /// Bounded queue between the dispatcher and each worker
    pub worker_queue_capacity: usize,
    /// Bounded result queue drained by the sink
    pub result_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: defaults::DEFAULT_WORKERS,
            ingestion_capacity: defaults::DEFAULT_INGESTION_CAPACITY,
            worker_queue_capacity: defaults::DEFAULT_WORKER_QUEUE_CAPACITY,
            result_capacity: defaults::DEFAULT_RESULT_CAPACITY,
        }
    }
}

/// Synthetic sample source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Number of simulated machines (ids 1..=machines)
    pub machines: u32,
    /// Batches per second per machine
    pub rate_hz: f64,
    /// Samples per batch
    pub batch_size: usize,
    /// Shaft frequency of the synthetic signal
    pub base_frequency_hz: f64,
    /// Additive Gaussian noise
    pub noise_std: f64,
    /// Seed for reproducible runs (entropy when absent)
    pub seed: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            machines: defaults::DEFAULT_MACHINES,
            rate_hz: defaults::DEFAULT_SOURCE_RATE_HZ,
            batch_size: defaults::DEFAULT_BATCH_SIZE,
            base_frequency_hz: defaults::DEFAULT_BASE_FREQUENCY_HZ,
            noise_std: defaults::DEFAULT_NOISE_STD,
            seed: None,
        }
    }
}

/// Where the three predictors are loaded from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(defaults::DEFAULT_MODEL_DIR),
        }
    }
}

/// Result sink settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SinkConfig {
    pub stale_after_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: defaults::DEFAULT_STALE_AFTER_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VibewatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.workers, defaults::DEFAULT_WORKERS);
        assert_eq!(config.source.batch_size, 100);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = VibewatchConfig::from_toml_str(
            r#"
            [pipeline]
            workers = 4

            [source]
            machines = 10
            seed = 7
            "#,
        )
        .expect("valid config");
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.result_capacity, defaults::DEFAULT_RESULT_CAPACITY);
        assert_eq!(config.source.machines, 10);
        assert_eq!(config.source.seed, Some(7));
        assert_eq!(config.sink, SinkConfig::default());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = VibewatchConfig::default();
        config.pipeline.workers = 0;
        config.pipeline.ingestion_capacity = 0;
        config.source.rate_hz = -1.0;
        config.source.base_frequency_hz = 15_000.0;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 4, "errors: {errors:?}");
                assert!(errors.iter().any(|e| e.contains("pipeline.workers")));
                assert!(errors.iter().any(|e| e.contains("base_frequency_hz")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = VibewatchConfig::default();
        let text = config.to_toml().expect("serialize");
        let back = VibewatchConfig::from_toml_str(&text).expect("parse");
        assert_eq!(back, config);
    }

    #[test]
    fn test_load_from_file_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[pipeline\nworkers = 2").expect("write");
        let err = VibewatchConfig::load_from_file(&path).expect_err("must fail");
        assert!(err.to_string().contains("broken.toml"));
    }
}
