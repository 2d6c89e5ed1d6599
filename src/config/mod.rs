//! Runtime Configuration Module
//!
//! Operator-tunable settings for the pipeline, the simulated sources, the
//! model store and the result sink, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `VIBEWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `vibewatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The window depth, FFT truncation length and feature layout are fixed by
//! the trained models and live in [`defaults`] only.

mod vibewatch_config;
pub mod defaults;
pub mod validation;

pub use vibewatch_config::*;
