//! # Configuration Module
//!
//! Settings for the analysis client, the access policy and local data
//! storage, loaded from defaults, an optional `calorie.toml` and `CALORIE_*`
//! environment variables.

pub mod config;

pub use config::{AccessPolicy, AnalyzerConfig, AppConfig};
