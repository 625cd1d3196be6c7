//! # Configuration Structures
//!
//! [`AppConfig`] is the single configuration object of the application. The
//! analysis client receives its [`AnalyzerConfig`] at construction; nothing
//! reads the API key from the environment after loading.
//!
//! ## Sources
//!
//! Later sources override earlier ones:
//!
//! 1. Built-in defaults ([`AppConfig::default`])
//! 2. `calorie.toml` in the working directory, if present
//! 3. `CALORIE_*` environment variables, nested with `__`
//!    (e.g. `CALORIE_ANALYZER__MODEL`)
//!
//! When no API key is set by any of those, `GEMINI_API_KEY` and then
//! `API_KEY` are consulted.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Default |
//! |-----------|------|-------|---------|
//! | `analyzer.api_key` | `String` | non-empty | none |
//! | `analyzer.model` | `String` | non-empty | `gemini-2.5-flash-preview-04-17` |
//! | `analyzer.endpoint` | `String` | http(s) URL | `https://generativelanguage.googleapis.com` |
//! | `analyzer.temperature` | `f32` | 0.0-2.0 | 0.2 |
//! | `analyzer.timeout_secs` | `u64` | > 0 | 60 |
//! | `access_policy` | `login_required` / `public` | | `login_required` |
//! | `data_dir` | path | | `.calorie` |
//!
//! ## Examples
//!
//! ```rust
//! use calorie_lens::config::AnalyzerConfig;
//!
//! let config = AnalyzerConfig::default().with_api_key("test-key");
//! assert!(config.validate().is_ok());
//! assert_eq!(config.credential().unwrap(), "test-key");
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{CalorieError, CalorieResult};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const CONFIG_FILE: &str = "calorie";
const ENV_PREFIX: &str = "CALORIE";
const FALLBACK_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Settings for the vision-model client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Secret credential for the model endpoint.
    ///
    /// Absence is a fatal configuration error, detected before any request.
    pub api_key: Option<String>,

    /// Model identifier, e.g. `gemini-2.5-flash-preview-04-17`.
    pub model: String,

    /// Base URL of the Generative Language API. Overridable for testing
    /// against a local server.
    pub endpoint: String,

    /// Sampling temperature. Kept low so repeated analyses of the same image
    /// agree.
    pub temperature: f32,

    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The configured API key.
    ///
    /// # Errors
    ///
    /// [`CalorieError::Config`] when the key is absent or blank.
    pub fn credential(&self) -> CalorieResult<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(CalorieError::missing_api_key)
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_ok()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Range-checks the non-secret settings.
    ///
    /// A missing API key is not a validation failure here; it is reported by
    /// [`Self::credential`] so that it can be shown as a persistent error
    /// while the rest of the application keeps working.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name must not be empty".to_string());
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!(
                "Endpoint must be an http(s) URL (value: {})",
                self.endpoint
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 2.0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0 seconds".to_string());
        }
        Ok(())
    }
}

/// Who may use the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Every analysis requires a signed-in user.
    #[default]
    LoginRequired,
    /// No sign-in needed.
    Public,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analyzer: AnalyzerConfig,
    pub access_policy: AccessPolicy,
    /// Directory for the account store and the view counter.
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            access_policy: AccessPolicy::default(),
            data_dir: PathBuf::from(".calorie"),
        }
    }
}

impl AppConfig {
    /// Loads from `calorie.toml` (optional) and the process environment.
    pub fn load() -> CalorieResult<Self> {
        Self::load_from(None, None)
    }

    /// Loads from an explicit config file and environment map.
    ///
    /// `file` replaces the default `calorie.toml` lookup and must exist when
    /// given. `env` replaces the process environment; `None` reads the real
    /// one.
    pub fn load_from(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> CalorieResult<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env.clone()),
            )
            .build()
            .map_err(|e| CalorieError::config("settings", e.to_string()))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| CalorieError::config("settings", e.to_string()))?;

        if !config.analyzer.has_credential() {
            config.analyzer.api_key = FALLBACK_KEY_VARS.iter().find_map(|name| {
                let value = match &env {
                    Some(map) => map.get(*name).cloned(),
                    None => std::env::var(name).ok(),
                };
                value.filter(|v| !v.trim().is_empty())
            });
        }

        config
            .analyzer
            .validate()
            .map_err(|reason| CalorieError::config("analyzer", reason))?;
        Ok(config)
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join("accounts.json")
    }

    pub fn counter_path(&self) -> PathBuf {
        self.data_dir.join("views.json")
    }
}
