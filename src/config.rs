//! Scanner configuration
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. optional TOML file
//! 3. environment variables prefixed `SCANCHECK_`; nested keys use `__`
//!    (`SCANCHECK_ISSUER__DOMAINS=a.com,b.com`)

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use scancheck_core::{CodeDecoder, IssuerProfile, Localizer, TrackerConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ENV_PREFIX: &str = "SCANCHECK";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Http,
    Stub,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Verification service root, e.g. `https://verify.example.com/api`
    pub base_url: Option<String>,
    pub verify_path: String,
    /// Bearer token; `env:NAME` reads it from the environment
    pub auth_token: Option<String>,
    pub timeout_ms: u64,
    /// Total attempts per verification, the first included
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub counterfeit_threshold: u64,
    pub counterfeit_window_days: u32,
    pub locale: String,
    pub retailer_id: Option<String>,
    /// Sent with scan reports when `report_scans` is on
    pub user_id: Option<String>,
    pub report_scans: bool,
    pub backend: BackendKind,
    pub strict_unknown_formats: bool,
    pub max_tracked_ids: usize,
    pub max_history_per_id: usize,
    pub issuer: IssuerProfile,
    /// Scans processed at once by the CLI
    pub concurrency: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            verify_path: "/verify".to_string(),
            auth_token: None,
            timeout_ms: 30_000,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
            counterfeit_threshold: 10,
            counterfeit_window_days: 365,
            locale: "en".to_string(),
            retailer_id: None,
            user_id: None,
            report_scans: false,
            backend: BackendKind::Http,
            strict_unknown_formats: false,
            max_tracked_ids: 10_000,
            max_history_per_id: 1_000,
            issuer: IssuerProfile::default(),
            concurrency: 4,
        }
    }
}

impl ScannerConfig {
    /// Load from an optional TOML file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`ScannerConfig::load`], reading variables from `env` instead
    /// of the process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("issuer.domains")
                .with_list_parse_key("issuer.prefixes")
                .source(env),
        );

        let config: ScannerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Invalid(message.to_string()));
        if self.counterfeit_threshold == 0 {
            return invalid("counterfeit_threshold must be at least 1");
        }
        if self.counterfeit_window_days == 0 {
            return invalid("counterfeit_window_days must be at least 1");
        }
        if self.retry_attempts == 0 {
            return invalid("retry_attempts must be at least 1");
        }
        if self.timeout_ms == 0 {
            return invalid("timeout_ms must be greater than 0");
        }
        if self.concurrency == 0 {
            return invalid("concurrency must be at least 1");
        }
        if self.max_tracked_ids == 0 || self.max_history_per_id == 0 {
            return invalid("tracker bounds must be at least 1");
        }
        if self.issuer.domains.is_empty() && self.issuer.prefixes.is_empty() {
            return invalid("issuer needs at least one domain or prefix");
        }
        if let Some(url) = self.base_url.as_deref() {
            if scancheck_core::decoder::parse_http_url(url).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "base_url is not an http(s) URL: {}",
                    url
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            max_history_per_id: self.max_history_per_id,
            max_tracked_ids: self.max_tracked_ids,
            ..TrackerConfig::default()
        }
        .with_threshold(self.counterfeit_threshold)
        .with_window_days(self.counterfeit_window_days)
    }

    pub fn decoder(&self) -> CodeDecoder {
        CodeDecoder::new(self.issuer.clone()).with_strict_unknown_formats(self.strict_unknown_formats)
    }

    pub fn localizer(&self) -> Localizer {
        Localizer::new(&self.locale)
    }
}
