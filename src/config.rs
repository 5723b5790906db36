// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact admission service.
//!
//! Every threshold the pipeline applies lives here as a named value.
//! Values are read from an optional JSON file and then overridden by
//! environment variables (see [`Config::load`]).

use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the contact admission service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Take the source address from the first `X-Forwarded-For` entry
    /// instead of the peer address (default: false)
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// Per-address rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Structural validation bounds
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Heuristic spam filter
    #[serde(default)]
    pub spam: SpamConfig,

    /// Per-email volume guard
    #[serde(default)]
    pub duplicate: DuplicateConfig,

    /// Submission store
    #[serde(default)]
    pub store: StoreConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Response language
    #[serde(default)]
    pub locale: LocaleConfig,
}

/// What to do when a backing store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the request and log the fault.
    Open,
    /// Reject the request as a server error.
    #[default]
    Closed,
}

/// Sliding-window rate limiting per source address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per address inside one window (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Behaviour when the rate-limit store fails (default: closed)
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Interval between eviction sweeps in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Field bounds applied by the structural validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_name_min")]
    pub name_min: usize,
    #[serde(default = "default_name_max")]
    pub name_max: usize,
    #[serde(default = "default_email_min")]
    pub email_min: usize,
    #[serde(default = "default_email_max")]
    pub email_max: usize,
    #[serde(default = "default_company_max")]
    pub company_max: usize,
    #[serde(default = "default_message_min")]
    pub message_min: usize,
    #[serde(default = "default_message_max")]
    pub message_max: usize,

    /// Oldest accepted form render time, in seconds before now (default: 3600)
    #[serde(default = "default_max_form_age_secs")]
    pub max_form_age_secs: u64,
}

/// Heuristic spam filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamConfig {
    /// Minimum time between form render and submission (default: 2000 ms)
    #[serde(default = "default_min_submit_ms")]
    pub min_submit_ms: u64,

    /// Substrings that mark a message as spam, matched case-insensitively
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Reject messages containing `scheme://` (default: true)
    #[serde(default = "default_true")]
    pub block_urls: bool,

    /// Reject messages containing HTML tags (default: true)
    #[serde(default = "default_true")]
    pub block_html: bool,
}

/// Per-email volume guard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateConfig {
    /// Accepted submissions allowed per email in the lookback (default: 3)
    #[serde(default = "default_max_per_email")]
    pub max_per_email: u64,

    /// Lookback in hours (default: 24)
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
}

/// Submission store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `memory` or a path to a JSON Lines file (default: memory)
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Upper bound on a single store call in milliseconds (default: 5000)
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

/// Response language configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// Used when `Accept-Language` names no supported locale (default: ar-AE)
    #[serde(default)]
    pub default: Locale,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_name_min() -> usize {
    2
}

fn default_name_max() -> usize {
    50
}

fn default_email_min() -> usize {
    5
}

fn default_email_max() -> usize {
    100
}

fn default_company_max() -> usize {
    100
}

fn default_message_min() -> usize {
    10
}

fn default_message_max() -> usize {
    1000
}

fn default_max_form_age_secs() -> u64 {
    3600
}

fn default_min_submit_ms() -> u64 {
    2000
}

fn default_keywords() -> Vec<String> {
    ["[url=", "[link=", "www.", "viagra", "casino"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_per_email() -> u64 {
    3
}

fn default_lookback_hours() -> i64 {
    24
}

fn default_store_path() -> String {
    "memory".to_string()
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            trust_forwarded_for: false,
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
            spam: SpamConfig::default(),
            duplicate: DuplicateConfig::default(),
            store: StoreConfig::default(),
            metrics: MetricsConfig::default(),
            locale: LocaleConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            failure_policy: FailurePolicy::default(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            name_min: default_name_min(),
            name_max: default_name_max(),
            email_min: default_email_min(),
            email_max: default_email_max(),
            company_max: default_company_max(),
            message_min: default_message_min(),
            message_max: default_message_max(),
            max_form_age_secs: default_max_form_age_secs(),
        }
    }
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            min_submit_ms: default_min_submit_ms(),
            keywords: default_keywords(),
            block_urls: default_true(),
            block_html: default_true(),
        }
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            max_per_email: default_max_per_email(),
            lookback_hours: default_lookback_hours(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

/// Longest window, form age or lookback accepted from configuration.
pub const MAX_SPAN_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Clamp to `MAX_SPAN_SECS` so date arithmetic cannot overflow.
fn span(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_SPAN_SECS) as i64)
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Window length for date arithmetic.
    pub fn window(&self) -> chrono::Duration {
        span(self.window_secs)
    }

    /// Get the cleanup sweep interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl ValidationConfig {
    pub fn max_form_age(&self) -> chrono::Duration {
        span(self.max_form_age_secs)
    }
}

impl DuplicateConfig {
    pub fn lookback(&self) -> chrono::Duration {
        span((self.lookback_hours.max(0) as u64).saturating_mul(3600))
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Error loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl Config {
    /// Load configuration: the JSON file named by `CONFIG_FILE` if set,
    /// then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot apply.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn within(key: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    key,
                    reason: format!("{} is outside {}..={}", value, min, max),
                })
            }
        }

        within(
            "rate_limit.max_requests",
            u64::from(self.rate_limit.max_requests),
            1,
            u64::from(u32::MAX),
        )?;
        within("rate_limit.window_secs", self.rate_limit.window_secs, 1, MAX_SPAN_SECS)?;
        within(
            "validation.max_form_age_secs",
            self.validation.max_form_age_secs,
            1,
            MAX_SPAN_SECS,
        )?;
        within("spam.min_submit_ms", self.spam.min_submit_ms, 0, MAX_SPAN_SECS * 1000)?;
        within(
            "duplicate.lookback_hours",
            u64::try_from(self.duplicate.lookback_hours).unwrap_or(0),
            1,
            MAX_SPAN_SECS / 3600,
        )?;
        within("store.timeout_ms", self.store.timeout_ms, 1, MAX_SPAN_SECS * 1000)?;

        let v = &self.validation;
        for (key, min, max) in [
            ("validation.name_min", v.name_min, v.name_max),
            ("validation.email_min", v.email_min, v.email_max),
            ("validation.message_min", v.message_min, v.message_max),
        ] {
            if min > max {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("minimum {} exceeds maximum {}", min, max),
                });
            }
        }
        Ok(())
    }

    /// Parse a JSON configuration file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply environment overrides through `lookup`. Unparseable values
    /// are ignored and the current value is kept.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
            raw.and_then(|v| v.trim().parse().ok())
        }

        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(v) = parsed(lookup("TRUST_FORWARDED_FOR")) {
            self.trust_forwarded_for = v;
        }
        if let Some(v) = parsed(lookup("RATE_LIMIT_MAX")) {
            self.rate_limit.max_requests = v;
        }
        if let Some(v) = parsed(lookup("RATE_LIMIT_WINDOW_SECS")) {
            self.rate_limit.window_secs = v;
        }
        if let Some(v) = lookup("RATE_LIMIT_FAILURE_POLICY") {
            match v.trim().to_lowercase().as_str() {
                "open" => self.rate_limit.failure_policy = FailurePolicy::Open,
                "closed" => self.rate_limit.failure_policy = FailurePolicy::Closed,
                _ => {}
            }
        }
        if let Some(v) = parsed(lookup("MIN_SUBMIT_MS")) {
            self.spam.min_submit_ms = v;
        }
        if let Some(v) = lookup("SPAM_KEYWORDS") {
            self.spam.keywords = v
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }
        if let Some(v) = parsed(lookup("MAX_PER_EMAIL")) {
            self.duplicate.max_per_email = v;
        }
        if let Some(path) = lookup("STORE_PATH") {
            self.store.path = path;
        }
        if let Some(v) = parsed(lookup("STORE_TIMEOUT_MS")) {
            self.store.timeout_ms = v;
        }
        if let Some(v) = parsed(lookup("METRICS_ENABLED")) {
            self.metrics.enabled = v;
        }
        if let Some(locale) = lookup("DEFAULT_LOCALE").and_then(|v| Locale::from_tag(&v)) {
            self.locale.default = locale;
        }
    }
}
