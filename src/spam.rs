// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Heuristic spam filter.
//!
//! Every check is independent and any single trigger classifies the
//! submission as spam. There is no scoring.
//!
//! - Honeypot field must be empty
//! - Form must have been visible for at least `min_submit_ms`
//! - Message must not contain a URL (`scheme://`)
//! - Message must not contain HTML tags
//! - Message must not contain a configured keyword (case-insensitive)

use crate::config::SpamConfig;
use crate::validator::ContactFields;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::debug;

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[a-z][a-z0-9+.\-]*://").expect("url pattern is valid"));

static HTML_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<[a-z][\s\S]*>").expect("html pattern is valid"));

/// Why a submission was classified as spam. Logged, never returned to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpamReason {
    HoneypotFilled,
    SubmittedTooFast { elapsed_ms: i64 },
    ContainsUrl,
    ContainsHtml,
    Keyword(String),
}

impl fmt::Display for SpamReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HoneypotFilled => write!(f, "honeypot field filled"),
            Self::SubmittedTooFast { elapsed_ms } => {
                write!(f, "submitted {}ms after render", elapsed_ms)
            }
            Self::ContainsUrl => write!(f, "message contains a URL"),
            Self::ContainsHtml => write!(f, "message contains HTML"),
            Self::Keyword(k) => write!(f, "message contains keyword {:?}", k),
        }
    }
}

/// Spam filter verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpamVerdict {
    Clean,
    Spam(SpamReason),
}

impl SpamVerdict {
    pub fn is_clean(&self) -> bool {
        matches!(self, SpamVerdict::Clean)
    }
}

/// Content and timing heuristics for contact submissions.
#[derive(Debug, Clone)]
pub struct SpamFilter {
    config: SpamConfig,
    /// Lowercased copy of `config.keywords`
    keywords: Vec<String>,
}

impl SpamFilter {
    pub fn new(config: SpamConfig) -> Self {
        let keywords = config
            .keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| k.to_lowercase())
            .collect();
        Self { config, keywords }
    }

    /// Inspect validated fields submitted at `now`.
    pub fn inspect(
        &self,
        fields: &ContactFields,
        honeypot: Option<&str>,
        now: DateTime<Utc>,
    ) -> SpamVerdict {
        // Validation already rejects a filled honeypot
        if honeypot.is_some_and(|h| !h.is_empty()) {
            return self.flag(SpamReason::HoneypotFilled);
        }

        let elapsed_ms = (now - fields.form_rendered_at).num_milliseconds();
        if elapsed_ms < self.config.min_submit_ms as i64 {
            return self.flag(SpamReason::SubmittedTooFast { elapsed_ms });
        }

        match self.inspect_message(&fields.message) {
            Some(reason) => self.flag(reason),
            None => SpamVerdict::Clean,
        }
    }

    /// Content checks on the message body alone.
    pub fn inspect_message(&self, message: &str) -> Option<SpamReason> {
        if self.config.block_urls && URL_PATTERN.is_match(message) {
            return Some(SpamReason::ContainsUrl);
        }
        if self.config.block_html && HTML_TAG_PATTERN.is_match(message) {
            return Some(SpamReason::ContainsHtml);
        }

        let lowered = message.to_lowercase();
        self.keywords
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(|k| SpamReason::Keyword(k.clone()))
    }

    fn flag(&self, reason: SpamReason) -> SpamVerdict {
        debug!(reason = %reason, "Spam trigger matched");
        SpamVerdict::Spam(reason)
    }
}
