// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission admission pipeline.
//!
//! Stages run in a fixed order and the first failing stage decides the
//! outcome; later stages are not evaluated.
//!
//! 1. Structural validation
//! 2. Per-address rate limit
//! 3. Spam heuristics
//! 4. Per-email volume guard (store query)
//! 5. Persistence (store insert)
//!
//! The volume guard is best effort: two concurrent submissions for the
//! same email can both read a count below the limit and both be accepted.

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, DuplicateConfig};
use crate::error::{AdmissionError, StoreError};
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::metrics::AdmissionMetrics;
use crate::spam::{SpamFilter, SpamReason, SpamVerdict};
use crate::store::{SubmissionRecord, SubmissionStore};
use crate::validator::{ContactForm, FieldViolation, SubmissionValidator, ValidationResult};
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A submission as received from the transport layer.
#[derive(Debug, Clone)]
pub struct SubmissionInput {
    pub form: ContactForm,
    pub source_address: IpAddr,
    pub user_agent: String,
}

/// Outcome of admission.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    /// Stored; carries the persisted record
    Accepted(SubmissionRecord),
    /// One or more fields failed structural validation
    RejectedInvalid(Vec<FieldViolation>),
    /// Source address exceeded its quota
    RejectedRateLimited { retry_after: Duration },
    /// A spam heuristic fired
    RejectedSpam(SpamReason),
    /// The email already has `prior` accepted submissions in the lookback
    RejectedDuplicate { prior: u64 },
}

impl AdmissionDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AdmissionDecision::Accepted(_))
    }

    /// Metric label for this outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "accepted",
            Self::RejectedInvalid(_) => "invalid",
            Self::RejectedRateLimited { .. } => "rate_limited",
            Self::RejectedSpam(_) => "spam",
            Self::RejectedDuplicate { .. } => "duplicate",
        }
    }
}

/// The admission pipeline. Built once per process and shared.
pub struct AdmissionPipeline {
    validator: SubmissionValidator,
    limiter: RateLimiter,
    spam: SpamFilter,
    duplicate: DuplicateConfig,
    store: Arc<dyn SubmissionStore>,
    store_timeout: Duration,
    clock: Arc<dyn Clock>,
    metrics: Option<AdmissionMetrics>,
}

impl AdmissionPipeline {
    /// Pipeline with the system clock and an in-process rate limiter.
    pub fn new(config: &Config, store: Arc<dyn SubmissionStore>) -> Self {
        Self {
            validator: SubmissionValidator::new(config.validation.clone()),
            limiter: RateLimiter::new(config.rate_limit.clone()),
            spam: SpamFilter::new(config.spam.clone()),
            duplicate: config.duplicate.clone(),
            store,
            store_timeout: config.store.timeout(),
            clock: Arc::new(SystemClock),
            metrics: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_metrics(mut self, metrics: AdmissionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn validator(&self) -> &SubmissionValidator {
        &self.validator
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn metrics(&self) -> Option<&AdmissionMetrics> {
        self.metrics.as_ref()
    }

    /// Decide a submission, storing it if accepted.
    pub async fn admit(&self, input: SubmissionInput) -> Result<AdmissionDecision, AdmissionError> {
        let started = Instant::now();
        let result = self.decide(input).await;

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(decision) => decision.outcome(),
                Err(_) => "error",
            };
            metrics.observe(outcome, started.elapsed());
        }

        result
    }

    async fn decide(&self, input: SubmissionInput) -> Result<AdmissionDecision, AdmissionError> {
        let now = self.clock.now();
        let address = input.source_address;

        let fields = match self.validator.validate(&input.form, now) {
            ValidationResult::Valid(fields) => fields,
            ValidationResult::Invalid(violations) => {
                info!(
                    %address,
                    violations = %join_violations(&violations),
                    "Submission rejected: invalid"
                );
                return Ok(AdmissionDecision::RejectedInvalid(violations));
            }
        };

        match self
            .limiter
            .check(address, now)
            .await
            .map_err(AdmissionError::RateLimitStoreUnavailable)?
        {
            RateLimitResult::Allowed { remaining, .. } => {
                debug!(%address, remaining, "Rate limit passed");
            }
            RateLimitResult::Limited { retry_after } => {
                info!(
                    %address,
                    retry_after_secs = retry_after.as_secs(),
                    "Submission rejected: rate limited"
                );
                return Ok(AdmissionDecision::RejectedRateLimited { retry_after });
            }
        }

        if let SpamVerdict::Spam(reason) =
            self.spam.inspect(&fields, input.form.honeypot.as_deref(), now)
        {
            info!(%address, reason = %reason, "Submission rejected: spam");
            return Ok(AdmissionDecision::RejectedSpam(reason));
        }

        let since = now - self.duplicate.lookback();
        let prior = self
            .bounded(self.store.count_by_email_since(&fields.email, since))
            .await
            .map_err(|err| {
                warn!(%address, error = %err, "Submission count query failed");
                AdmissionError::StoreUnavailable(err)
            })?;

        if prior >= self.duplicate.max_per_email {
            info!(%address, prior, "Submission rejected: too many from this email");
            return Ok(AdmissionDecision::RejectedDuplicate { prior });
        }

        let record = SubmissionRecord::new(fields, address, input.user_agent, now);
        self.bounded(self.store.insert(record.clone()))
            .await
            .map_err(|err| {
                warn!(%address, error = %err, "Submission insert failed");
                AdmissionError::StoreUnavailable(err)
            })?;

        info!(%address, id = %record.id, "Submission accepted");
        Ok(AdmissionDecision::Accepted(record))
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.store_timeout)))
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
