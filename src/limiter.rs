// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter keyed by source address.
//!
//! Each address keeps the times of its admitted requests inside the
//! window. A request is admitted only if fewer than `max_requests` of
//! those remain, and the check and the insert happen under one write
//! lock, so concurrent requests from one address cannot overshoot.
//!
//! The counter lives behind [`RateLimitStore`]; [`MemoryRateLimitStore`]
//! is the in-process implementation. [`RateLimiter`] applies the
//! configured [`FailurePolicy`] when the store errors.

use crate::config::{FailurePolicy, RateLimitConfig};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// Time until the oldest counted request leaves the window
        reset_in: Duration,
    },
    /// Request is rate limited
    Limited {
        /// Time until a slot frees up
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Quota applied to every address.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub max_requests: u32,
    pub window: chrono::Duration,
}

impl From<&RateLimitConfig> for Quota {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window(),
        }
    }
}

/// Backing store for per-address counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Atomically count the request against `address` if it fits in `quota`.
    async fn check_and_increment(
        &self,
        address: IpAddr,
        quota: Quota,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult, StoreError>;

    /// Drop state for addresses with no requests inside the window.
    async fn cleanup(&self, quota: Quota, now: DateTime<Utc>);
}

/// Admission times for one address, oldest first.
#[derive(Debug, Default)]
struct SlidingWindow {
    admitted: VecDeque<DateTime<Utc>>,
}

impl SlidingWindow {
    /// Forget requests at or beyond the window edge.
    fn evict(&mut self, now: DateTime<Utc>, window: chrono::Duration) {
        let edge = now - window;
        while matches!(self.admitted.front(), Some(t) if *t <= edge) {
            self.admitted.pop_front();
        }
    }

    fn try_admit(&mut self, now: DateTime<Utc>, quota: Quota) -> bool {
        self.evict(now, quota.window);
        if self.admitted.len() < quota.max_requests as usize {
            self.admitted.push_back(now);
            true
        } else {
            false
        }
    }

    fn remaining(&self, quota: Quota) -> u32 {
        quota.max_requests.saturating_sub(self.admitted.len() as u32)
    }

    /// Time until the oldest entry expires.
    fn time_until_slot(&self, now: DateTime<Utc>, window: chrono::Duration) -> Duration {
        self.admitted
            .front()
            .and_then(|oldest| (*oldest + window - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }
}

/// In-process rate-limit store.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    windows: RwLock<HashMap<IpAddr, SlidingWindow>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of addresses currently tracked.
    pub async fn tracked(&self) -> usize {
        self.windows.read().await.len()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        address: IpAddr,
        quota: Quota,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult, StoreError> {
        let mut windows = self.windows.write().await;
        let window = windows.entry(address).or_default();

        if window.try_admit(now, quota) {
            Ok(RateLimitResult::Allowed {
                remaining: window.remaining(quota),
                reset_in: window.time_until_slot(now, quota.window),
            })
        } else {
            Ok(RateLimitResult::Limited {
                retry_after: window.time_until_slot(now, quota.window),
            })
        }
    }

    async fn cleanup(&self, quota: Quota, now: DateTime<Utc>) {
        let mut windows = self.windows.write().await;
        windows.retain(|_, window| {
            window.evict(now, quota.window);
            !window.admitted.is_empty()
        });
    }
}

/// Thread-safe rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Create a rate limiter backed by an in-process store.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryRateLimitStore::new()))
    }

    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check and count a request from `address`.
    ///
    /// A store failure is either admitted (`FailurePolicy::Open`) or
    /// returned to the caller (`FailurePolicy::Closed`).
    pub async fn check(
        &self,
        address: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult, StoreError> {
        let quota = Quota::from(&self.config);

        match self.store.check_and_increment(address, quota, now).await {
            Ok(result) => {
                if let RateLimitResult::Limited { retry_after } = &result {
                    debug!(%address, ?retry_after, "Address rate limit exceeded");
                }
                Ok(result)
            }
            Err(err) => match self.config.failure_policy {
                FailurePolicy::Open => {
                    warn!(%address, error = %err, "Rate limit store failed, admitting request");
                    Ok(RateLimitResult::Allowed {
                        remaining: 0,
                        reset_in: Duration::ZERO,
                    })
                }
                FailurePolicy::Closed => {
                    warn!(%address, error = %err, "Rate limit store failed, rejecting request");
                    Err(err)
                }
            },
        }
    }

    /// Clean up expired entries (should be called periodically).
    pub async fn cleanup(&self, now: DateTime<Utc>) {
        self.store.cleanup(Quota::from(&self.config), now).await;
    }
}
