// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Abuse patterns for security testing.

/// Abuse pattern configuration.
///
/// Time is simulated: the harness advances a manual clock by
/// `interval_ms` between requests instead of sleeping.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Simulated time between consecutive requests
    pub interval_ms: i64,
    /// Number of unique IPs to simulate
    pub unique_ips: usize,
    /// Number of unique sender emails
    pub unique_emails: usize,
    /// Fraction of requests with the honeypot filled (0.0-1.0)
    pub honeypot_ratio: f64,
    /// Fraction of requests submitted right after render (0.0-1.0)
    pub fast_submit_ratio: f64,
    /// Fraction of requests whose message carries a spam trigger (0.0-1.0)
    pub spam_content_ratio: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            interval_ms: 100,
            unique_ips: 1,
            unique_emails: 100,
            honeypot_ratio: 0.0,
            fast_submit_ratio: 0.0,
            spam_content_ratio: 0.0,
        }
    }
}

/// Predefined abuse patterns.
impl AttackConfig {
    /// Single IP flood - one bot hammering the form.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 200,
            interval_ms: 100,
            unique_ips: 1,
            unique_emails: 200,
            ..Default::default()
        }
    }

    /// Distributed submissions - many IPs, a few requests each.
    pub fn distributed_attack() -> Self {
        Self {
            total_requests: 300,
            interval_ms: 20,
            unique_ips: 100,
            unique_emails: 300,
            ..Default::default()
        }
    }

    /// Form-filling bot that populates every input, hidden ones included.
    pub fn honeypot_bots() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 10,
            honeypot_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Bot that posts the moment the form renders.
    pub fn instant_submit_bots() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 10,
            fast_submit_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Link and keyword spam from many addresses.
    pub fn content_spam() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 25,
            spam_content_ratio: 1.0,
            ..Default::default()
        }
    }

    /// One email address, rotating IPs to dodge the rate limit.
    pub fn email_flood() -> Self {
        Self {
            total_requests: 40,
            interval_ms: 60_000,
            unique_ips: 40,
            unique_emails: 1,
            ..Default::default()
        }
    }

    /// Slow drip - stay under the per-address quota.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 30,
            interval_ms: 15_000, // 4 per minute < 5 limit
            unique_ips: 1,
            unique_emails: 30,
            ..Default::default()
        }
    }
}
