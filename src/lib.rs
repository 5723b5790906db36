// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Admission
//!
//! This crate decides whether a contact-form submission is stored,
//! applying these checks in order:
//!
//! - Structural validation (lengths, name pattern, email syntax, form age)
//! - Per-address sliding-window rate limiting (5 per minute default)
//! - Spam heuristics (honeypot, submit latency, URLs, HTML, keywords)
//! - Per-email volume guard (3 per 24 hours default)
//!
//! Accepted submissions are written through a [`store::SubmissionStore`].

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod locale;
pub mod metrics;
pub mod pipeline;
pub mod spam;
pub mod store;
pub mod validator;

pub use config::Config;
pub use limiter::{RateLimitResult, RateLimiter};
pub use pipeline::{AdmissionDecision, AdmissionPipeline, SubmissionInput};
pub use validator::{SubmissionValidator, ValidationResult};
