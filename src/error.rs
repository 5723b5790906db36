// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Infrastructure error types.
//!
//! Rejections (invalid, spam, rate limited, duplicate) are ordinary
//! outcomes and live in [`crate::pipeline::AdmissionDecision`]. The types
//! here cover faults in the collaborators the pipeline depends on.

use std::time::Duration;
use thiserror::Error;

/// Failure of a backing store (submission store or rate-limit store).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Pipeline fault that prevented a decision from being reached.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Submission store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Rate limit store unavailable: {0}")]
    RateLimitStoreUnavailable(#[source] StoreError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AdmissionError>;
