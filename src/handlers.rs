// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact admission service.
//!
//! Every rejected submission with status 400 gets the same body, so an
//! automated sender cannot tell a spam heuristic or the honeypot from a
//! mistyped field. Per-field details are served by the validate endpoint
//! only, and never name the honeypot.

use crate::config::Config;
use crate::locale::{Locale, Message};
use crate::pipeline::{AdmissionDecision, AdmissionPipeline, SubmissionInput};
use crate::validator::{ContactForm, FieldViolation, ValidationError};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pub pipeline: AdmissionPipeline,
    pub config: Config,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Accepted submission response body.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub message: &'static str,
    pub id: Uuid,
}

/// Pre-submission validation response body.
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub fields: Vec<FieldViolation>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/contact", post(submit_contact))
        .route("/api/contact/validate", post(validate_contact));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router.with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-admission",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let Some(metrics) = state.pipeline.metrics() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Run a contact submission through the admission pipeline.
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> Response {
    let locale = negotiate_locale(&headers, &state.config);
    let source_address = source_address(&headers, peer, state.config.trust_forwarded_for);

    let Json(form) = match payload {
        Ok(form) => form,
        Err(rejection) => {
            info!(address = %source_address, error = %rejection, "Malformed contact request");
            return malformed(locale);
        }
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    debug!(address = %source_address, %locale, "Processing contact submission");

    let input = SubmissionInput {
        form,
        source_address,
        user_agent,
    };

    match state.pipeline.admit(input).await {
        Ok(AdmissionDecision::Accepted(record)) => respond(
            locale,
            StatusCode::OK,
            AcceptedResponse {
                message: Message::Accepted.text(locale),
                id: record.id,
            },
        ),
        Ok(AdmissionDecision::RejectedInvalid(_)) | Ok(AdmissionDecision::RejectedSpam(_)) => {
            respond(
                locale,
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: Message::InvalidSubmission.text(locale),
                    code: "INVALID_SUBMISSION",
                    retry_after_secs: None,
                },
            )
        }
        Ok(AdmissionDecision::RejectedRateLimited { retry_after }) => {
            let retry_secs = whole_seconds(retry_after);
            let mut response = respond(
                locale,
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse {
                    error: Message::RateLimited.text(locale),
                    code: "RATE_LIMITED",
                    retry_after_secs: Some(retry_secs),
                },
            );
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
            response
        }
        Ok(AdmissionDecision::RejectedDuplicate { .. }) => respond(
            locale,
            StatusCode::TOO_MANY_REQUESTS,
            ErrorResponse {
                error: Message::TooManySubmissions.text(locale),
                code: "TOO_MANY_SUBMISSIONS",
                retry_after_secs: None,
            },
        ),
        Err(err) => {
            error!(address = %source_address, error = %err, "Contact submission failed");
            respond(
                locale,
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: Message::InternalError.text(locale),
                    code: "INTERNAL_ERROR",
                    retry_after_secs: None,
                },
            )
        }
    }
}

/// Structural validation only, for checks before the form is submitted.
///
/// Uses the same validator as the pipeline and touches no counters.
pub async fn validate_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> Response {
    let locale = negotiate_locale(&headers, &state.config);
    let Ok(Json(form)) = payload else {
        return malformed(locale);
    };

    let now = state.pipeline.clock().now();
    let result = state.pipeline.validator().validate(&form, now);

    respond(
        locale,
        StatusCode::OK,
        ValidateResponse {
            valid: result.is_valid(),
            fields: visible_violations(result.violations()),
        },
    )
}

/// Violations a caller may see. The honeypot is never reported.
fn visible_violations(violations: &[FieldViolation]) -> Vec<FieldViolation> {
    violations
        .iter()
        .filter(|v| v.error != ValidationError::HoneypotFilled)
        .cloned()
        .collect()
}

fn negotiate_locale(headers: &HeaderMap, config: &Config) -> Locale {
    Locale::negotiate(
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
        config.locale.default,
    )
}

/// Peer address, or the first `X-Forwarded-For` hop when trusted.
fn source_address(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    peer.ip()
}

/// Round up so clients never retry early.
fn whole_seconds(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

fn malformed(locale: Locale) -> Response {
    respond(
        locale,
        StatusCode::BAD_REQUEST,
        ErrorResponse {
            error: Message::MalformedRequest.text(locale),
            code: "MALFORMED_REQUEST",
            retry_after_secs: None,
        },
    )
}

fn respond<T: Serialize>(locale: Locale, status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CONTENT_LANGUAGE,
        HeaderValue::from_static(locale.language()),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_address_forwarded() {
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));

        assert_eq!(
            source_address(&headers, peer, true),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );
        assert_eq!(source_address(&headers, peer, false), peer.ip());
    }

    #[test]
    fn test_source_address_bad_forwarded_falls_back() {
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("unknown"));

        assert_eq!(source_address(&headers, peer, true), peer.ip());
    }

    #[test]
    fn test_honeypot_never_visible() {
        let violations = vec![
            FieldViolation {
                field: "message",
                error: ValidationError::TooShort { min: 10 },
            },
            FieldViolation {
                field: "website",
                error: ValidationError::HoneypotFilled,
            },
        ];

        let visible = visible_violations(&violations);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].field, "message");
    }

    #[test]
    fn test_whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(whole_seconds(Duration::from_secs(60)), 60);
        assert_eq!(whole_seconds(Duration::ZERO), 1);
    }
}
