// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Structural validation of contact form submissions.
//!
//! Checks shape, length and pattern of every field and collects one
//! violation per failing field, in form order. The validator is pure:
//! the current time is passed in, nothing is read or written.

use crate::config::ValidationConfig;
use chrono::{DateTime, TimeZone, Utc};
use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Letters in any script, whitespace, hyphens and apostrophes.
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\s'-]+$").expect("name pattern is valid"));

/// Contact form body as posted by the browser.
///
/// Required text fields default to empty so that a missing field is
/// reported as a field violation rather than a malformed body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Honeypot field, hidden from people
    #[serde(rename = "website", default, skip_serializing_if = "Option::is_none")]
    pub honeypot: Option<String>,
    /// Epoch milliseconds at which the form was rendered
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub form_rendered_at: Option<i64>,
}

/// Fields of a submission that passed structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactFields {
    pub name: String,
    /// Lowercased
    pub email: String,
    pub company: Option<String>,
    pub message: String,
    pub form_rendered_at: DateTime<Utc>,
}

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("must be at least {min} characters")]
    TooShort { min: usize },

    #[error("cannot exceed {max} characters")]
    TooLong { max: usize },

    #[error("can only contain letters, spaces, hyphens and apostrophes")]
    InvalidName,

    #[error("must be a valid email address")]
    InvalidEmail,

    #[error("Invalid submission")]
    HoneypotFilled,

    #[error("is required")]
    MissingTimestamp,

    #[error("Invalid timestamp")]
    TimestampOutOfRange,
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Wire name of the field
    pub field: &'static str,
    pub error: ValidationError,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error)
    }
}

impl Serialize for FieldViolation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("FieldViolation", 2)?;
        s.serialize_field("field", self.field)?;
        s.serialize_field("message", &self.error.to_string())?;
        s.end()
    }
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Every field is valid
    Valid(ContactFields),
    /// One or more fields are invalid, in form order
    Invalid(Vec<FieldViolation>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(v) => v,
        }
    }

    /// First violation for `field`, if any.
    pub fn field_error(&self, field: &str) -> Option<&ValidationError> {
        self.violations()
            .iter()
            .find(|v| v.field == field)
            .map(|v| &v.error)
    }
}

/// Contact form validator.
#[derive(Debug, Clone)]
pub struct SubmissionValidator {
    config: ValidationConfig,
}

impl SubmissionValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a complete submission against `now`.
    pub fn validate(&self, form: &ContactForm, now: DateTime<Utc>) -> ValidationResult {
        let mut violations = Vec::new();
        let mut record = |field: &'static str, result: Result<(), ValidationError>| {
            if let Err(error) = result {
                violations.push(FieldViolation { field, error });
            }
        };

        record("name", self.validate_name(&form.name));
        record("email", self.validate_email(&form.email));
        record("company", self.validate_company(form.company.as_deref()));
        record("message", self.validate_message(&form.message));
        record("website", validate_honeypot(form.honeypot.as_deref()));

        let rendered_at = self.validate_rendered_at(form.form_rendered_at, now);
        if let Err(error) = &rendered_at {
            violations.push(FieldViolation {
                field: "timestamp",
                error: error.clone(),
            });
        }

        match rendered_at {
            Ok(form_rendered_at) if violations.is_empty() => {
                ValidationResult::Valid(ContactFields {
                    name: form.name.clone(),
                    email: form.email.to_lowercase(),
                    company: normalize_company(form.company.as_deref()),
                    message: form.message.clone(),
                    form_rendered_at,
                })
            }
            _ => {
                debug!(violations = violations.len(), "Submission failed validation");
                ValidationResult::Invalid(violations)
            }
        }
    }

    pub fn validate_name(&self, name: &str) -> Result<(), ValidationError> {
        check_length(name, self.config.name_min, self.config.name_max)?;
        if !NAME_PATTERN.is_match(name) {
            return Err(ValidationError::InvalidName);
        }
        Ok(())
    }

    /// Syntax only; deliverability is never checked.
    pub fn validate_email(&self, email: &str) -> Result<(), ValidationError> {
        check_length(email, self.config.email_min, self.config.email_max)?;
        match email.parse::<EmailAddress>() {
            Ok(addr) if addr.domain().contains('.') => Ok(()),
            _ => Err(ValidationError::InvalidEmail),
        }
    }

    pub fn validate_company(&self, company: Option<&str>) -> Result<(), ValidationError> {
        match normalize_company(company) {
            Some(c) => check_length(&c, 0, self.config.company_max),
            None => Ok(()),
        }
    }

    pub fn validate_message(&self, message: &str) -> Result<(), ValidationError> {
        check_length(message, self.config.message_min, self.config.message_max)
    }

    /// Accepts render times in `[now - max_form_age, now]`.
    pub fn validate_rendered_at(
        &self,
        rendered_at_ms: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ValidationError> {
        let ms = rendered_at_ms.ok_or(ValidationError::MissingTimestamp)?;
        let rendered_at = Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or(ValidationError::TimestampOutOfRange)?;

        let max_age = self.config.max_form_age();
        if rendered_at > now || rendered_at < now - max_age {
            return Err(ValidationError::TimestampOutOfRange);
        }
        Ok(rendered_at)
    }
}

fn validate_honeypot(honeypot: Option<&str>) -> Result<(), ValidationError> {
    match honeypot {
        Some(value) if !value.is_empty() => Err(ValidationError::HoneypotFilled),
        _ => Ok(()),
    }
}

fn check_length(value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        Err(ValidationError::TooShort { min })
    } else if len > max {
        Err(ValidationError::TooLong { max })
    } else {
        Ok(())
    }
}

/// Blank company names are the same as an omitted field.
fn normalize_company(company: Option<&str>) -> Option<String> {
    company
        .filter(|c| !c.trim().is_empty())
        .map(|c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn default_validator() -> SubmissionValidator {
        SubmissionValidator::new(ValidationConfig::default())
    }

    fn valid_form(now: DateTime<Utc>) -> ContactForm {
        ContactForm {
            name: "Jane O'Neil-Smith".to_string(),
            email: "Jane@Example.com".to_string(),
            company: Some("Acme".to_string()),
            message: "I would like to know more about your services.".to_string(),
            honeypot: None,
            form_rendered_at: Some((now - Duration::seconds(30)).timestamp_millis()),
        }
    }

    #[test]
    fn test_valid_submission() {
        let now = Utc::now();
        let result = default_validator().validate(&valid_form(now), now);

        match result {
            ValidationResult::Valid(fields) => {
                assert_eq!(fields.email, "jane@example.com");
                assert_eq!(fields.company.as_deref(), Some("Acme"));
            }
            ValidationResult::Invalid(v) => panic!("Should be valid, got {:?}", v),
        }
    }

    #[test]
    fn test_name_length_boundaries() {
        let validator = default_validator();

        assert!(validator.validate_name("Al").is_ok());
        assert!(validator.validate_name(&"a".repeat(50)).is_ok());
        assert_eq!(
            validator.validate_name("A"),
            Err(ValidationError::TooShort { min: 2 })
        );
        assert_eq!(
            validator.validate_name(&"a".repeat(51)),
            Err(ValidationError::TooLong { max: 50 })
        );
    }

    #[test]
    fn test_unicode_names_accepted() {
        let validator = default_validator();

        assert!(validator.validate_name("محمد العلي").is_ok());
        assert!(validator.validate_name("Zoë Ångström").is_ok());
        // Length counts characters, not bytes
        assert!(validator.validate_name(&"ع".repeat(50)).is_ok());
    }

    #[test]
    fn test_name_pattern_rejects_digits_and_symbols() {
        let validator = default_validator();

        assert_eq!(validator.validate_name("R2D2"), Err(ValidationError::InvalidName));
        assert_eq!(
            validator.validate_name("<script>"),
            Err(ValidationError::InvalidName)
        );
    }

    #[test]
    fn test_email_syntax() {
        let validator = default_validator();

        assert!(validator.validate_email("user@example.com").is_ok());
        assert!(validator.validate_email("first.last+tag@sub.example.ae").is_ok());
        assert_eq!(
            validator.validate_email("not-an-email"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            validator.validate_email("user@localhost"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            validator.validate_email("a@b"),
            Err(ValidationError::TooShort { min: 5 })
        );
    }

    #[test]
    fn test_company_optional() {
        let validator = default_validator();

        assert!(validator.validate_company(None).is_ok());
        assert!(validator.validate_company(Some("")).is_ok());
        assert_eq!(
            validator.validate_company(Some(&"c".repeat(101))),
            Err(ValidationError::TooLong { max: 100 })
        );
    }

    #[test]
    fn test_honeypot_filled() {
        let now = Utc::now();
        let mut form = valid_form(now);
        form.honeypot = Some("http://spam.example".to_string());

        let result = default_validator().validate(&form, now);
        assert!(!result.is_valid());
        assert_eq!(
            result.field_error("website"),
            Some(&ValidationError::HoneypotFilled)
        );
    }

    #[test]
    fn test_timestamp_window() {
        let validator = default_validator();
        // Whole milliseconds, so the boundary survives the round trip
        let now = Utc
            .timestamp_millis_opt(Utc::now().timestamp_millis())
            .unwrap();

        let in_future = (now + Duration::seconds(5)).timestamp_millis();
        let too_old = (now - Duration::hours(1) - Duration::seconds(1)).timestamp_millis();
        let oldest = (now - Duration::hours(1)).timestamp_millis();

        assert_eq!(
            validator.validate_rendered_at(Some(in_future), now),
            Err(ValidationError::TimestampOutOfRange)
        );
        assert_eq!(
            validator.validate_rendered_at(Some(too_old), now),
            Err(ValidationError::TimestampOutOfRange)
        );
        assert!(validator.validate_rendered_at(Some(oldest), now).is_ok());
        assert_eq!(
            validator.validate_rendered_at(None, now),
            Err(ValidationError::MissingTimestamp)
        );
    }

    #[test]
    fn test_violations_in_form_order() {
        let now = Utc::now();
        let form = ContactForm {
            name: "X".to_string(),
            email: "bad".to_string(),
            company: None,
            message: "short".to_string(),
            honeypot: Some("filled".to_string()),
            form_rendered_at: None,
        };

        let result = default_validator().validate(&form, now);
        let fields: Vec<&str> = result.violations().iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["name", "email", "message", "website", "timestamp"]);
    }

    #[test]
    fn test_violation_serializes_message() {
        let violation = FieldViolation {
            field: "message",
            error: ValidationError::TooShort { min: 10 },
        };
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["field"], "message");
        assert_eq!(json["message"], "must be at least 10 characters");
    }
}
