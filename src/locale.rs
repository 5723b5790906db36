// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Locale negotiation and caller-facing messages.
//!
//! The site serves `en-US` and `ar-AE`, with Arabic as the default.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported response locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "en-US")]
    EnUs,
    #[default]
    #[serde(rename = "ar-AE")]
    ArAe,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::EnUs, Locale::ArAe];

    /// BCP 47 tag.
    pub fn tag(self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::ArAe => "ar-AE",
        }
    }

    /// Primary language subtag, used for `Content-Language`.
    pub fn language(self) -> &'static str {
        match self {
            Locale::EnUs => "en",
            Locale::ArAe => "ar",
        }
    }

    /// Parse a tag such as `en-US` or a bare language such as `ar`.
    pub fn from_tag(tag: &str) -> Option<Locale> {
        let tag = tag.trim();
        let primary = tag.split('-').next().unwrap_or(tag);
        Locale::ALL
            .into_iter()
            .find(|l| l.tag().eq_ignore_ascii_case(tag) || l.language().eq_ignore_ascii_case(primary))
    }

    /// Pick the best supported locale for an `Accept-Language` header.
    ///
    /// Ranges are tried by descending quality (ties keep header order).
    /// A range matches a locale by full tag or by primary language; `*`
    /// or no match yields `fallback`.
    pub fn negotiate(accept_language: Option<&str>, fallback: Locale) -> Locale {
        let Some(header) = accept_language else {
            return fallback;
        };

        let mut ranges: Vec<(String, f32)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.split(';');
                let range = pieces.next()?.trim().to_lowercase();
                if range.is_empty() {
                    return None;
                }
                let quality = pieces
                    .filter_map(|p| p.trim().strip_prefix("q="))
                    .find_map(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((range, quality))
            })
            .filter(|(_, q)| *q > 0.0)
            .collect();

        ranges.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        for (range, _) in &ranges {
            if range == "*" {
                return fallback;
            }
            if let Some(locale) = Locale::from_tag(range) {
                return locale;
            }
        }

        fallback
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Messages returned to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Accepted,
    InvalidSubmission,
    RateLimited,
    TooManySubmissions,
    InternalError,
    MalformedRequest,
}

impl Message {
    pub fn text(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Message::Accepted, Locale::EnUs) => "Thank you! We will get back to you soon.",
            (Message::Accepted, Locale::ArAe) => "شكراً لك! سنتواصل معك قريباً.",
            (Message::InvalidSubmission, Locale::EnUs) => "Invalid submission",
            (Message::InvalidSubmission, Locale::ArAe) => "طلب غير صالح",
            (Message::RateLimited, Locale::EnUs) => "Too many requests",
            (Message::RateLimited, Locale::ArAe) => "عدد كبير جداً من الطلبات",
            (Message::TooManySubmissions, Locale::EnUs) => {
                "Too many submissions from this email"
            }
            (Message::TooManySubmissions, Locale::ArAe) => {
                "عدد كبير جداً من الرسائل من هذا البريد الإلكتروني"
            }
            (Message::InternalError, Locale::EnUs) => "An error occurred. Please try again.",
            (Message::InternalError, Locale::ArAe) => "حدث خطأ. يرجى المحاولة مرة أخرى.",
            (Message::MalformedRequest, Locale::EnUs) => "Malformed request body",
            (Message::MalformedRequest, Locale::ArAe) => "نص الطلب غير صالح",
        }
    }
}
