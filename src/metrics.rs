// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for admission outcomes.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Counters and timings for the admission pipeline.
///
/// Each instance owns its registry, so several pipelines (or tests) can
/// coexist in one process.
#[derive(Clone)]
pub struct AdmissionMetrics {
    registry: Registry,
    outcomes: IntCounterVec,
    duration: Histogram,
}

impl AdmissionMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let outcomes = IntCounterVec::new(
            Opts::new(
                "contact_admissions_total",
                "Contact submissions by admission outcome",
            ),
            &["outcome"],
        )?;
        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "contact_admission_duration_seconds",
                "Time spent deciding a contact submission",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;

        registry.register(Box::new(outcomes.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            outcomes,
            duration,
        })
    }

    /// Record one decision.
    pub fn observe(&self, outcome: &str, elapsed: Duration) {
        self.outcomes.with_label_values(&[outcome]).inc();
        self.duration.observe(elapsed.as_secs_f64());
    }

    pub fn count(&self, outcome: &str) -> u64 {
        self.outcomes.with_label_values(&[outcome]).get()
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
