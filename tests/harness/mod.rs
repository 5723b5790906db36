// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for contact form abuse simulation.
//!
//! This module provides utilities for replaying abuse patterns against
//! the admission pipeline to validate its controls.

pub mod attacks;
pub mod generators;
pub mod metrics;
