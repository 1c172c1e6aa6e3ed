// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Attribution weights
//!
//! Invariant: for a fixed conversion, the weights of all its rows sum to 1
//! within [`WEIGHT_TOLERANCE`]. The scoring service does not always honour
//! it, so weights are normalized before they are written and re-checked
//! afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::touchpoint::{ConversionId, SessionId};

pub const WEIGHT_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionWeight {
    pub conversion_id: ConversionId,
    pub session_id: SessionId,
    pub weight: f64,
}

impl AttributionWeight {
    pub fn new(conversion_id: ConversionId, session_id: SessionId, weight: f64) -> Self {
        Self {
            conversion_id,
            session_id,
            weight,
        }
    }
}

pub fn within_tolerance(sum: f64) -> bool {
    (sum - 1.0).abs() <= WEIGHT_TOLERANCE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationFailureReason {
    /// Weights sum to zero; rescaling is undefined.
    ZeroSum,
    /// At least one weight is NaN or infinite.
    NonFinite,
    /// At least one weight is below zero.
    NegativeWeight,
    /// The sum overflows, or rescaling does not land within tolerance.
    Unscalable,
}

impl fmt::Display for NormalizationFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationFailureReason::ZeroSum => f.write_str("weights sum to zero"),
            NormalizationFailureReason::NonFinite => f.write_str("non-finite weight"),
            NormalizationFailureReason::NegativeWeight => f.write_str("negative weight"),
            NormalizationFailureReason::Unscalable => f.write_str("weights cannot be rescaled to sum to 1"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationFailure {
    pub conversion_id: ConversionId,
    pub reason: NormalizationFailureReason,
}

/// A conversion whose weights were rescaled, with the sum the service sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescaledConversion {
    pub conversion_id: ConversionId,
    pub original_sum: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedWeights {
    /// Rows safe to persist; every conversion here satisfies the invariant.
    pub weights: Vec<AttributionWeight>,
    pub rescaled: Vec<RescaledConversion>,
    pub failures: Vec<NormalizationFailure>,
}

/// Per-conversion sum as re-aggregated from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionWeightSum {
    pub conversion_id: ConversionId,
    pub weight_sum: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    pub total_conversions: usize,
    pub within_tolerance: usize,
    pub violations: Vec<ConversionWeightSum>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}
