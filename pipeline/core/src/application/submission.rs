// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Submission Engine and Result Writer
//!
//! Sends batches to the scoring service one at a time, normalizes what comes
//! back and replaces the persisted attribution table once at the end.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Scoring round-trip and persistence
//!
//! A failed batch is logged and recorded; the run continues with the next
//! one. The rate-limit delay is applied after every call, including failed
//! ones. Weights are accumulated in memory so the table is either replaced
//! as a whole or not touched at all.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::application::batch_partitioner::{partition, BatchLimits};
use crate::application::weight_normalizer::{normalize, verify};
use crate::domain::attribution::{
    AttributionWeight, NormalizationFailure, RescaledConversion, VerificationReport,
};
use crate::domain::journey::{Journey, SkippedConversion};
use crate::domain::repository::AttributionRepository;
use crate::domain::scoring::AttributionScorer;
use crate::domain::touchpoint::ConversionId;

/// A batch the scoring service did not score.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// Zero-based position in submission order
    pub batch_index: usize,
    pub conversion_ids: Vec<ConversionId>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionSummary {
    pub batches_submitted: usize,
    pub batches_failed: Vec<BatchFailure>,
    /// Distinct conversions with at least one persisted weight
    pub conversions_attributed: usize,
    pub skipped: Vec<SkippedConversion>,
    pub rescaled: Vec<RescaledConversion>,
    pub normalization_failures: Vec<NormalizationFailure>,
    pub records_written: usize,
    pub verification: VerificationReport,
}

impl SubmissionSummary {
    pub fn batches_succeeded(&self) -> usize {
        self.batches_submitted - self.batches_failed.len()
    }
}

pub struct SubmissionService {
    scorer: Arc<dyn AttributionScorer>,
    repository: Arc<dyn AttributionRepository>,
    limits: BatchLimits,
    rate_limit_delay: Duration,
}

impl SubmissionService {
    pub fn new(
        scorer: Arc<dyn AttributionScorer>,
        repository: Arc<dyn AttributionRepository>,
        limits: BatchLimits,
        rate_limit_delay: Duration,
    ) -> Self {
        Self {
            scorer,
            repository,
            limits,
            rate_limit_delay,
        }
    }

    pub async fn submit(&self, journeys: Vec<Journey>) -> Result<SubmissionSummary> {
        let plan = partition(journeys, self.limits);
        let total_batches = plan.batches.len();

        for skipped in &plan.skipped {
            warn!(conversion_id = %skipped.conversion_id, "Conversion skipped: {}", skipped.reason);
        }

        info!(
            batches = total_batches,
            journeys = plan.journey_count(),
            skipped = plan.skipped.len(),
            "Submitting journeys to IHC API"
        );

        let mut summary = SubmissionSummary {
            skipped: plan.skipped,
            ..SubmissionSummary::default()
        };
        let mut accepted: Vec<AttributionWeight> = Vec::new();

        for (batch_index, batch) in plan.batches.iter().enumerate() {
            summary.batches_submitted += 1;
            info!(
                batch = batch_index + 1,
                of = total_batches,
                journeys = batch.journey_count(),
                touchpoints = batch.touchpoint_count(),
                "Sending batch"
            );

            match self.scorer.score(batch).await {
                Ok(response) => {
                    if response.has_partial_failures() {
                        warn!(
                            batch = batch_index + 1,
                            errors = %serde_json::Value::Array(response.partial_failures.clone()),
                            "Partial failures in batch"
                        );
                    }

                    let normalized = normalize(response.weights);
                    for rescaled in &normalized.rescaled {
                        info!(
                            conversion_id = %rescaled.conversion_id,
                            original_sum = rescaled.original_sum,
                            "Rescaled attribution weights"
                        );
                    }
                    for failure in &normalized.failures {
                        warn!(
                            conversion_id = %failure.conversion_id,
                            "Cannot normalize weights: {}",
                            failure.reason
                        );
                    }

                    info!(
                        batch = batch_index + 1,
                        weights = normalized.weights.len(),
                        "Batch scored"
                    );
                    accepted.extend(normalized.weights);
                    summary.rescaled.extend(normalized.rescaled);
                    summary.normalization_failures.extend(normalized.failures);
                }
                Err(e) => {
                    error!(batch = batch_index + 1, "Batch failed: {}", e);
                    summary.batches_failed.push(BatchFailure {
                        batch_index,
                        conversion_ids: batch.conversion_ids().cloned().collect(),
                        error: e.to_string(),
                    });
                }
            }

            tokio::time::sleep(self.rate_limit_delay).await;
        }

        if accepted.is_empty() {
            warn!("No attribution weights received; attribution table left unchanged");
            return Ok(summary);
        }

        summary.records_written = self
            .repository
            .replace_all(&accepted)
            .await
            .context("Failed to write attribution weights")?;

        let sums = self
            .repository
            .weight_sums()
            .await
            .context("Failed to re-aggregate attribution weights")?;
        summary.conversions_attributed = sums.len();
        summary.verification = verify(sums);

        for violation in &summary.verification.violations {
            warn!(
                conversion_id = %violation.conversion_id,
                weight_sum = violation.weight_sum,
                "Persisted weights do not sum to 1"
            );
        }

        info!(
            records = summary.records_written,
            conversions = summary.conversions_attributed,
            failed_batches = summary.batches_failed.len(),
            "Attribution weights written"
        );

        Ok(summary)
    }
}
