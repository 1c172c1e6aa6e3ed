// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Batch Partitioner
//!
//! Splits journeys into request-sized batches under the scoring service's
//! two ceilings: journeys per call and touchpoints per call.
//!
//! Journeys are first grouped into primary chunks of at most
//! `max_journeys` in input order. A chunk within the touchpoint ceiling is
//! one batch. A chunk over it falls back to one batch per journey, and any
//! journey that alone exceeds the ceiling is reported as skipped because no
//! partitioning can ever submit it. A journey is never split.

use crate::domain::journey::{Batch, Journey, SkipReason, SkippedConversion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_journeys: usize,
    pub max_touchpoints: usize,
}

impl BatchLimits {
    pub fn new(max_journeys: usize, max_touchpoints: usize) -> Self {
        Self {
            max_journeys,
            max_touchpoints,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionPlan {
    pub batches: Vec<Batch>,
    pub skipped: Vec<SkippedConversion>,
}

impl PartitionPlan {
    pub fn journey_count(&self) -> usize {
        self.batches.iter().map(Batch::journey_count).sum()
    }
}

pub fn partition(journeys: Vec<Journey>, limits: BatchLimits) -> PartitionPlan {
    let chunk_size = limits.max_journeys.max(1);
    let mut plan = PartitionPlan::default();

    let mut journeys = journeys.into_iter().peekable();
    while journeys.peek().is_some() {
        let chunk: Vec<Journey> = journeys.by_ref().take(chunk_size).collect();
        let touchpoints: usize = chunk.iter().map(Journey::len).sum();

        if touchpoints <= limits.max_touchpoints {
            plan.batches.push(Batch::new(chunk));
            continue;
        }

        for journey in chunk {
            if journey.len() > limits.max_touchpoints {
                plan.skipped.push(SkippedConversion::new(
                    journey.conversion_id.clone(),
                    SkipReason::Oversized {
                        touchpoints: journey.len(),
                        limit: limits.max_touchpoints,
                    },
                ));
            } else {
                plan.batches.push(Batch::new(vec![journey]));
            }
        }
    }

    plan
}
