// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Journey Builder
//!
//! Derives, for every conversion, the ordered set of touchpoints of the same
//! identity that happened at or before the conversion.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Journey construction
//!
//! Touchpoints are indexed by identity once and sorted by time, so each
//! conversion costs one hash lookup and one binary search instead of a scan
//! over every session in the store. There is no lower recency bound: the
//! identity's whole history up to the conversion qualifies, and a touchpoint
//! shared by two conversions of the same identity appears in both journeys.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::journey::{
    Journey, JourneyBuild, JourneyOutcome, JourneyTouchpoint, SkipReason, SkippedConversion,
};
use crate::domain::repository::TouchpointStore;
use crate::domain::touchpoint::{Conversion, DateRange, IdentityId, Touchpoint};

/// Touchpoints grouped by identity, each group sorted by `occurred_at`.
struct TouchpointIndex<'a> {
    by_identity: HashMap<&'a IdentityId, Vec<&'a Touchpoint>>,
}

impl<'a> TouchpointIndex<'a> {
    fn new(touchpoints: &'a [Touchpoint]) -> Self {
        let mut by_identity: HashMap<&IdentityId, Vec<&Touchpoint>> = HashMap::new();
        for touchpoint in touchpoints {
            by_identity.entry(&touchpoint.identity_id).or_default().push(touchpoint);
        }
        // Stable: equal timestamps keep store order.
        for group in by_identity.values_mut() {
            group.sort_by_key(|tp| tp.occurred_at);
        }
        Self { by_identity }
    }

    /// Touchpoints of the conversion's identity not later than the conversion.
    fn preceding(&self, conversion: &Conversion) -> &[&'a Touchpoint] {
        match self.by_identity.get(&conversion.identity_id) {
            Some(group) => {
                let end = group.partition_point(|tp| tp.occurred_at <= conversion.occurred_at);
                &group[..end]
            }
            None => &[],
        }
    }
}

/// Build journeys for every conversion inside `range`.
///
/// Conversions outside the range produce nothing; conversions inside it
/// produce either an included journey or a `NoTouchpoints` skip.
pub fn build_journeys(
    conversions: &[Conversion],
    touchpoints: &[Touchpoint],
    range: DateRange,
) -> JourneyBuild {
    let index = TouchpointIndex::new(touchpoints);

    let outcomes = conversions
        .iter()
        .filter(|conversion| range.contains(conversion.occurred_at.date()))
        .map(|conversion| {
            let preceding = index.preceding(conversion);
            if preceding.is_empty() {
                JourneyOutcome::Skipped(SkippedConversion::new(
                    conversion.conversion_id.clone(),
                    SkipReason::NoTouchpoints,
                ))
            } else {
                JourneyOutcome::Included(Journey::new(
                    conversion.conversion_id.clone(),
                    preceding.iter().map(|tp| JourneyTouchpoint::from_touchpoint(tp)).collect(),
                ))
            }
        })
        .collect();

    JourneyBuild { outcomes }
}

/// Loads the source tables and builds journeys from them.
pub struct JourneyBuilder {
    store: Arc<dyn TouchpointStore>,
}

impl JourneyBuilder {
    pub fn new(store: Arc<dyn TouchpointStore>) -> Self {
        Self { store }
    }

    pub async fn build(&self, range: DateRange) -> Result<JourneyBuild> {
        let conversions = self
            .store
            .load_conversions()
            .await
            .context("Failed to load conversions")?;
        let touchpoints = self
            .store
            .load_touchpoints()
            .await
            .context("Failed to load session sources")?;

        debug!(
            conversions = conversions.len(),
            touchpoints = touchpoints.len(),
            "Loaded source records"
        );

        let build = build_journeys(&conversions, &touchpoints, range);

        for skipped in build.skipped() {
            warn!(conversion_id = %skipped.conversion_id, "Conversion skipped: {}", skipped.reason);
        }

        info!(
            journeys = build.journey_count(),
            touchpoints = build.touchpoint_count(),
            skipped = build.skipped_count(),
            "Built customer journeys ({})",
            range
        );

        Ok(build)
    }
}
