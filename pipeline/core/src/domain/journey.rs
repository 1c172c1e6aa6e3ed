// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Journeys and Batches
//!
//! A journey is the ordered touchpoint history leading up to one conversion.
//! Journeys are derived every run and only ever leave memory as the
//! intermediate CSV artifact or as the body of a scoring request, both of
//! which use the flat [`JourneyRow`] shape.
//!
//! Conversions that cannot be attributed are never dropped silently: the
//! builder and the partitioner report them as [`SkippedConversion`] values.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::touchpoint::{flag, timestamp_format, ConversionId, SessionId, Touchpoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyTouchpoint {
    pub session_id: SessionId,
    pub occurred_at: NaiveDateTime,
    pub channel_label: String,
    pub holder_engagement: bool,
    pub closer_engagement: bool,
    pub impression_interaction: bool,
    /// Marks the row carrying the conversion itself.
    pub is_conversion_event: bool,
}

impl JourneyTouchpoint {
    pub fn from_touchpoint(touchpoint: &Touchpoint) -> Self {
        Self {
            session_id: touchpoint.session_id.clone(),
            occurred_at: touchpoint.occurred_at,
            channel_label: touchpoint.channel_label.clone(),
            holder_engagement: touchpoint.holder_engagement,
            closer_engagement: touchpoint.closer_engagement,
            impression_interaction: touchpoint.impression_interaction,
            is_conversion_event: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub conversion_id: ConversionId,
    pub touchpoints: Vec<JourneyTouchpoint>,
}

impl Journey {
    pub fn new(conversion_id: ConversionId, touchpoints: Vec<JourneyTouchpoint>) -> Self {
        Self {
            conversion_id,
            touchpoints,
        }
    }

    pub fn len(&self) -> usize {
        self.touchpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.touchpoints.is_empty()
    }

    pub fn to_rows(&self) -> Vec<JourneyRow> {
        self.touchpoints
            .iter()
            .map(|tp| JourneyRow {
                conversion_id: self.conversion_id.clone(),
                session_id: tp.session_id.clone(),
                timestamp: tp.occurred_at,
                channel_label: tp.channel_label.clone(),
                holder_engagement: tp.holder_engagement,
                closer_engagement: tp.closer_engagement,
                conversion: tp.is_conversion_event,
                impression_interaction: tp.impression_interaction,
            })
            .collect()
    }

    /// Regroup flat rows into journeys.
    ///
    /// Journeys come out in order of each conversion's first row; rows keep
    /// their relative order inside a journey.
    pub fn from_rows(rows: impl IntoIterator<Item = JourneyRow>) -> Vec<Journey> {
        let mut index: HashMap<ConversionId, usize> = HashMap::new();
        let mut journeys: Vec<Journey> = Vec::new();

        for row in rows {
            let position = *index.entry(row.conversion_id.clone()).or_insert_with(|| {
                journeys.push(Journey::new(row.conversion_id.clone(), Vec::new()));
                journeys.len() - 1
            });
            journeys[position].touchpoints.push(JourneyTouchpoint {
                session_id: row.session_id,
                occurred_at: row.timestamp,
                channel_label: row.channel_label,
                holder_engagement: row.holder_engagement,
                closer_engagement: row.closer_engagement,
                impression_interaction: row.impression_interaction,
                is_conversion_event: row.conversion,
            });
        }

        journeys
    }
}

/// Flat journey row: one line of the journeys CSV, one element of
/// `customer_journeys` in a scoring request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyRow {
    pub conversion_id: ConversionId,
    pub session_id: SessionId,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub channel_label: String,
    #[serde(with = "flag")]
    pub holder_engagement: bool,
    #[serde(with = "flag")]
    pub closer_engagement: bool,
    #[serde(with = "flag")]
    pub conversion: bool,
    #[serde(with = "flag")]
    pub impression_interaction: bool,
}

/// Why a conversion receives no attribution this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No touchpoint of the same identity at or before the conversion.
    NoTouchpoints,
    /// The journey alone exceeds the per-request touchpoint ceiling.
    Oversized { touchpoints: usize, limit: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoTouchpoints => f.write_str("no qualifying touchpoints"),
            SkipReason::Oversized { touchpoints, limit } => {
                write!(f, "too many sessions ({} > {})", touchpoints, limit)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedConversion {
    pub conversion_id: ConversionId,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl SkippedConversion {
    pub fn new(conversion_id: ConversionId, reason: SkipReason) -> Self {
        Self {
            conversion_id,
            reason,
        }
    }
}

/// Per-conversion result of journey construction.
#[derive(Debug, Clone, PartialEq)]
pub enum JourneyOutcome {
    Included(Journey),
    Skipped(SkippedConversion),
}

/// Everything the builder produced for one run, in conversion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JourneyBuild {
    pub outcomes: Vec<JourneyOutcome>,
}

impl JourneyBuild {
    pub fn journeys(&self) -> impl Iterator<Item = &Journey> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            JourneyOutcome::Included(journey) => Some(journey),
            JourneyOutcome::Skipped(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedConversion> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            JourneyOutcome::Included(_) => None,
            JourneyOutcome::Skipped(skipped) => Some(skipped),
        })
    }

    pub fn journey_count(&self) -> usize {
        self.journeys().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    pub fn touchpoint_count(&self) -> usize {
        self.journeys().map(Journey::len).sum()
    }

    pub fn into_journeys(self) -> Vec<Journey> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                JourneyOutcome::Included(journey) => Some(journey),
                JourneyOutcome::Skipped(_) => None,
            })
            .collect()
    }
}

/// Whole journeys submitted together in one scoring call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub journeys: Vec<Journey>,
}

impl Batch {
    pub fn new(journeys: Vec<Journey>) -> Self {
        Self { journeys }
    }

    pub fn journey_count(&self) -> usize {
        self.journeys.len()
    }

    pub fn touchpoint_count(&self) -> usize {
        self.journeys.iter().map(Journey::len).sum()
    }

    pub fn conversion_ids(&self) -> impl Iterator<Item = &ConversionId> {
        self.journeys.iter().map(|j| &j.conversion_id)
    }

    pub fn to_rows(&self) -> Vec<JourneyRow> {
        self.journeys.iter().flat_map(Journey::to_rows).collect()
    }
}
