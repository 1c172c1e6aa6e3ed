// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Channel reporting rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Attributed cost and revenue per channel and session date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDateAggregate {
    pub channel_label: String,
    pub date: NaiveDate,
    pub cost: f64,
    pub total_weight: f64,
    pub weighted_revenue: f64,
}

impl ChannelDateAggregate {
    /// Cost per order. Zero when there is no attributed order.
    pub fn cpo(&self) -> f64 {
        finite_ratio(self.cost, self.total_weight)
    }

    /// Return on ad spend. Zero when there is no cost.
    pub fn roas(&self) -> f64 {
        finite_ratio(self.weighted_revenue, self.cost)
    }
}

fn finite_ratio(numerator: f64, denominator: f64) -> f64 {
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// One line of the channel reporting CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReportRow {
    pub channel_name: String,
    pub date: NaiveDate,
    pub cost: f64,
    pub ihc: f64,
    pub ihc_revenue: f64,
    #[serde(rename = "CPO")]
    pub cpo: f64,
    #[serde(rename = "ROAS")]
    pub roas: f64,
}

impl From<&ChannelDateAggregate> for ChannelReportRow {
    fn from(aggregate: &ChannelDateAggregate) -> Self {
        Self {
            channel_name: aggregate.channel_label.clone(),
            date: aggregate.date,
            cost: aggregate.cost,
            ihc: aggregate.total_weight,
            ihc_revenue: aggregate.weighted_revenue,
            cpo: aggregate.cpo(),
            roas: aggregate.roas(),
        }
    }
}
