// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Channel Reporter
//!
//! Rolls persisted attribution weights up to channel and session date,
//! replaces the reporting table and writes the report CSV.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::report::ChannelReportRow;
use crate::domain::repository::ReportRepository;
use crate::domain::touchpoint::DateRange;
use crate::infrastructure::artifacts::write_channel_report;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSummary {
    pub rows: Vec<ChannelReportRow>,
    pub total_cost: f64,
    pub total_revenue: f64,
    /// Mean over rows with a positive CPO; zero when there are none
    pub mean_cpo: f64,
    /// Mean over rows with a positive ROAS; zero when there are none
    pub mean_roas: f64,
    pub csv_written: bool,
}

impl ReportSummary {
    fn from_rows(rows: Vec<ChannelReportRow>) -> Self {
        Self {
            total_cost: rows.iter().map(|r| r.cost).sum(),
            total_revenue: rows.iter().map(|r| r.ihc_revenue).sum(),
            mean_cpo: positive_mean(rows.iter().map(|r| r.cpo)),
            mean_roas: positive_mean(rows.iter().map(|r| r.roas)),
            rows,
            csv_written: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn positive_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| *v > 0.0)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub struct ChannelReporter {
    repository: Arc<dyn ReportRepository>,
}

impl ChannelReporter {
    pub fn new(repository: Arc<dyn ReportRepository>) -> Self {
        Self { repository }
    }

    pub async fn generate(&self, range: DateRange, report_path: &Path) -> Result<ReportSummary> {
        let aggregates = self
            .repository
            .aggregate_by_channel_date(range)
            .await
            .context("Failed to aggregate attribution by channel")?;

        self.repository
            .replace_report(&aggregates)
            .await
            .context("Failed to write channel reporting table")?;

        let mut summary =
            ReportSummary::from_rows(aggregates.iter().map(ChannelReportRow::from).collect());

        if summary.is_empty() {
            warn!("Channel report is empty ({})", range);
            return Ok(summary);
        }

        write_channel_report(report_path, &summary.rows)?;
        summary.csv_written = true;

        info!(
            rows = summary.rows.len(),
            path = %report_path.display(),
            "Channel report written"
        );
        info!(
            total_cost = summary.total_cost,
            total_revenue = summary.total_revenue,
            mean_cpo = summary.mean_cpo,
            mean_roas = summary.mean_roas,
            "Channel report totals"
        );

        Ok(summary)
    }
}
