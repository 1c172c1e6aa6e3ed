// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pipeline Run Command
//!
//! Implements `attribution run`, which executes the whole pipeline or one
//! of its steps against the configured store and API.
//!
//! # Usage
//!
//! ```bash
//! # Build journeys, score them and generate the report
//! attribution run
//!
//! # Only rebuild the journeys CSV for January
//! attribution run --step build-journeys --start-date 2024-01-01 --end-date 2024-01-31
//!
//! # Score a previously built journeys file
//! attribution run --step send-to-api --journeys-path out/journeys.csv
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use ihc_attribution_core::application::pipeline::{AttributionPipeline, PipelineOutcome, RunRequest};
use ihc_attribution_core::domain::config::PipelineConfig;
use ihc_attribution_core::domain::pipeline::StepSelection;
use ihc_attribution_core::domain::repository::{SqliteConfig, StorageBackend};
use ihc_attribution_core::domain::touchpoint::DateRange;
use ihc_attribution_core::infrastructure::repositories::StoreHandles;

#[derive(Args, Debug)]
pub struct RunCommand {
    /// Step to run: build-journeys, send-to-api, generate-report or all
    #[arg(long, default_value = "all")]
    pub step: StepSelection,

    /// First conversion/session date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<NaiveDate>,

    /// Last conversion/session date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<NaiveDate>,

    /// Journeys CSV (default: pipeline.journeys_path from config)
    #[arg(long, value_name = "FILE")]
    pub journeys_path: Option<PathBuf>,

    /// Channel report CSV (default: pipeline.report_path from config)
    #[arg(long, value_name = "FILE")]
    pub report_path: Option<PathBuf>,
}

impl RunCommand {
    pub fn date_range(&self) -> Result<DateRange> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                anyhow::bail!("--start-date {} is after --end-date {}", start, end);
            }
        }
        Ok(DateRange::new(self.start_date, self.end_date))
    }

    /// Explicit paths win over the configured ones.
    pub fn artifact_paths(&self, config: &PipelineConfig) -> (PathBuf, PathBuf) {
        (
            self.journeys_path
                .clone()
                .unwrap_or_else(|| config.pipeline.journeys_path.clone()),
            self.report_path
                .clone()
                .unwrap_or_else(|| config.pipeline.report_path.clone()),
        )
    }
}

/// Returns whether the run succeeded; the caller maps `false` to exit code 1.
pub async fn execute(cmd: RunCommand, config_override: Option<PathBuf>) -> Result<bool> {
    let config = PipelineConfig::load_or_default(config_override).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let range = cmd.date_range()?;
    let (journeys_path, report_path) = cmd.artifact_paths(&config);

    println!(
        "{} {} ({})",
        "IHC Attribution".bold().green(),
        cmd.step.to_string().bold(),
        range
    );

    let backend = StorageBackend::Sqlite(SqliteConfig {
        connection_string: config.database.url.clone(),
    });
    let stores = StoreHandles::open(&backend)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    let pipeline = AttributionPipeline::from_config(&config, &stores, cmd.step)?;

    let outcome = pipeline
        .run(RunRequest {
            step: cmd.step,
            range,
            journeys_path: &journeys_path,
            report_path: &report_path,
        })
        .await?;

    print_outcome(&outcome);
    Ok(outcome.success)
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!();
    println!("{} {}", "Run:".bold(), outcome.run_id);

    if let Some(build) = &outcome.build {
        println!("{}", "Journeys:".bold());
        println!("  Built: {}", build.journey_count());
        println!("  Touchpoints: {}", build.touchpoint_count());
        println!("  Skipped: {}", build.skipped_count());
    }

    if let Some(submission) = &outcome.submission {
        println!("{}", "Submission:".bold());
        println!(
            "  Batches: {} sent, {} failed",
            submission.batches_submitted,
            submission.batches_failed.len()
        );
        println!("  Conversions attributed: {}", submission.conversions_attributed);
        println!("  Records written: {}", submission.records_written);
        if !submission.skipped.is_empty() {
            println!("  Skipped (oversized): {}", submission.skipped.len());
        }
        if !submission.normalization_failures.is_empty() {
            println!(
                "  {}",
                format!("Normalization failures: {}", submission.normalization_failures.len()).yellow()
            );
        }
        if !submission.verification.is_clean() {
            println!(
                "  {}",
                format!(
                    "Weight sum violations: {}",
                    submission.verification.violations.len()
                )
                .yellow()
            );
        }
    }

    if let Some(report) = &outcome.report {
        println!("{}", "Report:".bold());
        println!("  Rows: {}", report.rows.len());
        println!("  Total cost: {:.2}", report.total_cost);
        println!("  Total revenue: {:.2}", report.total_revenue);
        println!("  Mean CPO: {:.2}", report.mean_cpo);
        println!("  Mean ROAS: {:.2}", report.mean_roas);
    }

    println!();
    if outcome.success {
        println!("{}", "✓ Pipeline completed successfully".green());
    } else {
        let stage = outcome
            .halted_at
            .map(|stage| stage.to_string())
            .unwrap_or_else(|| "unknown stage".to_string());
        println!("{}", format!("✗ Pipeline halted after {}", stage).red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        run: RunCommand,
    }

    fn parse(args: &[&str]) -> RunCommand {
        let mut argv = vec!["attribution"];
        argv.extend_from_slice(args);
        Harness::try_parse_from(argv).unwrap().run
    }

    #[test]
    fn test_defaults() {
        let cmd = parse(&[]);
        assert_eq!(cmd.step, StepSelection::All);
        assert!(cmd.date_range().unwrap().is_unbounded());

        let (journeys, report) = cmd.artifact_paths(&PipelineConfig::default());
        assert_eq!(journeys, PathBuf::from("customer_journeys.csv"));
        assert_eq!(report, PathBuf::from("channel_reporting.csv"));
    }

    #[test]
    fn test_step_and_dates() {
        let cmd = parse(&[
            "--step",
            "send-to-api",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "2024-01-31",
            "--journeys-path",
            "out/j.csv",
        ]);

        assert_eq!(cmd.step, StepSelection::SendToApi);
        let range = cmd.date_range().unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(cmd.artifact_paths(&PipelineConfig::default()).0, PathBuf::from("out/j.csv"));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Harness::try_parse_from(["attribution", "--step", "everything"]).is_err());
        assert!(Harness::try_parse_from(["attribution", "--start-date", "01/02/2024"]).is_err());

        let cmd = parse(&["--start-date", "2024-02-01", "--end-date", "2024-01-01"]);
        assert!(cmd.date_range().is_err());
    }
}
