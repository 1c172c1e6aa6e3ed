// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pipeline Orchestrator
//!
//! Sequences `BUILD_JOURNEYS → SUBMIT_AND_WRITE → REPORT`. Each stage can also
//! run on its own; `send_to_api` enters at `SUBMIT_AND_WRITE` from the
//! journeys CSV written by an earlier build.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Stage sequencing and gating
//!
//! Gating:
//! - no journeys built: the run halts at `BUILD_JOURNEYS`
//! - no weights written: the run halts at `SUBMIT_AND_WRITE`
//!
//! A halted run reports `success = false`; it is not an `Err`. Errors are
//! reserved for stages that could not run at all (store or file failures).

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use crate::application::batch_partitioner::BatchLimits;
use crate::application::channel_report::{ChannelReporter, ReportSummary};
use crate::application::journey_builder::JourneyBuilder;
use crate::application::submission::{SubmissionService, SubmissionSummary};
use crate::domain::config::PipelineConfig;
use crate::domain::journey::{Journey, JourneyBuild};
use crate::domain::pipeline::{PipelineStage, RunId, StepSelection};
use crate::domain::scoring::AttributionScorer;
use crate::domain::touchpoint::DateRange;
use crate::infrastructure::artifacts::{read_journeys, write_journeys};
use crate::infrastructure::ihc_client::IhcApiClient;
use crate::infrastructure::repositories::StoreHandles;

/// Inputs for one invocation.
#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub step: StepSelection,
    pub range: DateRange,
    pub journeys_path: &'a Path,
    pub report_path: &'a Path,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub run_id: RunId,
    pub step: StepSelection,
    pub success: bool,
    pub completed: Vec<PipelineStage>,
    /// Stage whose output blocked the next transition
    pub halted_at: Option<PipelineStage>,
    pub build: Option<JourneyBuild>,
    pub submission: Option<SubmissionSummary>,
    pub report: Option<ReportSummary>,
}

impl PipelineOutcome {
    fn new(run_id: RunId, step: StepSelection) -> Self {
        Self {
            run_id,
            step,
            success: true,
            completed: Vec::new(),
            halted_at: None,
            build: None,
            submission: None,
            report: None,
        }
    }

    fn halt(mut self, stage: PipelineStage) -> Self {
        self.success = false;
        self.halted_at = Some(stage);
        self
    }
}

pub struct AttributionPipeline {
    builder: JourneyBuilder,
    reporter: ChannelReporter,
    submission: Option<SubmissionService>,
}

impl AttributionPipeline {
    /// A pipeline that can build journeys and reports but not score them.
    pub fn new(stores: &StoreHandles) -> Self {
        Self {
            builder: JourneyBuilder::new(stores.touchpoints.clone()),
            reporter: ChannelReporter::new(stores.reports.clone()),
            submission: None,
        }
    }

    pub fn with_scorer(
        mut self,
        scorer: Arc<dyn AttributionScorer>,
        stores: &StoreHandles,
        limits: BatchLimits,
        rate_limit_delay: std::time::Duration,
    ) -> Self {
        self.submission = Some(SubmissionService::new(
            scorer,
            stores.attribution.clone(),
            limits,
            rate_limit_delay,
        ));
        self
    }

    /// Wire the pipeline for `step`. The IHC client is only built (and its
    /// credentials only checked) when the step calls the service.
    pub fn from_config(config: &PipelineConfig, stores: &StoreHandles, step: StepSelection) -> Result<Self> {
        let pipeline = Self::new(stores);
        if !step.requires_scoring() {
            return Ok(pipeline);
        }

        let client = IhcApiClient::from_config(&config.api).context("Failed to configure IHC API client")?;
        let limits = BatchLimits::new(
            config.api.max_journeys_per_request,
            config.api.max_sessions_per_request,
        );
        Ok(pipeline.with_scorer(Arc::new(client), stores, limits, config.api.rate_limit_delay))
    }

    pub async fn run(&self, request: RunRequest<'_>) -> Result<PipelineOutcome> {
        let run_id = RunId::new();
        let span = info_span!("pipeline_run", run_id = %run_id, step = %request.step);

        async move {
            info!(range = %request.range, "Pipeline run started");
            let outcome = PipelineOutcome::new(run_id, request.step);
            let outcome = match request.step {
                StepSelection::BuildJourneys => {
                    self.build_stage(outcome, request.range, request.journeys_path).await?
                }
                StepSelection::SendToApi => self.send_to_api(outcome, request.journeys_path).await?,
                StepSelection::GenerateReport => {
                    self.report_stage(outcome, request.range, request.report_path).await?
                }
                StepSelection::All => self.run_all(outcome, &request).await?,
            };

            if outcome.success {
                info!(stages = ?outcome.completed, "Pipeline run completed");
            } else {
                warn!(halted_at = ?outcome.halted_at, "Pipeline run halted");
            }
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn run_all(&self, outcome: PipelineOutcome, request: &RunRequest<'_>) -> Result<PipelineOutcome> {
        let outcome = self.build_stage(outcome, request.range, request.journeys_path).await?;
        if !outcome.success {
            return Ok(outcome);
        }

        let journeys = outcome
            .build
            .as_ref()
            .map(|build| build.journeys().cloned().collect())
            .unwrap_or_default();
        let outcome = self.submit_stage(outcome, journeys).await?;
        if !outcome.success {
            return Ok(outcome);
        }

        self.report_stage(outcome, request.range, request.report_path).await
    }

    /// Build journeys for `range` and write them to the journeys CSV.
    async fn build_stage(
        &self,
        mut outcome: PipelineOutcome,
        range: DateRange,
        journeys_path: &Path,
    ) -> Result<PipelineOutcome> {
        let build = self.builder.build(range).await?;
        let journey_count = build.journey_count();

        if journey_count == 0 {
            warn!("No customer journeys built; nothing to send");
            outcome.build = Some(build);
            return Ok(outcome.halt(PipelineStage::BuildJourneys));
        }

        let journeys: Vec<Journey> = build.journeys().cloned().collect();
        let rows = write_journeys(journeys_path, &journeys)
            .with_context(|| format!("Failed to write journeys to {}", journeys_path.display()))?;
        info!(rows, path = %journeys_path.display(), "Customer journeys written");

        outcome.build = Some(build);
        outcome.completed.push(PipelineStage::BuildJourneys);
        Ok(outcome)
    }

    async fn send_to_api(&self, outcome: PipelineOutcome, journeys_path: &Path) -> Result<PipelineOutcome> {
        let journeys = read_journeys(journeys_path)
            .with_context(|| format!("Failed to read journeys from {}", journeys_path.display()))?;
        info!(journeys = journeys.len(), path = %journeys_path.display(), "Loaded customer journeys");

        if journeys.is_empty() {
            warn!("Journeys file is empty; nothing to send");
            return Ok(outcome.halt(PipelineStage::BuildJourneys));
        }
        self.submit_stage(outcome, journeys).await
    }

    async fn submit_stage(&self, mut outcome: PipelineOutcome, journeys: Vec<Journey>) -> Result<PipelineOutcome> {
        let submission = self
            .submission
            .as_ref()
            .ok_or_else(|| anyhow!("IHC API client is not configured"))?;

        let summary = submission.submit(journeys).await?;
        let written = summary.records_written;
        outcome.submission = Some(summary);

        if written == 0 {
            warn!("No attribution weights written; skipping report");
            return Ok(outcome.halt(PipelineStage::SubmitAndWrite));
        }

        outcome.completed.push(PipelineStage::SubmitAndWrite);
        Ok(outcome)
    }

    async fn report_stage(
        &self,
        mut outcome: PipelineOutcome,
        range: DateRange,
        report_path: &Path,
    ) -> Result<PipelineOutcome> {
        let summary = self.reporter.generate(range, report_path).await?;
        outcome.report = Some(summary);
        outcome.completed.push(PipelineStage::Report);
        Ok(outcome)
    }
}
