// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pipeline stages and run identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ordered stages of a full run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    BuildJourneys,
    SubmitAndWrite,
    Report,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::BuildJourneys => f.write_str("BUILD_JOURNEYS"),
            PipelineStage::SubmitAndWrite => f.write_str("SUBMIT_AND_WRITE"),
            PipelineStage::Report => f.write_str("REPORT"),
        }
    }
}

/// What a single invocation should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepSelection {
    BuildJourneys,
    SendToApi,
    GenerateReport,
    #[default]
    All,
}

impl StepSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepSelection::BuildJourneys => "build-journeys",
            StepSelection::SendToApi => "send-to-api",
            StepSelection::GenerateReport => "generate-report",
            StepSelection::All => "all",
        }
    }

    /// Whether the selection calls the scoring service.
    pub fn requires_scoring(&self) -> bool {
        matches!(self, StepSelection::SendToApi | StepSelection::All)
    }
}

impl fmt::Display for StepSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build-journeys" => Ok(StepSelection::BuildJourneys),
            "send-to-api" => Ok(StepSelection::SendToApi),
            "generate-report" => Ok(StepSelection::GenerateReport),
            "all" => Ok(StepSelection::All),
            other => Err(format!(
                "unknown step '{}'; expected build-journeys, send-to-api, generate-report or all",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_selection_parse() {
        for step in [
            StepSelection::BuildJourneys,
            StepSelection::SendToApi,
            StepSelection::GenerateReport,
            StepSelection::All,
        ] {
            assert_eq!(step.as_str().parse::<StepSelection>().unwrap(), step);
        }
        assert!("send".parse::<StepSelection>().is_err());
        assert!(!StepSelection::BuildJourneys.requires_scoring());
        assert!(StepSelection::All.requires_scoring());
    }

    #[test]
    fn test_stage_order() {
        assert!(PipelineStage::BuildJourneys < PipelineStage::SubmitAndWrite);
        assert!(PipelineStage::SubmitAndWrite < PipelineStage::Report);
        assert_eq!(PipelineStage::SubmitAndWrite.to_string(), "SUBMIT_AND_WRITE");
    }
}
