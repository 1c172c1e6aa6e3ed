// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod batch_partitioner;
pub mod channel_report;
pub mod journey_builder;
pub mod pipeline;
pub mod submission;
pub mod weight_normalizer;

// Re-export services for convenience
pub use channel_report::{ChannelReporter, ReportSummary};
pub use journey_builder::JourneyBuilder;
pub use pipeline::{AttributionPipeline, PipelineOutcome};
pub use submission::{SubmissionService, SubmissionSummary};
