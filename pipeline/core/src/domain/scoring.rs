// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Scoring
//!
//! Domain interface for the external attribution-scoring service.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption boundary around the IHC API
//!
//! The service is opaque: it receives whole journeys and returns one weight
//! per (conversion, session). Implementations live in
//! `crate::infrastructure::ihc_client`.

use async_trait::async_trait;

use crate::domain::attribution::AttributionWeight;
use crate::domain::journey::Batch;

#[async_trait]
pub trait AttributionScorer: Send + Sync {
    /// Submit one batch in a single call. No retries happen here.
    async fn score(&self, batch: &Batch) -> Result<ScoringResponse, ScoringError>;
}

#[derive(Debug, Clone, Default)]
pub struct ScoringResponse {
    /// `statusCode` echoed in the response body, when present.
    pub status_code: Option<i64>,
    pub weights: Vec<AttributionWeight>,
    /// Non-fatal errors reported next to a successful status.
    pub partial_failures: Vec<serde_json::Value>,
}

impl ScoringResponse {
    pub fn has_partial_failures(&self) -> bool {
        !self.partial_failures.is_empty()
    }
}

/// Errors that fail a single batch. None of them stop the run.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}
