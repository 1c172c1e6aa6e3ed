// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the touchpoint store. The interfaces are
//! defined here and implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Data | Implementations |
//! |-------|------|----------------|
//! | `TouchpointStore` | conversions, sessions | `SqliteStore`, `InMemoryStore` |
//! | `AttributionRepository` | attribution weights | `SqliteStore`, `InMemoryStore` |
//! | `ReportRepository` | channel/date aggregates | `SqliteStore`, `InMemoryStore` |
//!
//! Writes are whole-table replacements: every run owns the table it writes.

use async_trait::async_trait;

use crate::domain::attribution::{AttributionWeight, ConversionWeightSum};
use crate::domain::report::ChannelDateAggregate;
use crate::domain::touchpoint::{Conversion, DateRange, Touchpoint};

/// Storage backend selection
#[derive(Debug, Clone)]
pub enum StorageBackend {
    Sqlite(SqliteConfig),
}

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub connection_string: String,
}

/// Read side of the source tables
#[async_trait]
pub trait TouchpointStore: Send + Sync {
    /// All conversions, ordered by conversion time then id
    async fn load_conversions(&self) -> Result<Vec<Conversion>, RepositoryError>;

    /// All sessions, ordered by session time then id
    async fn load_touchpoints(&self) -> Result<Vec<Touchpoint>, RepositoryError>;
}

/// Persisted attribution weights
#[async_trait]
pub trait AttributionRepository: Send + Sync {
    /// Replace the whole table with `weights` atomically; returns rows written
    async fn replace_all(&self, weights: &[AttributionWeight]) -> Result<usize, RepositoryError>;

    /// Weight sum per conversion as currently persisted
    async fn weight_sums(&self) -> Result<Vec<ConversionWeightSum>, RepositoryError>;
}

/// Channel reporting aggregates
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Group persisted weights by channel and session date
    async fn aggregate_by_channel_date(
        &self,
        range: DateRange,
    ) -> Result<Vec<ChannelDateAggregate>, RepositoryError>;

    /// Replace the reporting table atomically; returns rows written
    async fn replace_report(&self, rows: &[ChannelDateAggregate]) -> Result<usize, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<chrono::ParseError> for RepositoryError {
    fn from(err: chrono::ParseError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
