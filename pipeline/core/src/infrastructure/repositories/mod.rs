// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Store implementations and backend selection.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use std::sync::Arc;

use crate::domain::repository::{
    AttributionRepository, ReportRepository, StorageBackend, TouchpointStore,
};
use crate::infrastructure::db::Database;

/// The three store interfaces, backed by one implementation.
#[derive(Clone)]
pub struct StoreHandles {
    pub touchpoints: Arc<dyn TouchpointStore>,
    pub attribution: Arc<dyn AttributionRepository>,
    pub reports: Arc<dyn ReportRepository>,
}

impl StoreHandles {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: TouchpointStore + AttributionRepository + ReportRepository + 'static,
    {
        Self {
            touchpoints: store.clone(),
            attribution: store.clone(),
            reports: store,
        }
    }

    /// Open the configured backend. SQLite databases are migrated on open.
    pub async fn open(backend: &StorageBackend) -> Result<Self> {
        match backend {
            StorageBackend::Sqlite(config) => {
                let database = Database::connect_and_migrate(&config.connection_string).await?;
                Ok(Self::from_store(Arc::new(SqliteStore::new(database.get_pool().clone()))))
            }
        }
    }
}
