// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod artifacts;
pub mod db;
pub mod ihc_client;
pub mod repositories;

pub use ihc_client::IhcApiClient;
pub use repositories::{InMemoryStore, SqliteStore, StoreHandles};
