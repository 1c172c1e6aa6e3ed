// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! IHC attribution pipeline core
//!
//! Builds customer journeys from the touchpoint store, scores them through
//! the IHC attribution API and writes normalized weights and channel
//! reports back.
//!
//! # Architecture
//!
//! - **Domain:** records, journeys, weights and the store/scoring interfaces
//! - **Application:** journey builder, partitioner, normalizer, submission, reporting, orchestration
//! - **Infrastructure:** SQLite and in-memory stores, HTTP client, CSV artifacts

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
