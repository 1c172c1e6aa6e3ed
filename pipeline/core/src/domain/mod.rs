// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Source records, derived journeys, attribution weights and the
//! interfaces the application layer depends on.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and collaborator contracts, no I/O

pub mod touchpoint;
pub mod journey;
pub mod attribution;
pub mod scoring;
pub mod repository;
pub mod report;
pub mod pipeline;
pub mod config;
