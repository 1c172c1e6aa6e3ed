// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the attribution CLI

pub mod config;
pub mod run;
pub mod update;

pub use self::config::ConfigCommand;
pub use self::run::RunCommand;
pub use self::update::UpdateCommand;
