// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Database Update Command
//!
//! This module implements the `attribution update` command for applying
//! database migrations to keep the schema in sync with the application version.
//!
//! # Architecture
//!
//! - **Layer:** CLI/Presentation
//! - **Purpose:** Database schema migration management
//! - **Integration:** CLI → SQLx Migrator → SQLite
//!
//! # Usage
//!
//! ```bash
//! # Apply all pending migrations
//! attribution update
//!
//! # Preview migrations without applying
//! attribution update --dry-run
//! ```
//!
//! The database comes from `database.url` in the configuration, or
//! `ATTRIBUTION_DATABASE_URL` when set.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use ihc_attribution_core::domain::config::PipelineConfig;
use ihc_attribution_core::infrastructure::db::{Database, MIGRATOR};

#[derive(Args)]
pub struct UpdateCommand {
    /// Perform a dry run without applying changes
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(cmd: UpdateCommand, config_override: Option<PathBuf>) -> Result<()> {
    println!("{}", "IHC Attribution Update".bold().green());

    let config = PipelineConfig::load_or_default(config_override).context("Failed to load configuration")?;

    println!("Connecting to database...");
    let database = Database::new(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    let pool = database.get_pool();

    // A fresh database has no migrations table yet.
    let applied_count = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
        .fetch_all(pool)
        .await
        .map(|rows| rows.len())
        .unwrap_or(0);

    let total_migrations = MIGRATOR.iter().count();

    println!(
        "Migration status: {} applied, {} total available.",
        applied_count, total_migrations
    );

    if applied_count < total_migrations {
        if cmd.dry_run {
            println!("Pending migrations found (Dry Run):");
            for migration in MIGRATOR.iter().skip(applied_count) {
                println!(" - {} {}", migration.version, migration.description);
            }
            println!("Skipping application due to --dry-run");
            return Ok(());
        }

        println!("Applying pending migrations...");
        database.migrate().await?;
        println!("{}", "✓ Database updated successfully.".green());
    } else {
        println!("{}", "✓ Database is up to date.".green());
    }

    Ok(())
}
