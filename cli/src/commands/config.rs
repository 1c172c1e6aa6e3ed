// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use ihc_attribution_core::domain::config::PipelineConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./attribution-config.yaml)
        #[arg(short, long, default_value = "./attribution-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

/// Keep the first few characters of a literal key; `env:` references are shown as-is.
pub fn mask_api_key(key: &str) -> String {
    if key.starts_with("env:") {
        return key.to_string();
    }
    let visible: String = key.chars().take(4).collect();
    format!("{}****", visible)
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let mut config = PipelineConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;
    config.api.api_key = config.api.api_key.as_deref().map(mask_api_key);

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. ATTRIBUTION_CONFIG_PATH: {}",
            std::env::var("ATTRIBUTION_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./attribution-config.yaml");
        println!("  4. ~/.attribution/config.yaml");
        println!("  5. /etc/attribution/config.yaml");
        println!();
    }

    if as_yaml {
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
        print!("{}", yaml);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Database:".bold());
    println!("  URL: {}", config.database.url);
    println!();

    println!("{}", "IHC API:".bold());
    println!("  Endpoint: {}", config.api.endpoint);
    println!(
        "  API key: {}",
        config.api.api_key.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  Conversion type: {}",
        if config.api.conv_type_id.is_empty() {
            "(not set)"
        } else {
            config.api.conv_type_id.as_str()
        }
    );
    println!("  Max journeys per request: {}", config.api.max_journeys_per_request);
    println!("  Max sessions per request: {}", config.api.max_sessions_per_request);
    println!("  Request timeout: {:?}", config.api.request_timeout);
    println!("  Rate limit delay: {:?}", config.api.rate_limit_delay);
    println!();

    println!("{}", "Artifacts:".bold());
    println!("  Journeys: {}", config.pipeline.journeys_path.display());
    println!("  Report: {}", config.pipeline.report_path.display());
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = PipelineConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    if let Err(e) = config.api.validate_credentials() {
        println!("{}", format!("⚠ API credentials incomplete: {}", e).yellow());
        println!("  build-journeys and generate-report will still run");
    }

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
