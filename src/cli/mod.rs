// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod bookmark;
pub mod cache;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::research::{ResearchConfig, ResearchService};
use crate::search::types::SearchType;

/// Web research CLI
#[derive(Parser, Debug)]
#[command(name = "research-cli")]
#[command(version)]
#[command(about = "Search, extract and summarize web sources", long_about = None)]
pub struct Cli {
    /// TOML configuration file (environment variables are used when absent)
    #[arg(long, global = true, env = "RESEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ranked web search
    Search {
        query: String,

        /// Search type (general/academic/news/technical)
        #[arg(long = "type", default_value = "general", value_parser = parse_search_type)]
        search_type: SearchType,

        /// Maximum number of results
        #[arg(long)]
        max: Option<usize>,
    },

    /// Fetch a page and extract its main content
    Extract { url: String },

    /// Build a cited report from the best sources for a topic
    Summary {
        topic: String,

        /// Number of sources to read
        #[arg(long, default_value_t = 5)]
        sources: usize,
    },

    /// Manage saved sources
    #[command(subcommand)]
    Bookmark(bookmark::BookmarkCommand),

    /// Inspect or purge the result cache
    #[command(subcommand)]
    Cache(cache::CacheCommand),
}

fn parse_search_type(s: &str) -> std::result::Result<SearchType, String> {
    s.parse().map_err(|e: crate::error::ResearchError| e.to_string())
}

/// Load configuration from `path` or the environment
pub fn load_config(path: Option<&PathBuf>) -> Result<ResearchConfig> {
    let config = match path {
        Some(path) => ResearchConfig::from_toml_file(path)?,
        None => ResearchConfig::from_env(),
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    Ok(config)
}

/// Token cancelled on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            token.cancel();
        }
    });
    cancel
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("encoding output")?;
    println!("{}", json);
    Ok(())
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Bookmark(command) => bookmark::run(command, &config),
        Commands::Cache(command) => cache::run(command, &config),
        Commands::Search {
            query,
            search_type,
            max,
        } => {
            let service = ResearchService::from_config(config)?;
            let cancel = cancel_on_ctrl_c();
            let response = service.search(&query, search_type, max, &cancel).await?;
            info!("{} results", response.results.len());
            print_json(&response)
        }
        Commands::Extract { url } => {
            let service = ResearchService::from_config(config)?;
            let cancel = cancel_on_ctrl_c();
            let content = service.extract_content(&url, &cancel).await?;
            print_json(&content)
        }
        Commands::Summary { topic, sources } => {
            let service = ResearchService::from_config(config)?;
            let cancel = cancel_on_ctrl_c();
            let report = service.research_summary(&topic, sources, &cancel).await?;
            print_json(&report)
        }
    }
}
