// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Top-level configuration of the research service
//!
//! Every section can be given in a TOML file or through environment
//! variables; missing keys take their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use super::aggregator::AggregationConfig;
use super::retry::RetryConfig;
use crate::cache::CacheConfig;
use crate::search::config::SearchConfig;
use crate::search::content::ContentFetchConfig;

const DEFAULT_BOOKMARKS_PATH: &str = "bookmarks.jsonl";

/// Configuration for [`ResearchService`](super::ResearchService)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub search: SearchConfig,
    pub fetch: ContentFetchConfig,
    pub cache: CacheConfig,
    pub aggregation: AggregationConfig,
    pub retry: RetryConfig,
    /// JSON Lines file backing the bookmark store
    pub bookmarks_path: PathBuf,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            fetch: ContentFetchConfig::default(),
            cache: CacheConfig::default(),
            aggregation: AggregationConfig::default(),
            retry: RetryConfig::default(),
            bookmarks_path: PathBuf::from(DEFAULT_BOOKMARKS_PATH),
        }
    }
}

impl ResearchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let retry_defaults = RetryConfig::default();
        Self {
            search: SearchConfig::from_env(),
            fetch: ContentFetchConfig::from_env(),
            cache: CacheConfig::from_env(),
            aggregation: AggregationConfig::default(),
            retry: RetryConfig {
                max_retries: env::var("RESEARCH_MAX_RETRIES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(retry_defaults.max_retries),
                ..retry_defaults
            },
            bookmarks_path: env::var("RESEARCH_BOOKMARKS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_BOOKMARKS_PATH)),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.search.validate()?;
        self.fetch.validate()?;
        self.cache.validate()?;
        self.aggregation.validate()?;
        if self.bookmarks_path.as_os_str().is_empty() {
            return Err("bookmarks_path must not be empty".to_string());
        }
        Ok(())
    }
}
