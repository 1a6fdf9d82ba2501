// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for content fetching and extraction
//!
//! Defines settings for HTTP fetching, size limits and the extraction
//! heuristics.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; WebResearchBot/1.0; +https://fabstir.com)";

/// Configuration for content fetching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFetchConfig {
    /// Maximum concurrent extractions per service (default: 4)
    pub concurrency_limit: usize,
    /// Maximum body size per page in bytes (default: 2 MiB)
    pub max_bytes_per_page: u64,
    /// Timeout per page fetch in seconds (default: 15)
    pub timeout_secs: u64,
    /// Maximum redirect hops (default: 5)
    pub max_redirects: usize,
    /// Maximum characters of main text kept (default: 20000)
    pub max_text_chars: usize,
    /// Sentences in the extractive summary (default: 3)
    pub summary_sentences: usize,
    /// Minimum visible text for a main-block candidate (default: 80)
    pub min_block_chars: usize,
    /// Minimum text/markup ratio for a main-block candidate (default: 0.05)
    pub min_text_density: f64,
    /// Allow localhost and private ranges (default: false)
    pub allow_private_hosts: bool,
    pub user_agent: String,
}

impl ContentFetchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            concurrency_limit: env::var("CONTENT_FETCH_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.concurrency_limit),
            max_bytes_per_page: env::var("CONTENT_FETCH_MAX_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_bytes_per_page),
            timeout_secs: env::var("CONTENT_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            max_redirects: env::var("CONTENT_FETCH_MAX_REDIRECTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_redirects),
            max_text_chars: env::var("CONTENT_FETCH_MAX_TEXT_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_text_chars),
            summary_sentences: env::var("CONTENT_SUMMARY_SENTENCES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.summary_sentences),
            allow_private_hosts: env::var("CONTENT_FETCH_ALLOW_PRIVATE")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            user_agent: env::var("CONTENT_FETCH_USER_AGENT").unwrap_or(defaults.user_agent),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency_limit == 0 {
            return Err("concurrency_limit must be at least 1".to_string());
        }
        if self.max_bytes_per_page == 0 {
            return Err("max_bytes_per_page must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be at least 1".to_string());
        }
        if self.max_text_chars < 100 {
            return Err("max_text_chars must be at least 100".to_string());
        }
        if self.summary_sentences == 0 {
            return Err("summary_sentences must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_text_density) {
            return Err("min_text_density must be between 0 and 1".to_string());
        }
        Ok(())
    }
}

impl Default for ContentFetchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 4,
            max_bytes_per_page: 2 * 1024 * 1024,
            timeout_secs: 15,
            max_redirects: 5,
            max_text_chars: 20_000,
            summary_sentences: 3,
            min_block_chars: 80,
            min_text_density: 0.05,
            allow_private_hosts: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
