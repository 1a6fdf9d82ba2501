// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for web search functionality

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Search backends this node knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Brave,
    Bing,
    DuckDuckGo,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Brave => "brave",
            Self::Bing => "bing",
            Self::DuckDuckGo => "duckduckgo",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "brave" => Ok(Self::Brave),
            "bing" => Ok(Self::Bing),
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            other => Err(format!("unknown search provider '{}'", other)),
        }
    }
}

/// Per-provider settings; position in `SearchConfig::providers` is priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// Overrides the provider's public endpoint
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
    /// Local outbound quota
    pub requests_per_minute: u32,
    pub enabled: bool,
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::DuckDuckGo,
            base_url: None,
            api_key: None,
            timeout_ms: 10_000,
            requests_per_minute: 60,
            enabled: true,
        }
    }
}

/// Tunable relevance scoring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub term_overlap_weight: f64,
    pub domain_trust_weight: f64,
    pub freshness_weight: f64,
    /// Hosts (or host suffixes) that score full trust, besides .edu/.gov
    pub trusted_domains: Vec<String>,
    /// Substrings of a host marking forums / low quality sources
    pub low_quality_patterns: Vec<String>,
    /// Dates no older than this count as fresh
    pub recent_days: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            term_overlap_weight: 0.5,
            domain_trust_weight: 0.3,
            freshness_weight: 0.2,
            trusted_domains: [
                "wikipedia.org",
                "arxiv.org",
                "nature.com",
                "science.org",
                "britannica.com",
                "nih.gov",
                "who.int",
                "reuters.com",
                "apnews.com",
                "bbc.co.uk",
                "bbc.com",
                "developer.mozilla.org",
                "docs.rs",
                "doc.rust-lang.org",
                "python.org",
                "ieee.org",
                "acm.org",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            low_quality_patterns: [
                "blogspot",
                "wordpress",
                "tumblr",
                "reddit",
                "quora",
                "forum",
                "answers.",
                "pinterest",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            recent_days: 365,
        }
    }
}

/// Configuration for web search functionality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Providers in priority order
    pub providers: Vec<ProviderSettings>,
    /// Minimum back-off after a provider reports rate limiting
    pub rate_limit_cooldown_secs: u64,
    /// Default number of results per search
    pub default_num_results: usize,
    /// Upper bound accepted for `max_results`
    pub max_num_results: usize,
    pub scoring: ScoringConfig,
}

impl SearchConfig {
    /// Load configuration from environment variables
    ///
    /// `SEARCH_PROVIDERS` is a comma separated priority list
    /// (default "brave,bing,duckduckgo"); keyed providers without a key
    /// are left out.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timeout_ms = env::var("SEARCH_PROVIDER_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);
        let requests_per_minute = env::var("SEARCH_RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let order = env::var("SEARCH_PROVIDERS")
            .unwrap_or_else(|_| "brave,bing,duckduckgo".to_string());

        let providers = order
            .split(',')
            .filter_map(|name| name.parse::<ProviderKind>().ok())
            .filter_map(|kind| {
                let api_key = match kind {
                    ProviderKind::Brave => env::var("BRAVE_API_KEY").ok(),
                    ProviderKind::Bing => env::var("BING_API_KEY").ok(),
                    ProviderKind::DuckDuckGo => None,
                };
                if kind != ProviderKind::DuckDuckGo
                    && api_key.as_deref().map_or(true, str::is_empty)
                {
                    return None;
                }
                Some(ProviderSettings {
                    kind,
                    base_url: None,
                    api_key,
                    timeout_ms,
                    requests_per_minute,
                    enabled: true,
                })
            })
            .collect();

        Self {
            providers,
            rate_limit_cooldown_secs: env::var("SEARCH_RATE_LIMIT_COOLDOWN_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_cooldown_secs),
            ..defaults
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.providers.iter().all(|p| !p.enabled) {
            return Err("at least one search provider must be enabled".to_string());
        }
        for provider in &self.providers {
            if provider.timeout_ms == 0 {
                return Err(format!("{} timeout must be greater than 0", provider.kind));
            }
            if provider.requests_per_minute == 0 {
                return Err(format!(
                    "{} rate limit must be greater than 0",
                    provider.kind
                ));
            }
        }
        if self.default_num_results == 0 || self.default_num_results > self.max_num_results {
            return Err("default_num_results must be between 1 and max_num_results".to_string());
        }
        let s = &self.scoring;
        let total = s.term_overlap_weight + s.domain_trust_weight + s.freshness_weight;
        if s.term_overlap_weight < 0.0
            || s.domain_trust_weight < 0.0
            || s.freshness_weight < 0.0
            || (total - 1.0).abs() > 1e-6
        {
            return Err("scoring weights must be non-negative and sum to 1".to_string());
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            // DuckDuckGo needs no API key so it is always configured
            providers: vec![ProviderSettings::new(ProviderKind::DuckDuckGo)],
            rate_limit_cooldown_secs: 60,
            default_num_results: 10,
            max_num_results: 50,
            scoring: ScoringConfig::default(),
        }
    }
}
