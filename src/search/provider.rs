// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search provider trait definition and the closed set of backends

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use std::time::Duration;

use super::bing::BingSearchProvider;
use super::brave::BraveSearchProvider;
use super::config::{ProviderKind, ProviderSettings};
use super::duckduckgo::DuckDuckGoProvider;
use super::types::RawHit;
use crate::error::{ResearchError, Result};

/// Trait for implementing search providers
///
/// Providers are composed into a [`ProviderChain`](super::chain::ProviderChain)
/// which tries them in configured order.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Perform a web search
    ///
    /// # Arguments
    /// * `query` - The search query string
    /// * `num_results` - Maximum number of hits to return
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<RawHit>>;

    /// Get the provider name for logging
    fn name(&self) -> &'static str;

    /// Check if the provider is available (has API key, etc.)
    fn is_available(&self) -> bool;

    /// Upper bound for a single call
    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Local outbound quota
    fn requests_per_minute(&self) -> u32 {
        60
    }
}

/// The backends a node can be configured with
pub enum ProviderBackend {
    Brave(BraveSearchProvider),
    Bing(BingSearchProvider),
    DuckDuckGo(DuckDuckGoProvider),
}

impl ProviderBackend {
    /// Build a backend from its settings
    pub fn from_settings(settings: &ProviderSettings, user_agent: &str) -> Result<Self> {
        Ok(match settings.kind {
            ProviderKind::Brave => Self::Brave(BraveSearchProvider::new(settings)?),
            ProviderKind::Bing => Self::Bing(BingSearchProvider::new(settings)?),
            ProviderKind::DuckDuckGo => {
                Self::DuckDuckGo(DuckDuckGoProvider::new(settings, user_agent)?)
            }
        })
    }

    /// Build the enabled backends in priority order
    pub fn from_config(settings: &[ProviderSettings], user_agent: &str) -> Result<Vec<Self>> {
        settings
            .iter()
            .filter(|s| s.enabled)
            .map(|s| Self::from_settings(s, user_agent))
            .collect()
    }
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $call:expr) => {
        match $self {
            ProviderBackend::Brave($p) => $call,
            ProviderBackend::Bing($p) => $call,
            ProviderBackend::DuckDuckGo($p) => $call,
        }
    };
}

#[async_trait]
impl SearchProvider for ProviderBackend {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<RawHit>> {
        dispatch!(self, p => p.search(query, num_results).await)
    }

    fn name(&self) -> &'static str {
        dispatch!(self, p => p.name())
    }

    fn is_available(&self) -> bool {
        dispatch!(self, p => p.is_available())
    }

    fn timeout(&self) -> Duration {
        dispatch!(self, p => p.timeout())
    }

    fn requests_per_minute(&self) -> u32 {
        dispatch!(self, p => p.requests_per_minute())
    }
}

/// Map a provider's HTTP status onto the error taxonomy
pub(crate) fn check_status(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(60);
        return Err(ResearchError::RateLimited { retry_after_secs });
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ResearchError::provider_unavailable(
            provider,
            format!("credentials rejected (HTTP {})", status.as_u16()),
        ));
    }

    if !status.is_success() {
        return Err(ResearchError::HttpError {
            status: status.as_u16(),
        });
    }

    Ok(response)
}

/// Shared HTTP client for API-backed providers
pub(crate) fn build_client(timeout_ms: u64, user_agent: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_millis(timeout_ms));
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    builder
        .build()
        .map_err(|e| ResearchError::ConnectionError(format!("failed to create HTTP client: {}", e)))
}
