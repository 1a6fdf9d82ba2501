// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Brave Search API provider
//!
//! Preferred provider when a key is configured: privacy focused with a
//! usable free tier.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::config::ProviderSettings;
use super::provider::{build_client, check_status, SearchProvider};
use super::types::RawHit;
use crate::error::{ResearchError, Result};

const BRAVE_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

/// Brave Search API provider
pub struct BraveSearchProvider {
    api_key: String,
    base_url: String,
    timeout_ms: u64,
    requests_per_minute: u32,
    client: Client,
}

impl BraveSearchProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        Ok(Self {
            api_key: settings.api_key.clone().unwrap_or_default(),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| BRAVE_API_URL.to_string()),
            timeout_ms: settings.timeout_ms,
            requests_per_minute: settings.requests_per_minute,
            client: build_client(settings.timeout_ms, None)?,
        })
    }
}

#[async_trait]
impl SearchProvider for BraveSearchProvider {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<RawHit>> {
        let response = self
            .client
            .get(&self.base_url)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &num_results.min(20).to_string())])
            .send()
            .await
            .map_err(|e| ResearchError::from_transport(&e, self.timeout_ms))?;

        let response = check_status(response, self.name())?;

        let data: BraveResponse = response.json().await.map_err(|e| {
            ResearchError::provider_unavailable(self.name(), format!("malformed response: {}", e))
        })?;

        Ok(data
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .take(num_results)
            .map(|r| RawHit {
                title: r.title,
                url: r.url,
                snippet: r.description,
                published_date: r.page_age.or(r.age),
                source: "brave".to_string(),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "brave"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}

#[derive(Debug, serde::Deserialize)]
struct BraveResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, serde::Deserialize)]
struct BraveWebResults {
    results: Vec<BraveResult>,
}

#[derive(Debug, serde::Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
    age: Option<String>,
    page_age: Option<String>,
}
