// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bing Web Search API v7 provider

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::config::ProviderSettings;
use super::provider::{build_client, check_status, SearchProvider};
use super::types::RawHit;
use crate::error::{ResearchError, Result};

const BING_API_URL: &str = "https://api.bing.microsoft.com/v7.0/search";

/// Bing Search API provider
pub struct BingSearchProvider {
    api_key: String,
    base_url: String,
    timeout_ms: u64,
    requests_per_minute: u32,
    client: Client,
}

impl BingSearchProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        Ok(Self {
            api_key: settings.api_key.clone().unwrap_or_default(),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| BING_API_URL.to_string()),
            timeout_ms: settings.timeout_ms,
            requests_per_minute: settings.requests_per_minute,
            client: build_client(settings.timeout_ms, None)?,
        })
    }
}

#[async_trait]
impl SearchProvider for BingSearchProvider {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<RawHit>> {
        let response = self
            .client
            .get(&self.base_url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("count", &num_results.min(50).to_string()),
                ("responseFilter", "Webpages"),
            ])
            .send()
            .await
            .map_err(|e| ResearchError::from_transport(&e, self.timeout_ms))?;

        let response = check_status(response, self.name())?;

        let data: BingResponse = response.json().await.map_err(|e| {
            ResearchError::provider_unavailable(self.name(), format!("malformed response: {}", e))
        })?;

        Ok(data
            .web_pages
            .map(|pages| pages.value)
            .unwrap_or_default()
            .into_iter()
            .take(num_results)
            .map(|r| RawHit {
                title: r.name,
                url: r.url,
                snippet: r.snippet,
                published_date: r.date_published,
                source: "bing".to_string(),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "bing"
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
#[serde(rename_all = "camelCase")]
struct BingResponse {
    web_pages: Option<BingWebPages>,
}

#[derive(Debug, serde::Deserialize)]
struct BingWebPages {
    value: Vec<BingResult>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResult {
    name: String,
    url: String,
    #[serde(default)]
    snippet: String,
    date_published: Option<String>,
}
