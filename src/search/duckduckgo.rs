// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DuckDuckGo search provider
//!
//! Scrapes DuckDuckGo's HTML interface. No API key required, so it is the
//! fallback at the end of most chains.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

use super::config::ProviderSettings;
use super::provider::{build_client, check_status, SearchProvider};
use super::types::RawHit;
use crate::error::{ResearchError, Result};

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// DuckDuckGo search provider (no API key required)
pub struct DuckDuckGoProvider {
    base_url: String,
    timeout_ms: u64,
    requests_per_minute: u32,
    client: Client,
}

impl DuckDuckGoProvider {
    pub fn new(settings: &ProviderSettings, user_agent: &str) -> Result<Self> {
        Ok(Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DDG_HTML_URL.to_string()),
            timeout_ms: settings.timeout_ms,
            requests_per_minute: settings.requests_per_minute,
            // The HTML endpoint blocks obvious bots, so send a browser UA
            client: build_client(settings.timeout_ms, Some(user_agent))?,
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<RawHit>> {
        let response = self
            .client
            .post(&self.base_url)
            .form(&[("q", query), ("kl", "us-en")])
            .send()
            .await
            .map_err(|e| ResearchError::from_transport(&e, self.timeout_ms))?;

        let response = check_status(response, self.name())?;

        let html = response
            .text()
            .await
            .map_err(|e| ResearchError::from_transport(&e, self.timeout_ms))?;

        Ok(parse_ddg_html(&html, num_results))
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}

/// Parse the DuckDuckGo HTML result page
fn parse_ddg_html(html: &str, max_results: usize) -> Vec<RawHit> {
    let document = Html::parse_document(html);
    let (Ok(block_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for block in document.select(&block_sel) {
        if results.len() >= max_results {
            break;
        }

        let Some(link) = block.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(extract_ddg_url) else {
            continue;
        };
        let title = collapse(&link.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let snippet = block
            .select(&snippet_sel)
            .next()
            .map(|s| collapse(&s.text().collect::<String>()))
            .unwrap_or_default();

        results.push(RawHit {
            title,
            url,
            snippet,
            published_date: None,
            source: "duckduckgo".to_string(),
        });
    }

    results
}

/// Extract the target URL from DuckDuckGo's redirect link
///
/// Links look like `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`
fn extract_ddg_url(href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        format!("https://duckduckgo.com{}", href)
    };
    let parsed = Url::parse(&absolute).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned())
        .filter(|v| v.starts_with("http"))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
