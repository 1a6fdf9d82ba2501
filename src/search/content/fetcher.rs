// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounded HTTP page retrieval
//!
//! Fetches raw page bytes with a redirect cap, a per-call timeout and a
//! body size limit enforced while streaming. No retries here; the research
//! pipeline owns retry policy.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::{Host, Url};

use super::config::ContentFetchConfig;
use crate::error::{ResearchError, Result};

/// Raw page as returned by the server
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Retrieval of raw page bytes
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration, max_bytes: u64) -> Result<FetchedPage>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, url: &str, timeout: Duration, max_bytes: u64) -> Result<FetchedPage> {
        (**self).fetch(url, timeout, max_bytes).await
    }
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: Client,
    allow_private_hosts: bool,
}

impl HttpFetcher {
    /// Create a new fetcher
    pub fn new(config: &ContentFetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| ResearchError::ConnectionError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    async fn fetch_inner(&self, url: &str, timeout_ms: u64, max_bytes: u64) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResearchError::from_transport(&e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::HttpError {
                status: status.as_u16(),
            });
        }

        if let Some(declared) = response.content_length() {
            if declared > max_bytes {
                return Err(ResearchError::TooLarge {
                    limit_bytes: max_bytes,
                });
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ResearchError::from_transport(&e, timeout_ms))?;
            if body.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(ResearchError::TooLarge {
                    limit_bytes: max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration, max_bytes: u64) -> Result<FetchedPage> {
        if !self.allow_private_hosts && !is_safe_url(url) {
            return Err(ResearchError::InvalidInput(format!(
                "refusing to fetch unsafe URL: {}",
                url
            )));
        }

        debug!("Fetching content from: {}", url);
        let timeout_ms = timeout.as_millis() as u64;
        let page = match tokio::time::timeout(timeout, self.fetch_inner(url, timeout_ms, max_bytes))
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(ResearchError::Timeout { timeout_ms }),
        };

        info!("Fetched {} bytes from: {}", page.body.len(), page.url);
        Ok(page)
    }
}

/// Check if URL is safe to fetch (http(s), not localhost or a private range)
pub fn is_safe_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    match parsed.host() {
        Some(Host::Domain(host)) => {
            let host = host.to_lowercase();
            host != "localhost" && !host.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_public_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_public_ip(IpAddr::V6(ip)),
        None => false,
    }
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast())
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
}
