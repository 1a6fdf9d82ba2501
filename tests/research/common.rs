// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use web_research_node::search::types::RawHit;
use web_research_node::search::{FetchedPage, PageFetcher, SearchConfig, SearchProvider, SearchService};
use web_research_node::{BookmarkStore, ResearchCache, ResearchConfig, ResearchError, ResearchService, Result};

pub struct FixedProvider {
    urls: Vec<String>,
}

impl FixedProvider {
    pub fn new(urls: &[&str]) -> Self {
        Self {
            urls: urls.iter().map(|u| u.to_string()).collect(),
        }
    }
}

#[async_trait]
impl SearchProvider for FixedProvider {
    async fn search(&self, _query: &str, num_results: usize) -> Result<Vec<RawHit>> {
        Ok(self
            .urls
            .iter()
            .take(num_results)
            .enumerate()
            .map(|(i, url)| RawHit {
                title: format!("Solar energy source {}", i),
                url: url.clone(),
                snippet: "solar energy capacity".to_string(),
                published_date: None,
                source: "fixed".to_string(),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Clone)]
pub enum Reply {
    Html(String),
    Binary,
    Fail(ResearchError),
    /// Fails with the error on the first call, then serves the page
    FailOnce(ResearchError, String),
}

/// Fetcher serving canned replies per URL
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: HashMap<String, Reply>,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Highest number of fetches that were running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration, _max_bytes: u64) -> Result<FetchedPage> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let body = match self.replies.get(url) {
            Some(Reply::Html(html)) => html.clone().into_bytes(),
            Some(Reply::Binary) => b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec(),
            Some(Reply::Fail(err)) => return Err(err.clone()),
            Some(Reply::FailOnce(err, html)) => {
                if call == 1 {
                    return Err(err.clone());
                }
                html.clone().into_bytes()
            }
            None => return Err(ResearchError::HttpError { status: 404 }),
        };

        Ok(FetchedPage {
            url: url.to_string(),
            status: 200,
            content_type: None,
            body,
        })
    }
}

pub fn article(title: &str, sentences: &[&str]) -> String {
    let paragraphs: String = sentences.iter().map(|s| format!("<p>{}</p>", s)).collect();
    format!(
        "<html><head><title>{}</title></head><body>\
         <nav><a href=\"/\">Home</a><a href=\"/about\">About</a></nav>\
         <article>{}</article>\
         <footer>Copyright notice</footer></body></html>",
        title, paragraphs
    )
}

pub fn solar_page(n: usize) -> String {
    article(
        &format!("Solar report {}", n),
        &[
            "Solar capacity doubled across the region during the last year.",
            "Battery storage costs continued falling as manufacturing scaled up.",
            "Grid operators reported fewer curtailment events than expected.",
        ],
    )
}

pub struct Harness {
    pub service: ResearchService<FixedProvider, Arc<ScriptedFetcher>>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub _dir: TempDir,
}

pub fn harness(urls: &[&str], fetcher: ScriptedFetcher, config: ResearchConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher);
    let cache = Arc::new(ResearchCache::in_memory(1 << 20, Duration::from_secs(300)));
    let search = SearchService::new(vec![FixedProvider::new(urls)], SearchConfig::default(), cache);
    let bookmarks = BookmarkStore::open(dir.path().join("bookmarks.jsonl")).unwrap();
    let mut config = config;
    config.retry.delay_ms = 10;
    let service = ResearchService::new(search, Arc::clone(&fetcher), bookmarks, &config);
    Harness {
        service,
        fetcher,
        _dir: dir,
    }
}
