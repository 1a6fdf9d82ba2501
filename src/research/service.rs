// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Research pipeline entry point
//!
//! Ties search, cached page extraction and summary aggregation together
//! behind one service. Every call takes a cancellation token; a cancelled
//! call returns `Cancelled` and leaves no cache entry behind.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::aggregator::{ResearchReport, ScoredContent, SkippedSource, SummaryAggregator};
use super::config::ResearchConfig;
use super::pending::PendingResearch;
use super::retry::{with_retry, RetryConfig};
use crate::bookmarks::BookmarkStore;
use crate::cache::{content_key, CachePayload, CacheStats, ResearchCache};
use crate::error::{ResearchError, Result};
use crate::search::content::{ContentFetchConfig, Extractor, HttpFetcher, PageFetcher};
use crate::search::provider::{ProviderBackend, SearchProvider};
use crate::search::types::{ExtractedContent, SearchResponse, SearchType};
use crate::search::SearchService;

/// Search, extraction and summarization over the configured providers
pub struct ResearchService<P = ProviderBackend, F = HttpFetcher> {
    search: SearchService<P>,
    fetcher: F,
    extractor: Arc<Extractor>,
    cache: Arc<ResearchCache>,
    aggregator: SummaryAggregator,
    semaphore: Arc<Semaphore>,
    fetch: ContentFetchConfig,
    retry: RetryConfig,
    bookmarks: BookmarkStore,
    janitor: CancellationToken,
}

impl ResearchService<ProviderBackend, HttpFetcher> {
    /// Build the production service from configuration
    pub fn from_config(config: ResearchConfig) -> Result<Self> {
        config.validate().map_err(ResearchError::InvalidInput)?;

        let cache = Arc::new(ResearchCache::new(&config.cache));
        let search =
            SearchService::from_config(config.search.clone(), &config.fetch.user_agent, cache)?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        let bookmarks = BookmarkStore::open(&config.bookmarks_path)?;

        Ok(Self::new(search, fetcher, bookmarks, &config))
    }
}

impl<P, F> ResearchService<P, F>
where
    P: SearchProvider,
    F: PageFetcher,
{
    /// Assemble a service from its parts; the cache is the one `search`
    /// was built with
    pub fn new(
        search: SearchService<P>,
        fetcher: F,
        bookmarks: BookmarkStore,
        config: &ResearchConfig,
    ) -> Self {
        let cache = Arc::clone(search.cache());
        let janitor = CancellationToken::new();

        let interval = config.cache.janitor_interval();
        if interval.is_zero() {
            debug!("Cache janitor disabled");
        } else if tokio::runtime::Handle::try_current().is_ok() {
            Arc::clone(&cache).spawn_janitor(interval, janitor.child_token());
        } else {
            debug!("No tokio runtime, cache janitor not started");
        }

        info!(
            "Research service ready (providers: {:?}, concurrency: {})",
            search.available_providers(),
            config.fetch.concurrency_limit
        );

        Self {
            search,
            fetcher,
            extractor: Arc::new(Extractor::new(&config.fetch)),
            cache,
            aggregator: SummaryAggregator::new(config.aggregation.clone()),
            semaphore: Arc::new(Semaphore::new(config.fetch.concurrency_limit.max(1))),
            fetch: config.fetch.clone(),
            retry: config.retry.clone(),
            bookmarks,
            janitor,
        }
    }

    /// Ranked search results for `query`
    pub async fn search(
        &self,
        query: &str,
        search_type: SearchType,
        max_results: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        self.search.search(query, search_type, max_results, cancel).await
    }

    /// Clean text, metadata and summary of the page at `url`
    ///
    /// Served from the cache when a live entry exists. Concurrent calls for
    /// the same page share one fetch.
    pub async fn extract_content(&self, url: &str, cancel: &CancellationToken) -> Result<ExtractedContent> {
        let key = content_key(url)?;
        let lookup = self
            .cache
            .get_or_compute(&key, self.cache.default_ttl(), cancel, || async {
                let content = self.fetch_and_extract(url, cancel).await?;
                Ok(CachePayload::Content { content })
            })
            .await?;

        if lookup.cached {
            debug!("Content cache hit for {}", url);
        }

        match lookup.payload {
            CachePayload::Content { content } => Ok(content),
            CachePayload::SearchResults { .. } => Err(ResearchError::ParseError(format!(
                "cache entry {} holds search results",
                key
            ))),
        }
    }

    /// Fetch and parse one page while holding a fetch permit
    async fn fetch_and_extract(&self, url: &str, cancel: &CancellationToken) -> Result<ExtractedContent> {
        let permit = tokio::select! {
            _ = cancel.cancelled() => return Err(ResearchError::Cancelled),
            permit = self.semaphore.acquire() => permit,
        };
        let _permit = permit.map_err(|_| ResearchError::Cancelled)?;

        let timeout = self.fetch.timeout();
        let max_bytes = self.fetch.max_bytes_per_page;
        let page = with_retry(&self.retry, cancel, || self.fetcher.fetch(url, timeout, max_bytes)).await?;

        if let Some(content_type) = page.content_type.as_deref() {
            if !is_textual(content_type) {
                return Err(ResearchError::ParseError(format!(
                    "unsupported content type {}",
                    content_type
                )));
            }
        }

        let extractor = Arc::clone(&self.extractor);
        let source_url = url.to_string();
        let content = tokio::task::spawn_blocking(move || extractor.extract(&page.body, &source_url))
            .await
            .map_err(|e| ResearchError::ParseError(format!("extraction task failed: {}", e)))??;

        info!(
            "Extracted {} words from {} ({} keywords)",
            content.word_count,
            url,
            content.keywords.len()
        );
        Ok(content)
    }

    /// Search `topic`, extract the best `source_count` hits and merge them
    /// into a cited report
    ///
    /// Sources that fail to fetch or parse are listed in
    /// [`ResearchReport::skipped`]; the call only fails when none survive.
    pub async fn research_summary(
        &self,
        topic: &str,
        source_count: usize,
        cancel: &CancellationToken,
    ) -> Result<ResearchReport> {
        if source_count == 0 {
            return Err(ResearchError::InvalidInput(
                "source_count must be at least 1".to_string(),
            ));
        }

        let start = Instant::now();
        let response = self
            .search
            .search(topic, SearchType::General, Some(source_count.saturating_mul(2)), cancel)
            .await?;
        let hits: Vec<_> = response.results.into_iter().take(source_count).collect();
        debug!("Extracting {} sources for '{}'", hits.len(), topic);

        let extractions = hits
            .iter()
            .map(|hit| self.extract_content(&hit.url, cancel));
        let outcomes = join_all(extractions).await;

        if cancel.is_cancelled() {
            return Err(ResearchError::Cancelled);
        }

        let mut sources = Vec::new();
        let mut skipped = Vec::new();
        for (hit, outcome) in hits.iter().zip(outcomes) {
            match outcome {
                Ok(content) => sources.push(ScoredContent {
                    content,
                    score: hit.score,
                }),
                Err(ResearchError::Cancelled) => return Err(ResearchError::Cancelled),
                Err(e) => {
                    warn!("Dropping source {}: {}", hit.url, e);
                    skipped.push(SkippedSource {
                        url: hit.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if sources.is_empty() {
            return Err(ResearchError::InsufficientSources(format!(
                "none of {} sources for '{}' could be extracted",
                skipped.len(),
                topic
            )));
        }

        let mut report = self.aggregator.aggregate(topic, sources)?;
        report.skipped = skipped;

        info!(
            "Research report for '{}': {} sources, {} skipped, {} key points in {}ms",
            topic,
            report.sources.len(),
            report.skipped.len(),
            report.key_points.len(),
            start.elapsed().as_millis()
        );
        Ok(report)
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn cache(&self) -> &Arc<ResearchCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop expired cache entries, returning how many were removed
    pub fn purge_cache(&self) -> usize {
        self.cache.purge_expired()
    }

    pub fn available_providers(&self) -> Vec<&'static str> {
        self.search.available_providers()
    }
}

impl<P, F> ResearchService<P, F>
where
    P: SearchProvider + 'static,
    F: PageFetcher + 'static,
{
    /// Run [`search`](Self::search) in the background
    pub fn spawn_search(
        self: &Arc<Self>,
        query: impl Into<String>,
        search_type: SearchType,
        max_results: Option<usize>,
    ) -> PendingResearch<SearchResponse> {
        let service = Arc::clone(self);
        let query = query.into();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        PendingResearch::spawn(cancel, async move {
            service.search(&query, search_type, max_results, &token).await
        })
    }

    /// Run [`research_summary`](Self::research_summary) in the background
    pub fn spawn_summary(
        self: &Arc<Self>,
        topic: impl Into<String>,
        source_count: usize,
    ) -> PendingResearch<ResearchReport> {
        let service = Arc::clone(self);
        let topic = topic.into();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        PendingResearch::spawn(cancel, async move {
            service.research_summary(&topic, source_count, &token).await
        })
    }
}

impl<P, F> Drop for ResearchService<P, F> {
    fn drop(&mut self) {
        self.janitor.cancel();
    }
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime.starts_with("text/") || mime.contains("html") || mime.contains("xml")
}
