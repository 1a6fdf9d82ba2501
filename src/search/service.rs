// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search service orchestration
//!
//! Plans the query, serves ranked results from the cache when possible and
//! otherwise runs the provider chain and scores what comes back.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::chain::ProviderChain;
use super::config::SearchConfig;
use super::provider::{ProviderBackend, SearchProvider};
use super::query_planner::{plan, query_terms};
use super::scorer::Scorer;
use super::types::{SearchResponse, SearchType};
use crate::cache::{search_key, CachePayload, Computed, ResearchCache};
use crate::error::{ResearchError, Result};

/// Main search service that orchestrates planning, providers, caching and
/// scoring
pub struct SearchService<P = ProviderBackend> {
    chain: ProviderChain<P>,
    cache: Arc<ResearchCache>,
    config: SearchConfig,
}

impl SearchService<ProviderBackend> {
    /// Create a search service with the configured production backends
    pub fn from_config(
        config: SearchConfig,
        user_agent: &str,
        cache: Arc<ResearchCache>,
    ) -> Result<Self> {
        let providers = ProviderBackend::from_config(&config.providers, user_agent)?;
        Ok(Self::new(providers, config, cache))
    }
}

impl<P: SearchProvider> SearchService<P> {
    /// Create a search service over `providers` (already in priority order)
    pub fn new(providers: Vec<P>, config: SearchConfig, cache: Arc<ResearchCache>) -> Self {
        let chain = ProviderChain::new(
            providers,
            Duration::from_secs(config.rate_limit_cooldown_secs),
        );
        debug!("Search providers: {:?}", chain.provider_names());
        Self {
            chain,
            cache,
            config,
        }
    }

    /// Perform a search
    ///
    /// # Arguments
    /// * `query` - The raw user query
    /// * `search_type` - Bias applied by the query planner and the scorer
    /// * `max_results` - Result count (uses the configured default if None)
    /// * `cancel` - Aborts provider calls; nothing is cached on cancel
    pub async fn search(
        &self,
        query: &str,
        search_type: SearchType,
        max_results: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        let enhanced = plan(query, search_type)?;
        let max = max_results
            .unwrap_or(self.config.default_num_results)
            .min(self.config.max_num_results);
        if max == 0 {
            return Err(ResearchError::InvalidInput(
                "max_results must be at least 1".to_string(),
            ));
        }

        let start = Instant::now();
        let terms = query_terms(query);
        let key = search_key(search_type, query);
        let mut failures = Vec::new();

        let lookup = {
            let enhanced = enhanced.as_str();
            let terms = &terms;
            let failures = &mut failures;
            self.cache
                .get_or_compute_if(
                    &key,
                    self.cache.default_ttl(),
                    cancel,
                    |payload| {
                        // a shorter cached list cannot serve a larger request
                        matches!(payload, CachePayload::SearchResults { requested, .. } if *requested >= max)
                    },
                    || async move {
                        let outcome = self.chain.search(enhanced, max).await?;
                        let degraded = !outcome.failures.is_empty();
                        *failures = outcome.failures;
                        let scorer = Scorer::new(self.config.scoring.clone(), Utc::now().date_naive());
                        let results = scorer.rank_results(outcome.hits, terms, search_type);
                        // a short list only answers requests up to its own length
                        let payload = CachePayload::SearchResults {
                            requested: results.len().min(max),
                            results,
                        };
                        if degraded {
                            debug!("Not caching '{}': provider failures", enhanced);
                            Ok(Computed::Transient(payload))
                        } else {
                            Ok(Computed::Store(payload))
                        }
                    },
                )
                .await?
        };

        let results = match lookup.payload {
            CachePayload::SearchResults { results, .. } => {
                results.into_iter().take(max).collect::<Vec<_>>()
            }
            CachePayload::Content { .. } => {
                return Err(ResearchError::ParseError(format!(
                    "cache entry {} holds page content",
                    key
                )))
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "Search complete: {} results for '{}' in {}ms (cached: {})",
            results.len(),
            enhanced,
            elapsed_ms,
            lookup.cached
        );

        Ok(SearchResponse {
            query: query.to_string(),
            enhanced_query: enhanced,
            search_type,
            results,
            cached: lookup.cached,
            provider_failures: failures,
            search_time_ms: elapsed_ms,
        })
    }

    /// Get list of available provider names
    pub fn available_providers(&self) -> Vec<&'static str> {
        self.chain.available_providers()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResearchCache> {
        &self.cache
    }
}
