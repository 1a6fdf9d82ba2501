// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Provider fallback chain
//!
//! Tries providers in priority order, accumulating hits until enough are
//! collected. Providers that report rate limiting are benched for a
//! cooldown window and skipped on later calls until it passes.

use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::provider::{ProviderBackend, SearchProvider};
use super::rate_limiter::ProviderThrottle;
use super::types::RawHit;
use crate::cache::key::normalize_url;
use crate::error::{ProviderFailure, ResearchError, Result};

/// Hits gathered by one chain call plus the failures met on the way
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    /// Hits in provider order, de-duplicated by normalized URL
    pub hits: Vec<RawHit>,
    pub failures: Vec<ProviderFailure>,
}

/// Ordered list of providers with per-provider throttles
pub struct ProviderChain<P = ProviderBackend> {
    providers: Vec<(P, ProviderThrottle)>,
    min_cooldown: Duration,
}

impl<P: SearchProvider> ProviderChain<P> {
    /// Build a chain; `providers` is already in priority order
    pub fn new(providers: Vec<P>, min_cooldown: Duration) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| {
                let throttle = ProviderThrottle::new(p.requests_per_minute());
                (p, throttle)
            })
            .collect();
        Self {
            providers,
            min_cooldown,
        }
    }

    /// Names of the providers, in priority order
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|(p, _)| p.name()).collect()
    }

    /// Providers in priority order
    pub fn providers(&self) -> impl Iterator<Item = &P> {
        self.providers.iter().map(|(p, _)| p)
    }

    /// Names of providers that are configured and not cooling down
    pub fn available_providers(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|(p, t)| p.is_available() && t.cooling_down().is_none())
            .map(|(p, _)| p.name())
            .collect()
    }

    /// Run `query` through the chain
    ///
    /// Fails with `ProviderUnavailable` only when nothing was accumulated and
    /// at least one provider failed (or none could be tried). Partial hits
    /// are returned together with the failures that cut the run short.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<ChainOutcome> {
        let mut outcome = ChainOutcome::default();
        if max_results == 0 {
            return Ok(outcome);
        }

        let mut seen = HashSet::new();
        let mut attempted = 0usize;

        for (provider, throttle) in &self.providers {
            if outcome.hits.len() >= max_results {
                break;
            }
            let name = provider.name();

            if !provider.is_available() {
                debug!("Skipping unavailable provider: {}", name);
                continue;
            }

            if let Some(remaining) = throttle.cooling_down() {
                debug!("Provider {} cooling down for {:?}", name, remaining);
                outcome.failures.push(ProviderFailure {
                    provider: name.to_string(),
                    reason: format!("cooling down for {}s", remaining.as_secs().max(1)),
                });
                continue;
            }

            attempted += 1;
            let wanted = max_results - outcome.hits.len();
            debug!("Trying search provider: {} ({} wanted)", name, wanted);

            let result = match throttle.check() {
                Ok(()) => call_with_timeout(provider, query, wanted).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(batch) => {
                    let received = batch.len();
                    for hit in batch {
                        let key = normalize_url(&hit.url).unwrap_or_else(|_| hit.url.clone());
                        if seen.insert(key) {
                            outcome.hits.push(hit);
                            if outcome.hits.len() >= max_results {
                                break;
                            }
                        }
                    }
                    info!(
                        "Provider {} returned {} hits ({} accumulated)",
                        name,
                        received,
                        outcome.hits.len()
                    );
                }
                Err(ResearchError::RateLimited { retry_after_secs }) => {
                    let cooldown = Duration::from_secs(retry_after_secs).max(self.min_cooldown);
                    warn!("Provider {} rate limited, cooling down for {:?}", name, cooldown);
                    throttle.start_cooldown(cooldown);
                    outcome.failures.push(ProviderFailure {
                        provider: name.to_string(),
                        reason: format!("rate limited, retry after {}s", retry_after_secs),
                    });
                }
                Err(e) => {
                    warn!("Search provider {} failed: {}, trying next", name, e);
                    outcome.failures.push(ProviderFailure {
                        provider: name.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if outcome.hits.is_empty() && (!outcome.failures.is_empty() || attempted == 0) {
            return Err(ResearchError::ProviderUnavailable {
                failures: outcome.failures,
            });
        }

        Ok(outcome)
    }
}

async fn call_with_timeout<P: SearchProvider>(
    provider: &P,
    query: &str,
    wanted: usize,
) -> Result<Vec<RawHit>> {
    let limit = provider.timeout();
    match tokio::time::timeout(limit, provider.search(query, wanted)).await {
        Ok(result) => result,
        Err(_) => Err(ResearchError::Timeout {
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
