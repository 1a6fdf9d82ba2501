// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web search and content extraction
//!
//! - Query planning with per-type bias terms
//! - Multiple search providers (Brave, Bing, DuckDuckGo) in a fallback chain
//! - Rate limiting and cooldown per provider
//! - Deterministic relevance scoring
//! - Bounded page fetching and main-content extraction

pub mod bing;
pub mod brave;
pub mod chain;
pub mod config;
pub mod content;
pub mod duckduckgo;
pub mod provider;
pub mod query_planner;
pub mod rate_limiter;
pub mod scorer;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use chain::{ChainOutcome, ProviderChain};
pub use config::{ProviderKind, ProviderSettings, ScoringConfig, SearchConfig};
pub use provider::{ProviderBackend, SearchProvider};
pub use scorer::Scorer;
pub use service::SearchService;
pub use types::{ContentKind, ExtractedContent, RawHit, SearchResponse, SearchResult, SearchType};

pub use content::{ContentFetchConfig, Extractor, FetchedPage, HttpFetcher, PageFetcher};
