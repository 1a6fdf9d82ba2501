// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod bookmarks;
pub mod cache;
pub mod cli;
pub mod error;
pub mod research;
pub mod search;

pub use bookmarks::{Bookmark, BookmarkStore, NewBookmark};
pub use cache::{CacheConfig, CachePayload, CacheStats, ResearchCache};
pub use error::{ProviderFailure, ResearchError, Result};
pub use research::{
    PendingResearch, ResearchConfig, ResearchReport, ResearchService, SummaryAggregator,
};
pub use search::{
    ExtractedContent, HttpFetcher, PageFetcher, SearchProvider, SearchResponse, SearchResult,
    SearchService, SearchType,
};
