// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page fetching and content extraction
//!
//! ## Architecture
//!
//! ```text
//! URL → PageFetcher (bounded bytes) → Extractor → ExtractedContent
//!                                        ↓
//!                                   summarizer (sentences, keywords)
//! ```
//!
//! Caching and retries are layered on top by the research pipeline.

pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod summarizer;

pub use config::ContentFetchConfig;
pub use extractor::Extractor;
pub use fetcher::{is_safe_url, FetchedPage, HttpFetcher, PageFetcher};
