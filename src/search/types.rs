// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for web search and content extraction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProviderFailure, ResearchError};

/// Kind of search, used to bias the query and the scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    General,
    Academic,
    News,
    Technical,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Academic => "academic",
            Self::News => "news",
            Self::Technical => "technical",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(Self::General),
            "academic" => Ok(Self::Academic),
            "news" => Ok(Self::News),
            "technical" => Ok(Self::Technical),
            other => Err(ResearchError::InvalidInput(format!(
                "unknown search type '{}'",
                other
            ))),
        }
    }
}

/// A single unscored hit as returned by a search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHit {
    /// Title of the hit
    pub title: String,
    /// URL of the hit
    pub url: String,
    /// Snippet/description
    pub snippet: String,
    /// Published date text if the provider reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Provider that produced the hit (e.g., "brave", "bing", "duckduckgo")
    pub source: String,
}

/// Coarse classification of what a hit points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Academic,
    News,
    Video,
    Documentation,
    Discussion,
    General,
}

/// A scored, ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Host of `url`, without a leading "www."
    pub source_domain: String,
    /// 1-based position in the provider chain output
    pub rank: usize,
    /// Relevance in [0, 1]
    pub score: f64,
    /// Provider that returned this hit
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    pub content_kind: ContentKind,
}

/// Response from a search operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// The original search query
    pub query: String,
    /// Query actually sent to the providers
    pub enhanced_query: String,
    pub search_type: SearchType,
    /// Results sorted by descending score
    pub results: Vec<SearchResult>,
    /// Whether the results came from cache
    pub cached: bool,
    /// Providers that failed while this response was assembled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_failures: Vec<ProviderFailure>,
    /// Time taken in milliseconds
    pub search_time_ms: u64,
}

/// Figures quoted by a page, as written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFacts {
    /// Numbers in order of appearance
    pub numbers: Vec<String>,
    /// `YYYY-MM-DD` and `M/D/YYYY` dates
    pub dates: Vec<String>,
}

/// Clean text and metadata extracted from one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedContent {
    pub url: String,
    pub title: String,
    pub main_text: String,
    /// Extractive summary (selected sentences in document order)
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Most frequent content words, most frequent first
    pub keywords: Vec<String>,
    #[serde(default)]
    pub key_facts: KeyFacts,
    pub word_count: usize,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractedContent {
    /// Sentences of the extractive summary
    pub fn summary_sentences(&self) -> Vec<String> {
        crate::search::content::summarizer::split_sentences(&self.summary)
    }
}
