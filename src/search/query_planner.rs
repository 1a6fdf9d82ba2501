// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query planning
//!
//! Turns a raw user query plus a search type into the query string sent to
//! providers, and the term list the scorer matches against.

use crate::error::{ResearchError, Result};

use super::types::SearchType;

/// Bias terms appended per search type
pub fn bias_terms(search_type: SearchType) -> &'static [&'static str] {
    match search_type {
        SearchType::General => &[],
        SearchType::Academic => &["research", "study", "paper"],
        SearchType::News => &["latest", "news", "report"],
        SearchType::Technical => &["tutorial", "documentation", "guide"],
    }
}

/// Trim and collapse internal whitespace
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the provider query for `raw_query`
///
/// Terms the user already typed are not repeated.
pub fn plan(raw_query: &str, search_type: SearchType) -> Result<String> {
    let normalized = normalize_query(raw_query);
    if normalized.is_empty() {
        return Err(ResearchError::InvalidInput(
            "query is empty".to_string(),
        ));
    }

    let present = query_terms(&normalized);
    let mut query = normalized;
    for term in bias_terms(search_type) {
        if !present.iter().any(|p| p == term) {
            query.push(' ');
            query.push_str(term);
        }
    }

    Ok(query)
}

/// Lower-cased alphanumeric terms of a query, de-duplicated in order
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let token = token.to_lowercase();
        if !terms.contains(&token) {
            terms.push(token);
        }
    }
    terms
}
