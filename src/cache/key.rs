// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cache key derivation

use url::Url;

use crate::error::{ResearchError, Result};
use crate::search::query_planner::normalize_query;
use crate::search::types::SearchType;

/// Query parameters that only track the visitor and never change the page
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "mc_cid", "mc_eid", "ref", "ref_src", "igshid", "yclid", "msclkid",
];

fn is_tracking_param(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name.as_str())
}

/// Canonical form of an http(s) URL
///
/// Scheme and host are lower-cased, the fragment dropped, tracking
/// parameters removed and the remaining parameters sorted.
pub fn normalize_url(raw: &str) -> Result<String> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ResearchError::InvalidInput(format!("invalid URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ResearchError::InvalidInput(format!(
            "unsupported URL scheme '{}'",
            url.scheme()
        )));
    }

    url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params);
    }

    Ok(url.to_string())
}

/// Key for extracted page content
pub fn content_key(url: &str) -> Result<String> {
    Ok(format!("content:{}", normalize_url(url)?))
}

/// Key for a ranked result list
pub fn search_key(search_type: SearchType, query: &str) -> String {
    format!(
        "search:{}:{}",
        search_type.as_str(),
        normalize_query(query).to_lowercase()
    )
}
