// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use web_research_node::search::{SearchConfig, SearchService, SearchType};
use web_research_node::{ResearchCache, ResearchError};

use super::common::{hit, numbered_hits, ScriptedProvider};

fn cache() -> Arc<ResearchCache> {
    Arc::new(ResearchCache::in_memory(1 << 20, Duration::from_secs(300)))
}

#[tokio::test]
async fn test_academic_search_sends_bias_terms() {
    let service = SearchService::new(
        vec![ScriptedProvider::hits("scripted", numbered_hits("papers", 12))],
        SearchConfig::default(),
        cache(),
    );

    let response = service
        .search("quantum computing", SearchType::Academic, Some(5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.enhanced_query, "quantum computing research study paper");
    assert!(response.results.len() <= 5);
    for result in &response.results {
        assert!((0.0..=1.0).contains(&result.score));
    }

    assert_eq!(service.cache().stats().entries, 1);
}

#[tokio::test]
async fn test_trusted_and_matching_hits_rank_first() {
    let service = SearchService::new(
        vec![ScriptedProvider::hits(
            "scripted",
            vec![
                hit("https://forum.example.net/t/1", "Unrelated chatter", "nothing"),
                hit(
                    "https://cs.stanford.edu/rust-ownership",
                    "Rust ownership explained",
                    "ownership in rust",
                ),
                hit("https://blog.example.com/post", "Rust notes", "some notes"),
            ],
        )],
        SearchConfig::default(),
        cache(),
    );

    let response = service
        .search("rust ownership", SearchType::General, Some(3), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.results[0].source_domain, "cs.stanford.edu");
    assert_eq!(response.results[0].rank, 2);
    for pair in response.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_cancelled_search_leaves_no_entry() {
    let service = SearchService::new(
        vec![ScriptedProvider::hits("scripted", numbered_hits("a", 3))],
        SearchConfig::default(),
        cache(),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = service
        .search("rust", SearchType::General, Some(3), &cancel)
        .await;
    assert_eq!(result.unwrap_err(), ResearchError::Cancelled);
    assert_eq!(service.cache().stats().entries, 0);
}

#[tokio::test]
async fn test_results_with_provider_failures_not_cached() {
    let service = SearchService::new(
        vec![
            ScriptedProvider::failing("down", ResearchError::Timeout { timeout_ms: 10_000 }),
            ScriptedProvider::hits("backup", numbered_hits("b", 10)),
        ],
        SearchConfig::default(),
        cache(),
    );
    let cancel = CancellationToken::new();

    let first = service
        .search("rust", SearchType::General, Some(5), &cancel)
        .await
        .unwrap();
    assert_eq!(first.results.len(), 5);
    assert_eq!(first.provider_failures.len(), 1);
    assert_eq!(service.cache().stats().entries, 0);

    let second = service
        .search("rust", SearchType::General, Some(5), &cancel)
        .await
        .unwrap();
    assert!(!second.cached);
    assert_eq!(second.provider_failures.len(), 1);
}
