// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::time::Duration;
use web_research_node::search::ProviderChain;
use web_research_node::ResearchError;

use super::common::{hit, numbered_hits, ScriptedProvider};

#[tokio::test]
async fn test_rate_limited_provider_skipped_during_cooldown() {
    let chain = ProviderChain::new(
        vec![
            ScriptedProvider::failing("limited", ResearchError::RateLimited { retry_after_secs: 30 }),
            ScriptedProvider::hits("backup", numbered_hits("backup", 5)),
        ],
        Duration::from_secs(60),
    );

    let first = chain.search("rust", 3).await.unwrap();
    assert_eq!(first.hits.len(), 3);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].provider, "limited");
    assert!(first.failures[0].reason.contains("rate limited"));

    let second = chain.search("rust", 3).await.unwrap();
    assert_eq!(second.hits.len(), 3);
    assert!(second.failures[0].reason.contains("cooling down"));

    let calls: Vec<usize> = chain.providers().map(|p| p.calls()).collect();
    assert_eq!(calls, vec![1, 2]);
    assert_eq!(chain.available_providers(), vec!["backup"]);
}

#[tokio::test]
async fn test_partial_hits_returned_with_failures() {
    let chain = ProviderChain::new(
        vec![
            ScriptedProvider::hits("first", numbered_hits("first", 2)),
            ScriptedProvider::failing("second", ResearchError::Timeout { timeout_ms: 10_000 }),
        ],
        Duration::from_secs(60),
    );

    let outcome = chain.search("rust", 5).await.unwrap();
    assert_eq!(outcome.hits.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].provider, "second");
}

#[tokio::test]
async fn test_next_provider_asked_for_remaining_count() {
    let chain = ProviderChain::new(
        vec![
            ScriptedProvider::hits("first", numbered_hits("first", 2)),
            ScriptedProvider::hits("second", numbered_hits("second", 10)),
        ],
        Duration::from_secs(60),
    );

    let outcome = chain.search("rust", 5).await.unwrap();
    assert_eq!(outcome.hits.len(), 5);
    assert!(outcome.failures.is_empty());

    let providers: Vec<_> = chain.providers().collect();
    assert_eq!(providers[0].queries(), vec![("rust".to_string(), 5)]);
    assert_eq!(providers[1].queries(), vec![("rust".to_string(), 3)]);
}

#[tokio::test]
async fn test_chain_stops_once_satisfied() {
    let chain = ProviderChain::new(
        vec![
            ScriptedProvider::hits("first", numbered_hits("first", 10)),
            ScriptedProvider::hits("second", numbered_hits("second", 10)),
        ],
        Duration::from_secs(60),
    );

    chain.search("rust", 4).await.unwrap();
    let calls: Vec<usize> = chain.providers().map(|p| p.calls()).collect();
    assert_eq!(calls, vec![1, 0]);
}

#[tokio::test]
async fn test_all_failing_is_provider_unavailable() {
    let chain = ProviderChain::new(
        vec![
            ScriptedProvider::failing("a", ResearchError::ConnectionError("refused".into())),
            ScriptedProvider::failing("b", ResearchError::HttpError { status: 500 }),
        ],
        Duration::from_secs(60),
    );

    match chain.search("rust", 5).await {
        Err(ResearchError::ProviderUnavailable { failures }) => {
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].provider, "a");
            assert_eq!(failures[1].provider, "b");
        }
        other => panic!("expected ProviderUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_tracking_variants_deduplicated() {
    let chain = ProviderChain::new(
        vec![ScriptedProvider::hits(
            "only",
            vec![
                hit("https://example.com/a?utm_source=x", "A", ""),
                hit("https://example.com/a#section", "A again", ""),
                hit("https://example.com/b", "B", ""),
            ],
        )],
        Duration::from_secs(60),
    );

    let outcome = chain.search("rust", 10).await.unwrap();
    let urls: Vec<_> = outcome.hits.iter().map(|h| h.url.as_str()).collect();
    assert_eq!(urls, vec!["https://example.com/a?utm_source=x", "https://example.com/b"]);
}
