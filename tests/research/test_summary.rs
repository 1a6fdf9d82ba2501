// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use web_research_node::cache::content_key;
use web_research_node::{ResearchConfig, ResearchError};

use super::common::{harness, solar_page, Harness, Reply, ScriptedFetcher};

const ALPHA: &str = "https://alpha.example.org/solar";
const BETA: &str = "https://beta.example.org/solar";
const GAMMA: &str = "https://gamma.example.org/solar";

fn all_pages() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .reply(ALPHA, Reply::Html(solar_page(1)))
        .reply(BETA, Reply::Html(solar_page(2)))
        .reply(GAMMA, Reply::Html(solar_page(3)))
}

#[tokio::test]
async fn test_three_sources_cited() {
    let h = harness(&[ALPHA, BETA, GAMMA], all_pages(), ResearchConfig::default());
    let report = h
        .service
        .research_summary("solar energy", 3, &CancellationToken::new())
        .await
        .unwrap();

    let urls: Vec<_> = report.sources.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(urls, vec![ALPHA, BETA, GAMMA]);
    assert!(report.skipped.is_empty());
    assert_eq!(report.topic, "solar energy");
    // identical pages collapse into shared points
    assert_eq!(report.key_points.len(), 3);
    assert_eq!(
        report.key_points[0],
        "Solar capacity doubled across the region during the last year."
    );
    assert!(report.synthesized_summary.starts_with("Solar capacity doubled"));
    assert!(report.common_keywords.contains(&"battery".to_string()));
    assert!(report.common_keywords.len() <= 10);
    assert_eq!(
        report.total_words,
        report.sources.iter().map(|s| s.word_count).sum::<usize>()
    );
}

#[tokio::test]
async fn test_unparseable_source_is_skipped() {
    let fetcher = all_pages().reply(BETA, Reply::Binary);
    let h = harness(&[ALPHA, BETA, GAMMA], fetcher, ResearchConfig::default());
    let report = h
        .service
        .research_summary("solar energy", 3, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.sources.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].url, BETA);
    assert!(report.skipped[0].reason.contains("Parse error"));
}

#[tokio::test]
async fn test_all_sources_failing_is_insufficient() {
    let fetcher = ScriptedFetcher::new()
        .reply(ALPHA, Reply::Fail(ResearchError::HttpError { status: 404 }))
        .reply(BETA, Reply::Binary)
        .reply(GAMMA, Reply::Fail(ResearchError::TooLarge { limit_bytes: 10 }));
    let h = harness(&[ALPHA, BETA, GAMMA], fetcher, ResearchConfig::default());

    let result = h
        .service
        .research_summary("solar energy", 3, &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(ResearchError::InsufficientSources(_))));
}

#[tokio::test]
async fn test_transient_failure_retried_once() {
    let fetcher = all_pages().reply(
        BETA,
        Reply::FailOnce(ResearchError::HttpError { status: 503 }, solar_page(2)),
    );
    let h = harness(&[ALPHA, BETA, GAMMA], fetcher, ResearchConfig::default());

    let report = h
        .service
        .research_summary("solar energy", 3, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.sources.len(), 3);
    assert_eq!(h.fetcher.calls(BETA), 2);
}

#[tokio::test]
async fn test_permanent_failure_not_retried() {
    let fetcher = all_pages().reply(GAMMA, Reply::Fail(ResearchError::HttpError { status: 404 }));
    let h = harness(&[ALPHA, BETA, GAMMA], fetcher, ResearchConfig::default());

    let report = h
        .service
        .research_summary("solar energy", 3, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.sources.len(), 2);
    assert_eq!(h.fetcher.calls(GAMMA), 1);
}

#[tokio::test]
async fn test_extractions_bounded_by_concurrency_limit() {
    let urls: Vec<String> = (0..6)
        .map(|i| format!("https://site{}.example.org/solar", i))
        .collect();
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();

    let mut fetcher = ScriptedFetcher::new().with_delay(Duration::from_millis(50));
    for (i, url) in urls.iter().enumerate() {
        fetcher = fetcher.reply(url, Reply::Html(solar_page(i)));
    }

    let mut config = ResearchConfig::default();
    config.fetch.concurrency_limit = 2;
    let h = harness(&url_refs, fetcher, config);

    let report = h
        .service
        .research_summary("solar energy", 6, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.sources.len(), 6);
    assert!(h.fetcher.peak_concurrency() <= 2);
    assert!(h.fetcher.peak_concurrency() >= 1);
}

#[tokio::test]
async fn test_cancel_during_extraction() {
    let fetcher = all_pages().with_delay(Duration::from_secs(5));
    let h = harness(&[ALPHA, BETA, GAMMA], fetcher, ResearchConfig::default());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = h.service.research_summary("solar energy", 3, &cancel).await;
    assert_eq!(result.unwrap_err(), ResearchError::Cancelled);
    for url in [ALPHA, BETA, GAMMA] {
        assert!(!h.service.cache().contains(&content_key(url).unwrap()));
    }
}

#[tokio::test]
async fn test_pending_summary_can_be_cancelled() {
    let fetcher = all_pages().with_delay(Duration::from_secs(5));
    let Harness {
        service,
        fetcher: _fetcher,
        _dir,
    } = harness(&[ALPHA, BETA, GAMMA], fetcher, ResearchConfig::default());
    let service = Arc::new(service);

    let pending = service.spawn_summary("solar energy", 3);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());
    pending.cancel();

    assert_eq!(pending.wait().await.unwrap_err(), ResearchError::Cancelled);
    assert_eq!(service.cache_stats().inflight, 0);
}
