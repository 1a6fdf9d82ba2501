// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::fs;
use std::path::Path;
use std::time::Duration;
use web_research_node::{CacheConfig, CachePayload, ResearchCache};

fn payload(n: usize) -> CachePayload {
    CachePayload::SearchResults {
        results: vec![],
        requested: n,
    }
}

fn config(dir: &Path) -> CacheConfig {
    CacheConfig {
        dir: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

fn json_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("json"))
        .count()
}

#[test]
fn test_entries_reloaded_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = ResearchCache::new(&config(dir.path()));
        cache.put("search:general:rust", payload(5), Duration::from_secs(600));
        assert!(!cache.is_bypassed());
    }
    assert_eq!(json_files(dir.path()), 1);

    let reopened = ResearchCache::new(&config(dir.path()));
    assert_eq!(reopened.get("search:general:rust"), Some(payload(5)));
    assert_eq!(reopened.stats().entries, 1);
}

#[test]
fn test_expired_entries_not_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = ResearchCache::new(&config(dir.path()));
        cache.put("short", payload(1), Duration::from_millis(10));
        cache.put("long", payload(2), Duration::from_secs(600));
    }
    std::thread::sleep(Duration::from_millis(30));

    let reopened = ResearchCache::new(&config(dir.path()));
    assert!(!reopened.contains("short"));
    assert!(reopened.contains("long"));
    assert_eq!(json_files(dir.path()), 1);
}

#[test]
fn test_evicted_and_cleared_entries_removed_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResearchCache::new(&config(dir.path()));
    cache.put("a", payload(1), Duration::from_secs(600));
    cache.put("b", payload(2), Duration::from_secs(600));
    assert_eq!(json_files(dir.path()), 2);

    cache.clear();
    assert_eq!(json_files(dir.path()), 0);
    assert_eq!(cache.stats().entries, 0);
}

#[test]
fn test_unusable_dir_falls_back_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "x").unwrap();

    let cache = ResearchCache::new(&config(&blocker));
    assert!(cache.is_bypassed());
    cache.put("k", payload(1), Duration::from_secs(60));
    assert_eq!(cache.get("k"), Some(payload(1)));
    assert!(cache.stats().bypass);
}

#[test]
fn test_write_failure_enters_bypass() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    let cache = ResearchCache::new(&config(&cache_dir));
    assert!(!cache.is_bypassed());

    fs::remove_dir_all(&cache_dir).unwrap();
    cache.put("k", payload(1), Duration::from_secs(60));

    assert!(cache.is_bypassed());
    assert_eq!(cache.get("k"), Some(payload(1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_computed_entry_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = ResearchCache::new(&config(dir.path()));
        let lookup = cache
            .get_or_compute(
                "search:news:rust",
                Duration::from_secs(600),
                &tokio_util::sync::CancellationToken::new(),
                || async { Ok(payload(4)) },
            )
            .await
            .unwrap();
        assert!(!lookup.cached);
        assert!(!cache.is_bypassed());
    }
    assert_eq!(json_files(dir.path()), 1);

    let reopened = ResearchCache::new(&config(dir.path()));
    assert_eq!(reopened.get("search:news:rust"), Some(payload(4)));
}
