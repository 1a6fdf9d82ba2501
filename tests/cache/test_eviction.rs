// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::time::Duration;
use web_research_node::{CachePayload, ResearchCache};

fn payload() -> CachePayload {
    CachePayload::SearchResults {
        results: vec![],
        requested: 5,
    }
}

fn entry_size() -> u64 {
    serde_json::to_vec(&payload()).unwrap().len() as u64
}

#[test]
fn test_earliest_expiring_entry_evicted_first() {
    let cache = ResearchCache::in_memory(3 * entry_size(), Duration::from_secs(60));
    cache.put("a", payload(), Duration::from_secs(30));
    cache.put("b", payload(), Duration::from_secs(10));
    cache.put("c", payload(), Duration::from_secs(20));
    assert_eq!(cache.stats().entries, 3);

    cache.put("d", payload(), Duration::from_secs(60));

    assert!(!cache.contains("b"));
    for key in ["a", "c", "d"] {
        assert!(cache.contains(key), "{} should survive", key);
    }
    let stats = cache.stats();
    assert_eq!(stats.evictions, 1);
    assert!(stats.bytes <= stats.max_bytes);
}

#[test]
fn test_expired_entries_purged_before_eviction() {
    let cache = ResearchCache::in_memory(2 * entry_size(), Duration::from_secs(60));
    cache.put("stale", payload(), Duration::from_millis(10));
    cache.put("fresh", payload(), Duration::from_secs(5));
    std::thread::sleep(Duration::from_millis(30));

    cache.put("new", payload(), Duration::from_secs(60));

    assert!(cache.contains("fresh"));
    assert!(cache.contains("new"));
    assert_eq!(cache.stats().evictions, 0);
}

#[test]
fn test_budget_never_exceeded() {
    let cache = ResearchCache::in_memory(4 * entry_size(), Duration::from_secs(60));
    for i in 0..20 {
        cache.put(&format!("k{}", i), payload(), Duration::from_secs(10 + i));
        let stats = cache.stats();
        assert!(stats.bytes <= stats.max_bytes);
        assert!(stats.entries <= 4);
    }
    // the four latest-expiring keys remain
    for i in 16..20 {
        assert!(cache.contains(&format!("k{}", i)));
    }
}
