// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::fs;
use web_research_node::{BookmarkStore, NewBookmark, ResearchError};

#[test]
fn test_bookmarks_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("bookmarks.jsonl");

    let (first, second) = {
        let store = BookmarkStore::open(&path).unwrap();
        let first = store
            .add(
                NewBookmark::new("https://arxiv.org/abs/1234", "Paper")
                    .with_tags(["ml", "survey"])
                    .with_note("read later"),
            )
            .unwrap();
        let second = store
            .add(NewBookmark::new("https://docs.rs/tokio", "Tokio"))
            .unwrap();
        (first, second)
    };

    let reopened = BookmarkStore::open(&path).unwrap();
    assert_eq!(reopened.list(), vec![first.clone(), second.clone()]);
    assert_eq!(reopened.get(&first.id).unwrap().note.as_deref(), Some("read later"));

    // one JSON record per line
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn test_remove_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookmarks.jsonl");

    let store = BookmarkStore::open(&path).unwrap();
    let kept = store.add(NewBookmark::new("https://a.example", "A")).unwrap();
    let gone = store.add(NewBookmark::new("https://b.example", "B")).unwrap();
    store.remove(&gone.id).unwrap();
    drop(store);

    let reopened = BookmarkStore::open(&path).unwrap();
    assert_eq!(reopened.list(), vec![kept]);
    assert!(matches!(reopened.remove(&gone.id), Err(ResearchError::NotFound(_))));
}

#[test]
fn test_ids_stay_unique_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookmarks.jsonl");

    let mut new = NewBookmark::new("https://a.example", "A");
    new.id = Some("fixed-id".to_string());
    BookmarkStore::open(&path).unwrap().add(new.clone()).unwrap();

    let reopened = BookmarkStore::open(&path).unwrap();
    assert!(matches!(reopened.add(new), Err(ResearchError::InvalidInput(_))));
    assert_eq!(reopened.len(), 1);
}

#[test]
fn test_find_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookmarks.jsonl");
    {
        let store = BookmarkStore::open(&path).unwrap();
        store
            .add(NewBookmark::new("https://example.com/solar", "Solar Outlook").with_tags(["Energy"]))
            .unwrap();
        store.add(NewBookmark::new("https://example.com/wind", "Wind")).unwrap();
    }

    let reopened = BookmarkStore::open(&path).unwrap();
    assert_eq!(reopened.find("energy").len(), 1);
    assert_eq!(reopened.find("EXAMPLE.COM").len(), 2);
}
