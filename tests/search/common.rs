// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use web_research_node::search::types::RawHit;
use web_research_node::search::SearchProvider;
use web_research_node::{ResearchError, Result};

pub enum Behaviour {
    Hits(Vec<RawHit>),
    Fail(ResearchError),
}

/// In-process provider that records every call
pub struct ScriptedProvider {
    name: &'static str,
    behaviour: Behaviour,
    calls: AtomicUsize,
    queries: Mutex<Vec<(String, usize)>>,
}

impl ScriptedProvider {
    pub fn hits(name: &'static str, hits: Vec<RawHit>) -> Self {
        Self::with(name, Behaviour::Hits(hits))
    }

    pub fn failing(name: &'static str, err: ResearchError) -> Self {
        Self::with(name, Behaviour::Fail(err))
    }

    fn with(name: &'static str, behaviour: Behaviour) -> Self {
        Self {
            name,
            behaviour,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (query, requested count) of every call
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<RawHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), num_results));
        match &self.behaviour {
            Behaviour::Hits(hits) => Ok(hits.iter().take(num_results).cloned().collect()),
            Behaviour::Fail(err) => Err(err.clone()),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        true
    }
}

pub fn hit(url: &str, title: &str, snippet: &str) -> RawHit {
    RawHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
        published_date: None,
        source: "scripted".to_string(),
    }
}

pub fn numbered_hits(prefix: &str, n: usize) -> Vec<RawHit> {
    (0..n)
        .map(|i| {
            hit(
                &format!("https://{}.example.com/page/{}", prefix, i),
                &format!("{} result {}", prefix, i),
                "",
            )
        })
        .collect()
}
