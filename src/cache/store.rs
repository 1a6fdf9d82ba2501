// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TTL + size bounded cache with single-flight computation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::disk::DiskStore;
use super::CacheConfig;
use crate::error::{ResearchError, Result};
use crate::search::types::{ExtractedContent, SearchResult};

/// Value stored under a cache key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CachePayload {
    /// Ranked results plus the result count that was asked for
    #[serde(rename_all = "camelCase")]
    SearchResults {
        results: Vec<SearchResult>,
        requested: usize,
    },
    Content {
        content: ExtractedContent,
    },
}

impl CachePayload {
    fn encoded_len(&self) -> u64 {
        serde_json::to_vec(self).map(|b| b.len() as u64).unwrap_or(0)
    }
}

/// One cached value with its lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub payload: CachePayload,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Length of the JSON-encoded payload
    pub size_bytes: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
    pub max_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Computations currently in flight
    pub inflight: usize,
    /// True once the disk mirror has been abandoned
    pub bypass: bool,
}

/// Result of [`ResearchCache::get_or_compute`]
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub payload: CachePayload,
    /// Served from a stored entry rather than a computation
    pub cached: bool,
}

/// What a computation hands back to [`ResearchCache::get_or_compute_if`]
#[derive(Debug, Clone)]
pub enum Computed {
    /// Store under the key and share with waiters
    Store(CachePayload),
    /// Share with waiters of this flight only
    Transient(CachePayload),
}

type Flight = std::result::Result<CachePayload, ResearchError>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    total_bytes: u64,
    inflight: HashMap<String, watch::Sender<Option<Flight>>>,
}

/// The single owned cache of the research pipeline
pub struct ResearchCache {
    state: Mutex<CacheState>,
    max_size_bytes: u64,
    default_ttl: Duration,
    disk: Mutex<Option<DiskStore>>,
    bypassed: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl ResearchCache {
    /// Create a cache; when `config.dir` is set, persisted entries are
    /// reloaded and the directory is kept in sync from then on
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Self {
            state: Mutex::new(CacheState::default()),
            max_size_bytes: config.max_size_bytes,
            default_ttl: config.default_ttl(),
            disk: Mutex::new(None),
            bypassed: AtomicBool::new(false),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        };

        if let Some(dir) = &config.dir {
            match DiskStore::open(dir).and_then(|d| d.load_all().map(|e| (d, e))) {
                Ok((disk, entries)) => {
                    *cache.lock_disk() = Some(disk);
                    cache.restore(entries);
                }
                Err(e) => cache.enter_bypass(ResearchError::CacheIOError(format!(
                    "cannot open cache dir {}: {}",
                    dir.display(),
                    e
                ))),
            }
        }

        cache
    }

    /// Memory-only cache with the given budget and default TTL
    pub fn in_memory(max_size_bytes: u64, default_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_size_bytes,
            default_ttl,
            disk: Mutex::new(None),
            bypassed: AtomicBool::new(false),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_disk(&self) -> MutexGuard<'_, Option<DiskStore>> {
        self.disk.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter_bypass(&self, err: ResearchError) {
        warn!("{}; cache continues in memory only", err);
        *self.lock_disk() = None;
        self.bypassed.store(true, Ordering::Relaxed);
    }

    fn persist(&self, entry: &CacheEntry) {
        let result = match self.lock_disk().as_ref() {
            Some(store) => store.write(entry),
            None => return,
        };
        if let Err(e) = result {
            self.enter_bypass(ResearchError::CacheIOError(format!(
                "write {}: {}",
                entry.key, e
            )));
        }
    }

    fn unpersist(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        let result = match self.lock_disk().as_ref() {
            Some(store) => keys
                .iter()
                .try_for_each(|key| store.remove(key).map_err(|e| (key, e))),
            None => return,
        };
        if let Err((key, e)) = result {
            self.enter_bypass(ResearchError::CacheIOError(format!(
                "remove {}: {}",
                key, e
            )));
        }
    }

    fn restore(&self, mut entries: Vec<CacheEntry>) {
        let now = Utc::now();
        let (live, expired): (Vec<_>, Vec<_>) =
            entries.drain(..).partition(|e| !e.is_expired(now));
        let stale: Vec<String> = expired.into_iter().map(|e| e.key).collect();

        let mut removed = Vec::new();
        {
            let mut state = self.lock();
            for mut entry in live {
                entry.size_bytes = entry.payload.encoded_len();
                if entry.size_bytes > self.max_size_bytes {
                    removed.push(entry.key);
                    continue;
                }
                removed.extend(self.make_room(&mut state, &entry.key, entry.size_bytes, now));
                state.total_bytes += entry.size_bytes;
                state.entries.insert(entry.key.clone(), entry);
            }
            info!(
                "Restored {} cache entries ({} bytes)",
                state.entries.len(),
                state.total_bytes
            );
        }

        self.unpersist(&stale);
        self.unpersist(&removed);
    }

    /// Live payload for `key`, if any
    pub fn get(&self, key: &str) -> Option<CachePayload> {
        let now = Utc::now();
        let (found, expired) = {
            let mut state = self.lock();
            match state.entries.get(key) {
                Some(entry) if entry.is_expired(now) => {
                    if let Some(old) = state.entries.remove(key) {
                        state.total_bytes -= old.size_bytes;
                    }
                    (None, true)
                }
                Some(entry) => (Some(entry.payload.clone()), false),
                None => (None, false),
            }
        };

        if expired {
            self.unpersist(&[key.to_string()]);
        }
        match found {
            Some(payload) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit: {}", key);
                Some(payload)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss: {}", key);
                None
            }
        }
    }

    /// Store `payload` under `key` for `ttl`
    ///
    /// A zero TTL stores nothing. A payload larger than the whole budget is
    /// not stored. Otherwise expired entries are purged and then the
    /// earliest-expiring entries evicted until the payload fits.
    pub fn put(&self, key: &str, payload: CachePayload, ttl: Duration) {
        if let Some((entry, evicted)) = self.insert(key, payload, ttl) {
            self.unpersist(&evicted);
            self.persist(&entry);
        }
    }

    /// Mirror an insert to disk on the blocking pool
    async fn sync_disk(&self, entry: CacheEntry, evicted: Vec<String>) {
        let Some(store) = self.lock_disk().as_ref().cloned() else {
            return;
        };
        let key = entry.key.clone();

        let synced = tokio::task::spawn_blocking(move || {
            for key in &evicted {
                store
                    .remove(key)
                    .map_err(|e| format!("remove {}: {}", key, e))?;
            }
            store
                .write(&entry)
                .map_err(|e| format!("write {}: {}", entry.key, e))
        })
        .await;

        match synced {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => self.enter_bypass(ResearchError::CacheIOError(reason)),
            Err(e) => self.enter_bypass(ResearchError::CacheIOError(format!(
                "disk task for {} failed: {}",
                key, e
            ))),
        }
    }

    /// Memory side of a put; returns the stored entry and the evicted keys
    fn insert(
        &self,
        key: &str,
        payload: CachePayload,
        ttl: Duration,
    ) -> Option<(CacheEntry, Vec<String>)> {
        if ttl.is_zero() {
            debug!("Not caching {} (zero TTL)", key);
            return None;
        }
        let size_bytes = payload.encoded_len();
        if size_bytes > self.max_size_bytes {
            warn!(
                "Not caching {}: {} bytes exceeds budget of {}",
                key, size_bytes, self.max_size_bytes
            );
            return None;
        }

        let now = Utc::now();
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            created_at: now,
            expires_at: expiry(now, ttl),
            size_bytes,
        };

        let mut state = self.lock();
        if let Some(old) = state.entries.remove(key) {
            state.total_bytes -= old.size_bytes;
        }
        let evicted = self.make_room(&mut state, key, size_bytes, now);
        state.total_bytes += size_bytes;
        state.entries.insert(entry.key.clone(), entry.clone());
        Some((entry, evicted))
    }

    /// Free space for `incoming` bytes; returns the removed keys
    fn make_room(
        &self,
        state: &mut CacheState,
        incoming_key: &str,
        incoming: u64,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut removed: Vec<String> = state
            .entries
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.key.clone())
            .collect();
        for key in &removed {
            if let Some(old) = state.entries.remove(key) {
                state.total_bytes -= old.size_bytes;
            }
        }

        if state.total_bytes + incoming > self.max_size_bytes {
            let mut by_expiry: Vec<(DateTime<Utc>, String)> = state
                .entries
                .values()
                .filter(|e| e.key != incoming_key)
                .map(|e| (e.expires_at, e.key.clone()))
                .collect();
            by_expiry.sort();

            for (_, key) in by_expiry {
                if state.total_bytes + incoming <= self.max_size_bytes {
                    break;
                }
                if let Some(old) = state.entries.remove(&key) {
                    state.total_bytes -= old.size_bytes;
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!("Evicted {} ({} bytes)", key, old.size_bytes);
                    removed.push(key);
                }
            }
        }

        removed
    }

    /// Return the live payload for `key` or compute it once
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        cancel: &CancellationToken,
        compute: F,
    ) -> Result<CacheLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachePayload>>,
    {
        self.get_or_compute_if(key, ttl, cancel, |_| true, move || {
            let fut = compute();
            async move { fut.await.map(Computed::Store) }
        })
        .await
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but a stored or
    /// shared payload is only accepted when `usable` says so
    ///
    /// Concurrent callers for the same key wait on the single in-flight
    /// computation and receive its payload or its error. Failures and
    /// [`Computed::Transient`] payloads are never stored. If the computing caller is cancelled (token or dropped
    /// future) every waiter gets `Cancelled`; a waiter whose own token fires
    /// stops waiting without affecting the computation.
    pub async fn get_or_compute_if<F, Fut, U>(
        &self,
        key: &str,
        ttl: Duration,
        cancel: &CancellationToken,
        usable: U,
        compute: F,
    ) -> Result<CacheLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Computed>>,
        U: Fn(&CachePayload) -> bool,
    {
        let mut flight = loop {
            if cancel.is_cancelled() {
                return Err(ResearchError::Cancelled);
            }
            if let Some(payload) = self.get(key).filter(|p| usable(p)) {
                return Ok(CacheLookup {
                    payload,
                    cached: true,
                });
            }

            let rx = {
                let mut state = self.lock();
                // a flight may have stored the entry since the lookup above
                let stored = state
                    .entries
                    .get(key)
                    .filter(|e| !e.is_expired(Utc::now()) && usable(&e.payload))
                    .map(|e| e.payload.clone());
                if let Some(payload) = stored {
                    drop(state);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(CacheLookup {
                        payload,
                        cached: true,
                    });
                }
                match state.inflight.get(key) {
                    Some(tx) => tx.subscribe(),
                    None => {
                        let (tx, _) = watch::channel(None);
                        state.inflight.insert(key.to_string(), tx);
                        break FlightGuard {
                            cache: self,
                            key: key.to_string(),
                            finished: false,
                        };
                    }
                }
            };

            debug!("Joining in-flight computation for {}", key);
            let payload = wait_for_flight(rx, cancel).await?;
            if usable(&payload) {
                return Ok(CacheLookup {
                    payload,
                    cached: false,
                });
            }
        };

        debug!("Computing {}", key);
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(ResearchError::Cancelled),
            result = compute() => result,
        };

        let outcome = match outcome {
            Ok(Computed::Store(payload)) => {
                // waiters are released once memory holds the entry; the disk
                // mirror follows
                let inserted = self.insert(key, payload.clone(), ttl);
                flight.finish(Ok(payload.clone()));
                if let Some((entry, evicted)) = inserted {
                    self.sync_disk(entry, evicted).await;
                }
                Ok(payload)
            }
            Ok(Computed::Transient(payload)) => {
                debug!("Not caching {} (transient result)", key);
                flight.finish(Ok(payload.clone()));
                Ok(payload)
            }
            Err(e) => {
                flight.finish(Err(e.clone()));
                Err(e)
            }
        };

        outcome.map(|payload| CacheLookup {
            payload,
            cached: false,
        })
    }

    /// Remove every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let removed: Vec<String> = {
            let mut state = self.lock();
            let keys: Vec<String> = state
                .entries
                .values()
                .filter(|e| e.is_expired(now))
                .map(|e| e.key.clone())
                .collect();
            for key in &keys {
                if let Some(old) = state.entries.remove(key) {
                    state.total_bytes -= old.size_bytes;
                }
            }
            keys
        };
        self.unpersist(&removed);
        if !removed.is_empty() {
            debug!("Purged {} expired cache entries", removed.len());
        }
        removed.len()
    }

    /// Drop every entry
    pub fn clear(&self) {
        let keys: Vec<String> = {
            let mut state = self.lock();
            state.total_bytes = 0;
            state.entries.drain().map(|(k, _)| k).collect()
        };
        self.unpersist(&keys);
    }

    /// Whether a live entry exists, without touching hit counters
    pub fn contains(&self, key: &str) -> bool {
        let now = Utc::now();
        self.lock()
            .entries
            .get(key)
            .map(|e| !e.is_expired(now))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            bytes: state.total_bytes,
            max_bytes: self.max_size_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            inflight: state.inflight.len(),
            bypass: self.is_bypassed(),
        }
    }

    /// True when a cache directory was configured but has been abandoned
    pub fn is_bypassed(&self) -> bool {
        self.bypassed.load(Ordering::Relaxed)
    }

    /// Periodically purge expired entries until `cancel` fires
    pub fn spawn_janitor(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.purge_expired();
                    }
                }
            }
            debug!("Cache janitor stopped");
        })
    }
}

/// Waits for the leader of a flight to publish its outcome
async fn wait_for_flight(
    mut rx: watch::Receiver<Option<Flight>>,
    cancel: &CancellationToken,
) -> Result<CachePayload> {
    loop {
        let current = rx.borrow_and_update().clone();
        if let Some(outcome) = current {
            return outcome;
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(ResearchError::Cancelled),
            changed = rx.changed() => {
                if changed.is_err() {
                    // leader went away; take whatever it published last
                    let last = rx.borrow().clone();
                    return last.unwrap_or(Err(ResearchError::Cancelled));
                }
            }
        }
    }
}

/// Owns the in-flight slot for one key while the leader computes
struct FlightGuard<'a> {
    cache: &'a ResearchCache,
    key: String,
    finished: bool,
}

impl FlightGuard<'_> {
    fn finish(&mut self, outcome: Flight) {
        self.finished = true;
        let sender = self.cache.lock().inflight.remove(&self.key);
        if let Some(tx) = sender {
            tx.send_replace(Some(outcome));
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // leader future dropped mid-computation
            self.finish(Err(ResearchError::Cancelled));
        }
    }
}
