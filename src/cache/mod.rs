// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Research cache
//!
//! One owned key → payload store shared by search and extraction:
//! - TTL per entry (`now >= expires_at` means absent)
//! - Byte budget enforced by evicting the earliest-expiring entries
//! - Single-flight: concurrent callers for one key share one computation
//! - Optional on-disk mirror, reloaded at startup

pub mod disk;
pub mod key;
pub mod store;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub use key::{content_key, normalize_url, search_key};
pub use store::{CacheEntry, CacheLookup, CachePayload, CacheStats, Computed, ResearchCache};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Default entry lifetime in days (default: 1)
    pub retention_days: u64,
    /// Total payload budget in bytes (default: 64 MiB)
    pub max_size_bytes: u64,
    /// Directory for persisted entries; memory-only when unset
    pub dir: Option<PathBuf>,
    /// Seconds between janitor sweeps (default: 300)
    pub janitor_interval_secs: u64,
}

impl CacheConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            retention_days: env::var("RESEARCH_CACHE_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retention_days),
            max_size_bytes: env::var("RESEARCH_CACHE_MAX_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_size_bytes),
            dir: env::var("RESEARCH_CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            janitor_interval_secs: env::var("RESEARCH_CACHE_JANITOR_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.janitor_interval_secs),
        }
    }

    /// Lifetime given to entries stored without an explicit TTL
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(SECS_PER_DAY))
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_size_bytes == 0 {
            return Err("cache max_size_bytes must be greater than 0".to_string());
        }
        if self.janitor_interval_secs == 0 {
            return Err("cache janitor_interval_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retention_days: 1,
            max_size_bytes: 64 * 1024 * 1024,
            dir: None,
            janitor_interval_secs: 300,
        }
    }
}
