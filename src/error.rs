// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy shared by every stage of the research pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by one provider while the chain was running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    /// Provider name (e.g. "brave")
    pub provider: String,
    /// Human readable reason
    pub reason: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no providers configured".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur anywhere in the research pipeline
///
/// The enum is `Clone` because a single-flight computation hands the same
/// outcome to every waiter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResearchError {
    /// Caller supplied an empty query, malformed URL, unknown type, ...
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation exceeded its time budget
    #[error("Timeout after {timeout_ms}ms")]
    Timeout {
        /// Budget that was exceeded
        timeout_ms: u64,
    },

    /// Transport-level failure (DNS, refused connection, redirect loop, ...)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Non-success HTTP status
    #[error("HTTP error: status {status}")]
    HttpError {
        /// Status code returned by the server
        status: u16,
    },

    /// Response body exceeded the configured byte limit
    #[error("Response too large: more than {limit_bytes} bytes")]
    TooLarge {
        /// Limit that was crossed
        limit_bytes: u64,
    },

    /// A provider (or the whole chain) could not serve the request
    #[error("Provider unavailable: {}", join_failures(.failures))]
    ProviderUnavailable {
        /// Per-provider failure detail
        failures: Vec<ProviderFailure>,
    },

    /// Provider asked us to back off
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// Input could not be turned into content
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Every source of a report failed
    #[error("Insufficient sources: {0}")]
    InsufficientSources(String),

    /// Cache directory could not be read or written
    #[error("Cache I/O error: {0}")]
    CacheIOError(String),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bookmark file could not be read or written
    #[error("Store I/O error: {0}")]
    StoreIoError(String),
}

impl ResearchError {
    /// Single-provider unavailability
    pub fn provider_unavailable(provider: &str, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            failures: vec![ProviderFailure {
                provider: provider.to_string(),
                reason: reason.into(),
            }],
        }
    }

    /// Network failures worth one more attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionError(_) => true,
            Self::HttpError { status } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }

    /// Map a reqwest transport error onto the taxonomy
    pub fn from_transport(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else if err.is_redirect() {
            Self::ConnectionError(format!("redirect limit exceeded: {}", err))
        } else if let Some(status) = err.status() {
            Self::HttpError {
                status: status.as_u16(),
            }
        } else {
            Self::ConnectionError(err.to_string())
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ResearchError>;
