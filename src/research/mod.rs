// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multi-source research on top of search and content extraction

pub mod aggregator;
pub mod config;
pub mod pending;
pub mod retry;
pub mod service;

pub use aggregator::{
    AggregationConfig, CitedSource, ResearchReport, ScoredContent, SkippedSource,
    SummaryAggregator,
};
pub use config::ResearchConfig;
pub use pending::PendingResearch;
pub use retry::{with_retry, RetryConfig};
pub use service::ResearchService;
