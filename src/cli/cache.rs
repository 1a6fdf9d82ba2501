// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use super::print_json;
use crate::cache::ResearchCache;
use crate::research::ResearchConfig;

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Entry count, size and hit/miss counters
    Stats,

    /// Remove expired entries (all entries with --all)
    Purge {
        #[arg(long)]
        all: bool,
    },
}

pub fn run(command: CacheCommand, config: &ResearchConfig) -> Result<()> {
    let cache = ResearchCache::new(&config.cache);

    match command {
        CacheCommand::Stats => print_json(&cache.stats()),
        CacheCommand::Purge { all } => {
            let before = cache.stats().entries;
            if all {
                cache.clear();
            } else {
                cache.purge_expired();
            }
            let after = cache.stats();
            print_json(&json!({
                "removed": before.saturating_sub(after.entries),
                "remaining": after.entries,
            }))
        }
    }
}
