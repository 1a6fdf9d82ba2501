// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::{Args, Subcommand};

use super::print_json;
use crate::bookmarks::{BookmarkStore, NewBookmark};
use crate::research::ResearchConfig;

#[derive(Subcommand, Debug)]
pub enum BookmarkCommand {
    /// Save a source
    Add(AddArgs),

    /// Delete a bookmark by id
    Remove { id: String },

    /// Case-insensitive search over title, URL and tags
    Find { query: String },

    /// List all bookmarks
    List,
}

/// Arguments for bookmark add
#[derive(Args, Debug)]
pub struct AddArgs {
    pub url: String,

    /// Title (defaults to the URL)
    #[arg(long)]
    pub title: Option<String>,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long)]
    pub note: Option<String>,

    /// Explicit id (a UUID is generated otherwise)
    #[arg(long)]
    pub id: Option<String>,
}

pub fn run(command: BookmarkCommand, config: &ResearchConfig) -> Result<()> {
    let store = BookmarkStore::open(&config.bookmarks_path)?;

    match command {
        BookmarkCommand::Add(args) => {
            let bookmark = store.add(NewBookmark {
                id: args.id,
                url: args.url,
                title: args.title.unwrap_or_default(),
                tags: args.tags,
                note: args.note,
            })?;
            print_json(&bookmark)
        }
        BookmarkCommand::Remove { id } => {
            let removed = store.remove(&id)?;
            print_json(&removed)
        }
        BookmarkCommand::Find { query } => print_json(&store.find(&query)),
        BookmarkCommand::List => print_json(&store.list()),
    }
}
