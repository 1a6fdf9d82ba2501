// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Saved research sources
//!
//! Bookmarks live in a JSON Lines file that is rewritten atomically on
//! every mutation.

pub mod store;

pub use store::{Bookmark, BookmarkStore, NewBookmark};
