// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Durable bookmark store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ResearchError, Result};

/// A saved source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Bookmark {
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.url.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Input for [`BookmarkStore::add`]
#[derive(Debug, Clone, Default)]
pub struct NewBookmark {
    /// Caller supplied id; a UUID is generated when absent
    pub id: Option<String>,
    pub url: String,
    pub title: String,
    pub tags: Vec<String>,
    pub note: Option<String>,
}

impl NewBookmark {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Bookmarks backed by a JSON Lines file
pub struct BookmarkStore {
    path: PathBuf,
    records: Mutex<Vec<Bookmark>>,
}

impl BookmarkStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            load(&path)?
        } else {
            Vec::new()
        };
        info!("Opened bookmark store {} ({} records)", path.display(), records.len());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Bookmark>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Save a bookmark
    ///
    /// Rejects an empty URL and an id that is already taken with
    /// `InvalidInput`.
    pub fn add(&self, new: NewBookmark) -> Result<Bookmark> {
        let url = new.url.trim().to_string();
        if url.is_empty() {
            return Err(ResearchError::InvalidInput("bookmark URL is empty".to_string()));
        }

        let mut records = self.lock();
        let id = match new.id {
            Some(id) if records.iter().any(|b| b.id == id) => {
                return Err(ResearchError::InvalidInput(format!(
                    "bookmark id {} already exists",
                    id
                )));
            }
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };

        let mut tags: Vec<String> = Vec::new();
        for tag in new.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        let bookmark = Bookmark {
            id,
            title: if new.title.trim().is_empty() {
                url.clone()
            } else {
                new.title.trim().to_string()
            },
            url,
            tags,
            saved_at: Utc::now(),
            note: new.note.filter(|n| !n.trim().is_empty()),
        };

        let mut updated = records.clone();
        updated.push(bookmark.clone());
        write_atomic(&self.path, &updated)?;
        *records = updated;

        debug!("Added bookmark {} ({})", bookmark.id, bookmark.url);
        Ok(bookmark)
    }

    /// Delete a bookmark; an unknown id is `NotFound`
    pub fn remove(&self, id: &str) -> Result<Bookmark> {
        let mut records = self.lock();
        let Some(pos) = records.iter().position(|b| b.id == id) else {
            return Err(ResearchError::NotFound(format!("bookmark {}", id)));
        };

        let mut updated = records.clone();
        let removed = updated.remove(pos);
        write_atomic(&self.path, &updated)?;
        *records = updated;

        debug!("Removed bookmark {}", id);
        Ok(removed)
    }

    /// Case-insensitive substring search over title, URL and tags
    pub fn find(&self, query: &str) -> Vec<Bookmark> {
        let needle = query.trim().to_lowercase();
        self.lock()
            .iter()
            .filter(|b| b.matches(&needle))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Bookmark> {
        self.lock().iter().find(|b| b.id == id).cloned()
    }

    /// All bookmarks in insertion order
    pub fn list(&self) -> Vec<Bookmark> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn io_error(path: &Path, action: &str, err: impl std::fmt::Display) -> ResearchError {
    ResearchError::StoreIoError(format!("{} {}: {}", action, path.display(), err))
}

fn load(path: &Path) -> Result<Vec<Bookmark>> {
    let content = fs::read_to_string(path).map_err(|e| io_error(path, "reading", e))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .map_err(|e| io_error(path, &format!("parsing line {} of", n + 1), e))
        })
        .collect()
}

/// Replace the file with `records` through a temp file + rename
fn write_atomic(path: &Path, records: &[Bookmark]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| io_error(&dir, "creating", e))?;

    let tmp = NamedTempFile::new_in(&dir).map_err(|e| io_error(&dir, "creating temp file in", e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        for record in records {
            serde_json::to_writer(&mut writer, record).map_err(|e| io_error(path, "encoding", e))?;
            writer.write_all(b"\n").map_err(|e| io_error(path, "writing", e))?;
        }
        writer.flush().map_err(|e| io_error(path, "writing", e))?;
    }
    tmp.as_file().sync_all().map_err(|e| io_error(path, "syncing", e))?;
    tmp.persist(path).map_err(|e| io_error(path, "replacing", e.error))?;
    Ok(())
}
