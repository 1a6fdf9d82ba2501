// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! On-disk mirror of cache entries
//!
//! One JSON file per entry, named by the blake3 hash of the key.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

use super::store::CacheEntry;

const ENTRY_EXT: &str = "json";

/// Directory holding persisted cache entries
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Open (creating if needed) the cache directory
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let name = blake3::hash(key.as_bytes()).to_hex();
        self.dir.join(format!("{}.{}", name, ENTRY_EXT))
    }

    /// Read every entry file
    ///
    /// Unreadable or corrupt files are skipped and removed; only directory
    /// level failures are returned.
    pub fn load_all(&self) -> io::Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        for item in fs::read_dir(&self.dir)? {
            let path = item?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            let parsed = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<CacheEntry>(&bytes).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Dropping unreadable cache file {}: {}", path.display(), e);
                    let _ = fs::remove_file(&path);
                }
            }
        }
        Ok(entries)
    }

    /// Write an entry atomically (temp file + rename)
    pub fn write(&self, entry: &CacheEntry) -> io::Result<()> {
        let bytes = serde_json::to_vec(entry)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.entry_path(&entry.key))
            .map_err(|e| e.error)?;
        Ok(())
    }

    /// Delete the file for `key`; a missing file is not an error
    pub fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.entry_path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
