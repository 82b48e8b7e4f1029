//! In-memory dedup index, hydrated from the on-disk store at the start of
//! each run.
//!
//! Durability lives in the post/metadata files; the index is rebuilt fresh
//! every invocation and discarded at process exit. A URL counts as "seen"
//! once it is either found in an existing metadata file or added during the
//! run — that is the sole mechanism preventing duplicate downloads across
//! repeated invocations.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};

use postsync_feed::normalize_url;
use postsync_shared::{PostsyncError, Result};

/// Normalized links and storage keys seen so far.
#[derive(Debug, Default)]
pub struct DedupIndex {
    links: HashSet<String>,
    keys: HashSet<String>,
}

impl DedupIndex {
    /// Empty index (no prior state).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from disk state: every metadata file's `link` field
    /// (run through the normalizer; unparseable files are skipped) plus the
    /// base names of existing markdown files.
    pub fn hydrate(root: &Path, posts_dir: &str, metadata_dir: &str) -> Result<Self> {
        let mut index = Self::new();

        let metadata_path = root.join(metadata_dir);
        if metadata_path.is_dir() {
            let entries = std::fs::read_dir(&metadata_path)
                .map_err(|e| PostsyncError::io(&metadata_path, e))?;

            for entry in entries {
                let entry = entry.map_err(|e| PostsyncError::io(&metadata_path, e))?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }

                let content = match std::fs::read_to_string(&path) {
                    Ok(content) => content,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "unreadable metadata file, skipping");
                        continue;
                    }
                };

                match serde_json::from_str::<serde_json::Value>(&content) {
                    Ok(value) => {
                        if let Some(link) = value.get("link").and_then(|v| v.as_str()) {
                            index.add(&normalize_url(link, None));
                        }
                    }
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "unparseable metadata file, skipping");
                    }
                }
            }
        }

        let posts_path = root.join(posts_dir);
        if posts_path.is_dir() {
            let entries =
                std::fs::read_dir(&posts_path).map_err(|e| PostsyncError::io(&posts_path, e))?;

            for entry in entries {
                let entry = entry.map_err(|e| PostsyncError::io(&posts_path, e))?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    index.add_key(stem);
                }
            }
        }

        debug!(
            links = index.links.len(),
            keys = index.keys.len(),
            "dedup index hydrated"
        );

        Ok(index)
    }

    /// Whether a normalized URL has been seen.
    pub fn contains(&self, normalized_url: &str) -> bool {
        self.links.contains(normalized_url)
    }

    /// Mark a normalized URL as seen.
    pub fn add(&mut self, normalized_url: &str) {
        self.links.insert(normalized_url.to_string());
    }

    /// Whether a storage key is taken.
    pub fn has_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Mark a storage key as taken.
    pub fn add_key(&mut self, key: &str) {
        self.keys.insert(key.to_string());
    }
}
