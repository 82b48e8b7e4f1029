//! File-backed post store: one markdown document plus one JSON metadata
//! document per storage key. These pairs are the durable representation;
//! there is no other index.

pub mod dedup;
pub mod keys;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use postsync_feed::extract::UNKNOWN_DATE_TOKEN;
use postsync_shared::{PostRecord, PostsyncError, Result};

pub use dedup::DedupIndex;
pub use keys::{allocate_key, compose_key, slugify};

/// Writes post/metadata pairs under a target root.
pub struct PostStore {
    posts_path: PathBuf,
    metadata_path: PathBuf,
}

impl PostStore {
    /// Store rooted at an owner directory with the given subdirectory names.
    pub fn new(root: &Path, posts_dir: &str, metadata_dir: &str) -> Self {
        Self {
            posts_path: root.join(posts_dir),
            metadata_path: root.join(metadata_dir),
        }
    }

    /// Persist one post: `posts/{key}.md` and `metadata/{key}.json`,
    /// creating the owning directories if absent. The allocator guarantees
    /// key uniqueness per run, so overwrites are not expected here.
    #[instrument(skip_all, fields(key))]
    pub fn write(&self, key: &str, record: &PostRecord, body: &str) -> Result<()> {
        std::fs::create_dir_all(&self.posts_path)
            .map_err(|e| PostsyncError::io(&self.posts_path, e))?;
        std::fs::create_dir_all(&self.metadata_path)
            .map_err(|e| PostsyncError::io(&self.metadata_path, e))?;

        let post_path = self.posts_path.join(format!("{key}.md"));
        std::fs::write(&post_path, render_markdown(record, body))
            .map_err(|e| PostsyncError::io(&post_path, e))?;

        let json = serde_json::to_string_pretty(record).map_err(|e| {
            PostsyncError::validation(format!("JSON serialization failed: {e}"))
        })?;
        let meta_path = self.metadata_path.join(format!("{key}.json"));
        std::fs::write(&meta_path, json).map_err(|e| PostsyncError::io(&meta_path, e))?;

        debug!(key, post = %post_path.display(), "wrote post pair");
        Ok(())
    }

    /// Check the pairing invariant: every markdown file has a metadata file
    /// with the same key, and vice versa.
    pub fn verify(&self) -> Result<VerifyReport> {
        let post_keys = list_keys(&self.posts_path, "md")?;
        let meta_keys = list_keys(&self.metadata_path, "json")?;

        let missing_metadata: Vec<String> =
            post_keys.difference(&meta_keys).cloned().collect();
        let missing_posts: Vec<String> = meta_keys.difference(&post_keys).cloned().collect();
        let paired = post_keys.intersection(&meta_keys).count();

        Ok(VerifyReport {
            paired,
            missing_metadata,
            missing_posts,
        })
    }
}

/// Result of a store pairing check.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// Keys present on both sides.
    pub paired: usize,
    /// Markdown files without a metadata file.
    pub missing_metadata: Vec<String>,
    /// Metadata files without a markdown file.
    pub missing_posts: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing_metadata.is_empty() && self.missing_posts.is_empty()
    }
}

/// Render the human-readable markdown document for a post.
pub fn render_markdown(record: &PostRecord, body: &str) -> String {
    let published = record
        .published
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE_TOKEN.to_string());

    format!(
        "# {}\n\n- Published: {}\n- Link: {}\n\n{}\n",
        record.title, published, record.link, body
    )
}

/// Collect file stems with the given extension; a missing directory is an
/// empty store, not an error.
fn list_keys(dir: &Path, extension: &str) -> Result<BTreeSet<String>> {
    let mut keys = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(keys);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| PostsyncError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PostsyncError::io(dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.insert(stem.to_string());
            }
        }
    }
    Ok(keys)
}
