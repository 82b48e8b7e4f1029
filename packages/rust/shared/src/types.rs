//! Core domain types for postsync owner configs and post records.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PostsyncError, Result};

/// Host marker identifying the hosted-newsletter platform.
///
/// Owners published there get the `substack` source kind and, unless the
/// config says otherwise, the archive supplement strategy (the platform's
/// default feed is capped near the 20 most recent items).
pub const SUBSTACK_MARKER: &str = "substack";

/// Body text used when a feed item carries no usable content.
pub const CONTENT_FALLBACK: &str = "See link for full content.";

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// Where an owner publishes, derived once per owner from their primary URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Substack,
    Blog,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Substack => write!(f, "substack"),
            Self::Blog => write!(f, "blog"),
        }
    }
}

// ---------------------------------------------------------------------------
// SupplementStrategy
// ---------------------------------------------------------------------------

/// How missing-from-feed posts are discovered for an owner.
///
/// `Browser` marks owners whose archives are collected manually out-of-band;
/// postsync never executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplementStrategy {
    None,
    Archive,
    Browser,
}

// ---------------------------------------------------------------------------
// OwnerConfig
// ---------------------------------------------------------------------------

/// The `owner.json` structure at the root of each target repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerConfig {
    /// Human-readable owner name.
    pub display_name: String,
    /// Blog/newsletter title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_name: Option<String>,
    /// Primary source URL (may be absent or empty).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_url: Option<String>,
    /// Social follow URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_url: Option<String>,
    /// Feed URLs in preference order, first preferred.
    #[serde(default)]
    pub feed_urls: Vec<String>,
    /// Stable identifier for the owner's repository.
    pub slug: String,
    /// Supplement strategy override; inferred from `blog_url` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplement_strategy: Option<SupplementStrategy>,
}

impl OwnerConfig {
    /// Load an owner config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PostsyncError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            PostsyncError::config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Primary URL, empty string when the config has none.
    pub fn primary_url(&self) -> &str {
        self.blog_url.as_deref().unwrap_or("")
    }

    /// Source kind, derived from whether the primary URL is on the
    /// hosted-newsletter platform.
    pub fn source_kind(&self) -> SourceKind {
        if self.primary_url().contains(SUBSTACK_MARKER) {
            SourceKind::Substack
        } else {
            SourceKind::Blog
        }
    }

    /// Effective supplement strategy: the explicit tag when present,
    /// otherwise `archive` for substack-hosted owners and `none` elsewhere.
    pub fn resolved_strategy(&self) -> SupplementStrategy {
        self.supplement_strategy.unwrap_or({
            if self.primary_url().contains(SUBSTACK_MARKER) {
                SupplementStrategy::Archive
            } else {
                SupplementStrategy::None
            }
        })
    }
}

// ---------------------------------------------------------------------------
// PostRecord
// ---------------------------------------------------------------------------

/// The JSON metadata document persisted alongside each post's markdown file.
///
/// `link` is the canonical (normalized) URL and doubles as the dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    /// Post title, `"Untitled"` when the feed supplies none.
    pub title: String,
    /// Canonical absolute URL.
    pub link: String,
    /// Publication instant, null when unknown.
    #[serde(default, with = "iso_millis")]
    pub published: Option<DateTime<Utc>>,
    /// Last-updated instant, null when unknown.
    #[serde(default, with = "iso_millis")]
    pub updated: Option<DateTime<Utc>>,
    /// Owner's publishing platform.
    pub source: SourceKind,
    /// Feed (or archive page) URL the record originated from.
    pub feed: String,
    /// Truncated body, null when the item had no content.
    pub description: Option<String>,
    /// Feed guid, falling back to the canonical link.
    pub guid: String,
    /// True only for archive-derived stubs lacking full content.
    #[serde(default)]
    pub supplement: bool,
}

/// Serde adapter for nullable millisecond-precision ISO-8601 timestamps
/// with a `Z` suffix (`2024-03-05T00:00:00.000Z`).
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => ser.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(de)?;
        match raw {
            None => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }
}
