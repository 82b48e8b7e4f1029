//! Content and date extraction over mapped feed items.

use chrono::{DateTime, Utc};

use postsync_shared::CONTENT_FALLBACK;

use crate::source::FeedItem;

/// Date token used in storage keys when no publication date is known.
pub const UNKNOWN_DATE_TOKEN: &str = "unknown";

/// Maximum length of the persisted short description, in chars.
const DESCRIPTION_MAX_CHARS: usize = 200;

/// Pick the richest non-empty body field, in fixed priority order:
/// full content first, then the summary/description. `None` when the item
/// carried no usable text.
pub fn extract_body(item: &FeedItem) -> Option<String> {
    [&item.content, &item.summary]
        .into_iter()
        .flatten()
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Body text for the markdown rendering — the extracted body, or the fixed
/// fallback line when the feed gave us nothing.
pub fn body_or_fallback(item: &FeedItem) -> String {
    extract_body(item).unwrap_or_else(|| CONTENT_FALLBACK.to_string())
}

/// Truncate body text to the short description stored in metadata.
pub fn short_description(body: &str) -> String {
    body.chars().take(DESCRIPTION_MAX_CHARS).collect()
}

/// Resolve the publication instant: `published` first, then `updated`.
/// All-absent (or all-unparseable in the source document) resolves to `None`.
pub fn resolve_published(item: &FeedItem) -> Option<DateTime<Utc>> {
    item.published.or(item.updated)
}

/// Derive the storage-key date token: `YYYY-MM-DD` in UTC, or `unknown`.
pub fn date_token(published: Option<DateTime<Utc>>) -> String {
    match published {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => UNKNOWN_DATE_TOKEN.to_string(),
    }
}
