//! Storage key derivation and collision-safe allocation.

use crate::dedup::DedupIndex;

/// Maximum slug length in chars.
const SLUG_MAX_CHARS: usize = 80;

/// Slug used when a title reduces to nothing.
const EMPTY_SLUG: &str = "post";

/// Generate a filesystem-safe slug from a title: lowercase alphanumeric runs
/// joined by hyphens, capped at 80 chars, `"post"` when nothing survives.
pub fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let slug: String = slug.chars().take(SLUG_MAX_CHARS).collect();
    let slug = slug.trim_end_matches('-').to_string();

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Compose the base storage key `{date-or-"unknown"}_{slug}`.
pub fn compose_key(date_token: &str, title: &str) -> String {
    format!("{date_token}_{}", slugify(title))
}

/// Allocate a collision-free storage key and register it in the index.
///
/// Appends the smallest unused numeric suffix (`-1`, `-2`, …) when the base
/// key is taken — by a file already on disk or by a post accepted earlier in
/// the same run. Call exactly once per accepted post, after dedup.
pub fn allocate_key(index: &mut DedupIndex, date_token: &str, title: &str) -> String {
    let base = compose_key(date_token, title);

    let mut key = base.clone();
    let mut suffix = 1u32;
    while index.has_key(&key) {
        key = format!("{base}-{suffix}");
        suffix += 1;
    }

    index.add_key(&key);
    key
}
