//! Substack archive link extraction.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use postsync_feed::normalize_url;

use crate::ArchiveStrategy;

/// Canonical single-slug post path: `/p/{segment}` and nothing after
/// (a lone trailing slash is tolerated; the normalizer strips it).
static POST_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/p/[A-Za-z0-9._~%-]+/?$").expect("valid post path regex"));

/// Broad scan for absolute post URLs anywhere in the document, catching
/// links embedded in script/JSON blobs. Comments pages are captured so they
/// can be excluded explicitly.
static RAW_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s"'<>\\]+/p/[A-Za-z0-9._~%-]+(?:/comments)?"#)
        .expect("valid raw link regex")
});

/// Suffix marking a comments page, not a post.
const COMMENTS_SUFFIX: &str = "/comments";

/// Archive extraction for substack-hosted newsletters.
///
/// The archive page is typically rendered client-side, so a static HTML
/// fetch yields an incomplete set — still a valuable superset beyond the
/// feed's recency cap. The broad raw-text pass can also pick up post-shaped
/// paths inside unrelated JSON blobs; that noise is accepted as part of the
/// best-effort contract rather than filtered with fragile heuristics.
pub struct SubstackArchive;

impl ArchiveStrategy for SubstackArchive {
    fn archive_url(&self, primary_url: &str) -> String {
        format!("{}/archive", primary_url.trim_end_matches('/'))
    }

    fn extract_candidates(&self, html: &str, archive_url: &Url) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<String> = Vec::new();
        let mut push = |normalized: String| {
            if seen.insert(normalized.clone()) {
                candidates.push(normalized);
            }
        };

        // Pass 1: anchor hrefs whose resolved path is a single-slug post path.
        let doc = Html::parse_document(html);
        let link_sel = Selector::parse("a[href]").expect("valid selector");
        for el in doc.select(&link_sel) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            let Ok(resolved) = archive_url.join(href) else {
                continue;
            };
            if POST_PATH_RE.is_match(resolved.path()) {
                push(normalize_url(resolved.as_str(), None));
            }
        }

        // Pass 2: raw-text scan for absolute post URLs, comments excluded.
        for m in RAW_LINK_RE.find_iter(html) {
            let matched = m.as_str();
            if matched.ends_with(COMMENTS_SUFFIX) {
                continue;
            }
            push(normalize_url(matched, None));
        }

        candidates
    }

    fn name(&self) -> &str {
        "substack-archive"
    }
}
