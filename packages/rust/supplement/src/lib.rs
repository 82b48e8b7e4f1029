//! Archive supplement strategies.
//!
//! Feeds under-report for some hosts (substack caps its default feed near
//! the 20 most recent items), so a strategy crawls a fixed archive endpoint
//! and extracts candidate post URLs the feeds never mentioned. Extraction is
//! best-effort link scraping with no completeness guarantee; the dedup/storage
//! core never depends on which strategy produced a candidate.

mod substack;

use tracing::debug;
use url::Url;

use postsync_shared::{PostsyncError, Result, SupplementStrategy};

pub use substack::SubstackArchive;

/// Desktop-browser User-Agent for archive requests. The host blocks default
/// client UAs, so the archive fetch overrides the per-client identity.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// A host-specific way of discovering post URLs beyond the feed.
pub trait ArchiveStrategy: Send + Sync {
    /// The fixed archive endpoint for an owner's primary URL.
    fn archive_url(&self, primary_url: &str) -> String;

    /// Extract candidate post URLs from raw archive HTML, normalized and
    /// deduplicated, in first-occurrence order.
    fn extract_candidates(&self, html: &str, archive_url: &Url) -> Vec<String>;

    /// Strategy name for tracing.
    fn name(&self) -> &str;
}

/// Resolve the strategy implementation for an owner's strategy tag.
/// `none` and `browser` (manual/out-of-band) resolve to no strategy.
pub fn strategy_for(tag: SupplementStrategy) -> Option<Box<dyn ArchiveStrategy>> {
    match tag {
        SupplementStrategy::Archive => Some(Box::new(SubstackArchive)),
        SupplementStrategy::None | SupplementStrategy::Browser => None,
    }
}

/// Last path segment of a candidate post URL, used to slug archive stubs.
pub fn post_slug(candidate: &str) -> Option<String> {
    let url = Url::parse(candidate).ok()?;
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()
        .map(str::to_string)
}

/// Fetch an archive page as raw HTML with a browser User-Agent.
pub async fn fetch_archive(client: &reqwest::Client, archive_url: &str) -> Result<String> {
    let response = client
        .get(archive_url)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await
        .map_err(|e| PostsyncError::Network(format!("{archive_url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PostsyncError::Network(format!(
            "{archive_url}: HTTP {status}"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| PostsyncError::Network(format!("{archive_url}: body read failed: {e}")))?;

    debug!(archive_url, bytes = body.len(), "archive page fetched");
    Ok(body)
}
