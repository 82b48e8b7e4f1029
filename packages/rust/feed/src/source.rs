//! Feed fetching and RSS/Atom parsing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::{debug, instrument};

use postsync_shared::{PostsyncError, Result};

/// User-Agent string for feed requests.
const USER_AGENT: &str = concat!("postsync/", env!("CARGO_PKG_VERSION"));

/// One feed entry, mapped into the handful of fields the ingest pipeline
/// cares about. feed-rs folds RSS `content:encoded` into `content` and
/// `description` into `summary`, so both RSS and Atom land in the same shape.
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    /// Entry title, absent when the document omits one.
    pub title: Option<String>,
    /// Entry link, possibly relative to the feed URL.
    pub link: Option<String>,
    /// Feed-supplied guid/id.
    pub guid: Option<String>,
    /// Publication instant; unparseable dates in the document map to `None`.
    pub published: Option<DateTime<Utc>>,
    /// Last-updated instant.
    pub updated: Option<DateTime<Utc>>,
    /// Full body content.
    pub content: Option<String>,
    /// Short summary/description.
    pub summary: Option<String>,
}

/// HTTP client wrapper for fetching and parsing feeds.
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    /// Build a client with the given request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PostsyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// The underlying HTTP client, shared with the archive supplement pass.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Fetch and parse one feed, returning its items in document order.
    #[instrument(skip(self))]
    pub async fn fetch_feed(&self, feed_url: &str) -> Result<Vec<FeedItem>> {
        let response = self
            .client
            .get(feed_url)
            .send()
            .await
            .map_err(|e| PostsyncError::Network(format!("{feed_url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostsyncError::Network(format!("{feed_url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PostsyncError::Network(format!("{feed_url}: body read failed: {e}")))?;

        let feed = feed_rs::parser::parse(&bytes[..])
            .map_err(|e| PostsyncError::feed(format!("{feed_url}: {e}")))?;

        let items: Vec<FeedItem> = feed.entries.into_iter().map(map_entry).collect();

        debug!(feed_url, items = items.len(), "feed parsed");
        Ok(items)
    }
}

/// Map a feed-rs entry into a [`FeedItem`].
fn map_entry(entry: feed_rs::model::Entry) -> FeedItem {
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()));

    let guid = (!entry.id.is_empty()).then(|| entry.id.clone());

    FeedItem {
        title: entry.title.map(|t| t.content),
        link,
        guid,
        published: entry.published,
        updated: entry.updated,
        content: entry
            .content
            .and_then(|c| c.body)
            .filter(|body| !body.trim().is_empty()),
        summary: entry
            .summary
            .map(|s| s.content)
            .filter(|text| !text.trim().is_empty()),
    }
}
