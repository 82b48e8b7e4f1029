//! Per-owner ingestion: feeds → dedup → store, then the archive supplement.

use url::Url;

use tracing::{debug, info, instrument, warn};

use postsync_feed::{FeedClient, FeedItem, extract, normalize_url};
use postsync_shared::{
    CONTENT_FALLBACK, OwnerConfig, PostRecord, PostsyncError, Result, SourceKind, SyncConfig,
};
use postsync_store::{DedupIndex, PostStore, keys};
use postsync_supplement::{fetch_archive, post_slug, strategy_for};

/// Counts from one owner's sync run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Posts newly written from feeds.
    pub new_posts: usize,
    /// Feed items skipped because their link was already seen.
    pub skipped: usize,
    /// Feeds that failed to fetch or parse.
    pub feed_errors: usize,
    /// Stub records written by the archive supplement pass.
    pub supplement_posts: usize,
}

/// Progress callback for reporting sync status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a post pair is written.
    fn post_written(&self, key: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn post_written(&self, _key: &str) {}
}

/// Run one owner's full ingestion.
///
/// Feeds are processed in configured order; a fetch/parse failure for one
/// feed is logged and counted without aborting the rest. Every accepted item
/// marks its link and storage key seen immediately, so later items in the
/// same run cannot collide. Writes are additive only — existing pairs are
/// never touched, which is what makes an interrupted run safe to resume.
#[instrument(skip_all, fields(owner_dir = %config.owner_dir.display()))]
pub async fn sync_owner(
    config: &SyncConfig,
    progress: &dyn ProgressReporter,
) -> Result<IngestReport> {
    let owner_path = config.owner_dir.join(&config.owner_file);
    if !owner_path.exists() {
        return Err(PostsyncError::config(format!(
            "no {} found at {}",
            config.owner_file,
            config.owner_dir.display()
        )));
    }
    let owner = OwnerConfig::load(&owner_path)?;

    if owner.feed_urls.is_empty() {
        return Err(PostsyncError::config(format!(
            "owner '{}' has no feed URLs configured",
            owner.slug
        )));
    }

    let source = owner.source_kind();
    info!(owner = %owner.slug, feeds = owner.feed_urls.len(), %source, "starting sync");

    progress.phase("Hydrating dedup index");
    let mut index =
        DedupIndex::hydrate(&config.owner_dir, &config.posts_dir, &config.metadata_dir)?;
    let store = PostStore::new(&config.owner_dir, &config.posts_dir, &config.metadata_dir);

    let client = FeedClient::new(config.http_timeout_secs)?;
    let mut report = IngestReport::default();

    // --- Feed pass ---
    progress.phase("Fetching feeds");
    for feed_url in &owner.feed_urls {
        let items = match client.fetch_feed(feed_url).await {
            Ok(items) => items,
            Err(e) => {
                warn!(feed_url, error = %e, "feed failed, continuing with remaining feeds");
                report.feed_errors += 1;
                continue;
            }
        };

        let base = Url::parse(feed_url).ok();
        for item in items {
            match ingest_item(&item, base.as_ref(), feed_url, source, &mut index, &store)? {
                ItemOutcome::Written(key) => {
                    progress.post_written(&key);
                    report.new_posts += 1;
                }
                ItemOutcome::AlreadySeen => report.skipped += 1,
                ItemOutcome::NoLink => {}
            }
        }
    }

    // --- Archive supplement pass ---
    if config.supplement {
        report.supplement_posts =
            supplement_archive(&owner, source, &client, &mut index, &store, progress).await;
    }

    info!(
        owner = %owner.slug,
        new_posts = report.new_posts,
        skipped = report.skipped,
        feed_errors = report.feed_errors,
        supplement_posts = report.supplement_posts,
        "sync complete"
    );

    Ok(report)
}

/// Outcome of processing one feed item.
enum ItemOutcome {
    Written(String),
    AlreadySeen,
    NoLink,
}

/// Normalize, dedup, and persist a single feed item.
fn ingest_item(
    item: &FeedItem,
    base: Option<&Url>,
    feed_url: &str,
    source: SourceKind,
    index: &mut DedupIndex,
    store: &PostStore,
) -> Result<ItemOutcome> {
    // Items with no usable link are skipped silently.
    let Some(raw_link) = item.link.as_deref() else {
        return Ok(ItemOutcome::NoLink);
    };

    let link = normalize_url(raw_link, base);
    if index.contains(&link) {
        return Ok(ItemOutcome::AlreadySeen);
    }

    let title = item
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("Untitled")
        .to_string();

    let published = extract::resolve_published(item);
    let body = extract::body_or_fallback(item);

    let key = keys::allocate_key(index, &extract::date_token(published), &title);

    let record = PostRecord {
        title,
        link: link.clone(),
        published,
        updated: item.updated,
        source,
        feed: feed_url.to_string(),
        description: extract::extract_body(item)
            .map(|body| extract::short_description(&body)),
        guid: item
            .guid
            .clone()
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| link.clone()),
        supplement: false,
    };

    store.write(&key, &record, &body)?;
    index.add(&link);

    Ok(ItemOutcome::Written(key))
}

/// Crawl the owner's archive endpoint and write stub records for candidate
/// posts the feeds never surfaced. Failures here are never fatal to the sync.
async fn supplement_archive(
    owner: &OwnerConfig,
    source: SourceKind,
    client: &FeedClient,
    index: &mut DedupIndex,
    store: &PostStore,
    progress: &dyn ProgressReporter,
) -> usize {
    let Some(strategy) = strategy_for(owner.resolved_strategy()) else {
        return 0;
    };

    let primary = owner.primary_url();
    if primary.is_empty() {
        debug!(owner = %owner.slug, "archive strategy set but no primary URL, skipping");
        return 0;
    }

    progress.phase("Crawling archive");
    let archive_url = strategy.archive_url(primary);

    let html = match fetch_archive(client.http(), &archive_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(archive_url, error = %e, "archive fetch failed, skipping supplement");
            return 0;
        }
    };

    let Ok(base) = Url::parse(&archive_url) else {
        warn!(archive_url, "archive URL unparseable, skipping supplement");
        return 0;
    };

    let candidates = strategy.extract_candidates(&html, &base);
    debug!(
        strategy = strategy.name(),
        candidates = candidates.len(),
        "archive candidates extracted"
    );

    let mut written = 0;
    for candidate in candidates {
        if index.contains(&candidate) {
            continue;
        }
        let Some(slug) = post_slug(&candidate) else {
            continue;
        };

        let key = keys::allocate_key(index, extract::UNKNOWN_DATE_TOKEN, &slug);
        let record = PostRecord {
            title: slug,
            link: candidate.clone(),
            published: None,
            updated: None,
            source,
            feed: archive_url.clone(),
            description: None,
            guid: candidate.clone(),
            supplement: true,
        };

        match store.write(&key, &record, CONTENT_FALLBACK) {
            Ok(()) => {
                index.add(&candidate);
                progress.post_written(&key);
                written += 1;
            }
            Err(e) => {
                warn!(key, error = %e, "failed to write supplement stub");
            }
        }
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("postsync-ingest-test-{nanos}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sync_config(owner_dir: &PathBuf, supplement: bool) -> SyncConfig {
        SyncConfig {
            owner_dir: owner_dir.clone(),
            posts_dir: "posts".into(),
            metadata_dir: "metadata".into(),
            owner_file: "owner.json".into(),
            http_timeout_secs: 5,
            supplement,
        }
    }

    fn write_owner(dir: &PathBuf, feed_url: &str, strategy: Option<&str>) {
        let strategy_field = strategy
            .map(|s| format!(r#","supplementStrategy":"{s}""#))
            .unwrap_or_default();
        std::fs::write(
            dir.join("owner.json"),
            format!(
                r#"{{"displayName":"A. Author","blogUrl":"https://a.example","feedUrls":["{feed_url}"],"slug":"a-author"{strategy_field}}}"#
            ),
        )
        .unwrap();
    }

    async fn mount_body(server: &wiremock::MockServer, path: &str, body: String) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(path))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn rss_feed(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>A Blog</title><link>https://a.example</link><description>posts</description>
{items}
</channel></rss>"#
        )
    }

    fn list_dir(dir: &PathBuf) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[tokio::test]
    async fn scenario_single_item_feed() {
        let server = wiremock::MockServer::start().await;
        mount_body(
            &server,
            "/feed",
            rss_feed(
                r#"<item><title>First</title><link>https://a.example/p/1</link>
<guid>https://a.example/p/1</guid><pubDate>Tue, 05 Mar 2024 00:00:00 GMT</pubDate>
<description>Opening post.</description></item>"#,
            ),
        )
        .await;

        let root = temp_dir();
        write_owner(&root, &format!("{}/feed", server.uri()), None);

        let report = sync_owner(&sync_config(&root, false), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.new_posts, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.feed_errors, 0);

        assert!(root.join("posts/2024-03-05_first.md").exists());
        let meta =
            std::fs::read_to_string(root.join("metadata/2024-03-05_first.json")).unwrap();
        let record: PostRecord = serde_json::from_str(&meta).unwrap();
        assert_eq!(record.title, "First");
        assert_eq!(record.link, "https://a.example/p/1");
        assert_eq!(record.source, SourceKind::Blog);
        assert!(meta.contains("\"2024-03-05T00:00:00.000Z\""));

        let md = std::fs::read_to_string(root.join("posts/2024-03-05_first.md")).unwrap();
        assert!(md.starts_with("# First\n\n- Published: 2024-03-05\n"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let server = wiremock::MockServer::start().await;
        mount_body(
            &server,
            "/feed",
            rss_feed(
                r#"<item><title>One</title><link>https://a.example/p/one</link></item>
<item><title>Two</title><link>https://a.example/p/two</link></item>"#,
            ),
        )
        .await;

        let root = temp_dir();
        write_owner(&root, &format!("{}/feed", server.uri()), None);
        let config = sync_config(&root, false);

        let first = sync_owner(&config, &SilentProgress).await.unwrap();
        assert_eq!(first.new_posts, 2);

        let second = sync_owner(&config, &SilentProgress).await.unwrap();
        assert_eq!(second.new_posts, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(list_dir(&root.join("posts")).len(), 2);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn colliding_titles_get_numeric_suffixes() {
        let server = wiremock::MockServer::start().await;
        mount_body(
            &server,
            "/feed",
            rss_feed(
                r#"<item><title>Hello</title><link>https://a.example/p/h1</link>
<pubDate>Mon, 01 Jan 2024 09:00:00 GMT</pubDate></item>
<item><title>Hello</title><link>https://a.example/p/h2</link>
<pubDate>Mon, 01 Jan 2024 17:00:00 GMT</pubDate></item>"#,
            ),
        )
        .await;

        let root = temp_dir();
        write_owner(&root, &format!("{}/feed", server.uri()), None);

        let report = sync_owner(&sync_config(&root, false), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.new_posts, 2);
        assert!(root.join("posts/2024-01-01_hello.md").exists());
        assert!(root.join("posts/2024-01-01_hello-1.md").exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn unparseable_date_falls_back_to_unknown() {
        let server = wiremock::MockServer::start().await;
        mount_body(
            &server,
            "/feed",
            rss_feed(
                r#"<item><title>Undated</title><link>https://a.example/p/undated</link>
<pubDate>not-a-date</pubDate></item>"#,
            ),
        )
        .await;

        let root = temp_dir();
        write_owner(&root, &format!("{}/feed", server.uri()), None);

        let report = sync_owner(&sync_config(&root, false), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.new_posts, 1);
        assert!(root.join("posts/unknown_undated.md").exists());

        let meta = std::fs::read_to_string(root.join("metadata/unknown_undated.json")).unwrap();
        assert!(meta.contains("\"published\": null"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn broken_feed_does_not_abort_siblings() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/broken"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_body(
            &server,
            "/feed",
            rss_feed(r#"<item><title>Ok</title><link>https://a.example/p/ok</link></item>"#),
        )
        .await;

        let root = temp_dir();
        std::fs::write(
            root.join("owner.json"),
            format!(
                r#"{{"displayName":"A","blogUrl":"https://a.example","feedUrls":["{0}/broken","{0}/feed"],"slug":"a"}}"#,
                server.uri()
            ),
        )
        .unwrap();

        let report = sync_owner(&sync_config(&root, false), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.feed_errors, 1);
        assert_eq!(report.new_posts, 1);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn archive_supplement_writes_stubs_without_duplicating_feed_posts() {
        let server = wiremock::MockServer::start().await;
        let uri = server.uri();

        mount_body(
            &server,
            "/feed",
            rss_feed(&format!(
                r#"<item><title>Shared</title><link>{uri}/p/shared</link>
<pubDate>Tue, 05 Mar 2024 00:00:00 GMT</pubDate><description>Rich body.</description></item>"#
            )),
        )
        .await;
        mount_body(
            &server,
            "/archive",
            r##"<html><body><a href="/p/shared">Shared</a><a href="/p/extra">Extra</a></body></html>"##
                .to_string(),
        )
        .await;

        let root = temp_dir();
        std::fs::write(
            root.join("owner.json"),
            format!(
                r#"{{"displayName":"A","blogUrl":"{uri}","feedUrls":["{uri}/feed"],"slug":"a","supplementStrategy":"archive"}}"#
            ),
        )
        .unwrap();

        let report = sync_owner(&sync_config(&root, true), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.new_posts, 1);
        assert_eq!(report.supplement_posts, 1);

        // The shared URL got exactly one record: the feed-sourced, non-stub one.
        let metadata = list_dir(&root.join("metadata"));
        assert_eq!(metadata.len(), 2);
        let shared =
            std::fs::read_to_string(root.join("metadata/2024-03-05_shared.json")).unwrap();
        let shared: PostRecord = serde_json::from_str(&shared).unwrap();
        assert!(!shared.supplement);
        assert_eq!(shared.description.as_deref(), Some("Rich body."));

        let stub = std::fs::read_to_string(root.join("metadata/unknown_extra.json")).unwrap();
        let stub: PostRecord = serde_json::from_str(&stub).unwrap();
        assert!(stub.supplement);
        assert!(stub.published.is_none());
        assert!(stub.description.is_none());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn archive_fetch_failure_is_not_fatal() {
        let server = wiremock::MockServer::start().await;
        let uri = server.uri();
        mount_body(
            &server,
            "/feed",
            rss_feed(&format!(
                r#"<item><title>Only</title><link>{uri}/p/only</link></item>"#
            )),
        )
        .await;
        // No /archive mock: the fetch 404s.

        let root = temp_dir();
        std::fs::write(
            root.join("owner.json"),
            format!(
                r#"{{"displayName":"A","blogUrl":"{uri}","feedUrls":["{uri}/feed"],"slug":"a","supplementStrategy":"archive"}}"#
            ),
        )
        .unwrap();

        let report = sync_owner(&sync_config(&root, true), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.new_posts, 1);
        assert_eq!(report.supplement_posts, 0);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn missing_owner_config_is_a_config_error() {
        let root = temp_dir();
        let err = sync_owner(&sync_config(&root, false), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, PostsyncError::Config { .. }));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn empty_feed_urls_is_a_config_error() {
        let root = temp_dir();
        std::fs::write(
            root.join("owner.json"),
            r#"{"displayName":"A","feedUrls":[],"slug":"a"}"#,
        )
        .unwrap();

        let err = sync_owner(&sync_config(&root, false), &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no feed URLs"));
        let _ = std::fs::remove_dir_all(&root);
    }
}
