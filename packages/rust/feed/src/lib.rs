//! Feed fetching, item normalization, and content/date extraction for postsync.
//!
//! The pieces here are deliberately small and pure where possible:
//! [`normalize_url`] builds the dedup key, [`FeedClient`] turns an RSS/Atom
//! document into [`FeedItem`]s, and the `extract` helpers pick the best body
//! and publication date out of whatever the feed supplied.

pub mod extract;
pub mod normalize;
pub mod source;

pub use extract::{
    UNKNOWN_DATE_TOKEN, body_or_fallback, date_token, extract_body, resolve_published,
    short_description,
};
pub use normalize::normalize_url;
pub use source::{FeedClient, FeedItem};
