//! URL canonicalization for dedup keys.

use url::Url;

/// Normalize a raw URL into its canonical form.
///
/// Resolves relative input against `base`, drops the fragment, preserves the
/// query string, and strips a single trailing slash unless the path is the
/// root. Unparseable input comes back as the trimmed original — dedup on a
/// raw string beats losing the item.
///
/// Normalization is idempotent: feeding the output back in yields the same
/// string.
pub fn normalize_url(raw: &str, base: Option<&Url>) -> String {
    let trimmed = raw.trim();

    let parsed = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    };

    let mut url = match parsed {
        Ok(url) => url,
        Err(_) => return trimmed.to_string(),
    };

    url.set_fragment(None);

    let path = url.path();
    if path != "/" && path.ends_with('/') {
        let stripped = path.trim_end_matches('/').to_string();
        url.set_path(&stripped);
    }

    url.to_string()
}
