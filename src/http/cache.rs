//! Cache validation module
//!
//! `ETag` formatting and conditional request matching.

/// Wrap a content token into a strong `ETag` value
///
/// Returns `None` for an empty token so no header gets attached.
pub fn quote_etag(token: &str) -> Option<String> {
    (!token.is_empty()).then(|| format!("\"{token}\""))
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports a single tag, a comma separated list and the `*` wildcard.
/// Weak tags (`W/"..."`) compare equal to their strong form, as weak
/// comparison is what `If-None-Match` calls for.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').any(|e| {
            let e = e.trim();
            e == "*" || strip_weak(e) == strip_weak(etag)
        })
    })
}

/// Decide whether a `Range` header may be honoured given `If-Range`
///
/// A missing `If-Range` always allows the range. With a validator, the
/// range only applies when it is exactly our strong `ETag`; dates never
/// match since no modification time is tracked.
pub fn if_range_allows(if_range: Option<&str>, etag: Option<&str>) -> bool {
    match (if_range.map(str::trim), etag) {
        (None, _) => true,
        (Some(tag), Some(etag)) => !tag.starts_with("W/") && tag == etag,
        (Some(_), None) => false,
    }
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}
