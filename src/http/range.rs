//! HTTP Range request parsing module
//!
//! Single byte-range support (RFC 9110 section 14). Multi-range requests
//! are served as full responses.

/// Resolved, inclusive byte range within a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    /// Last byte included
    pub end: usize,
}

impl ByteRange {
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value
    pub fn content_range(&self, total: usize) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Serve this part with 206
    Satisfiable(ByteRange),
    /// Range lies outside the body, answer 416
    NotSatisfiable,
    /// No usable Range header, serve the full body
    Ignored,
}

/// Parse a `Range` header against a body of `total` bytes
///
/// Supported forms: `bytes=start-end`, `bytes=start-` and `bytes=-suffix`.
///
/// ```
/// use embedserve::http::range::{parse_range_header, ByteRange, RangeParseResult};
///
/// assert_eq!(
///     parse_range_header(Some("bytes=0-1"), 10),
///     RangeParseResult::Satisfiable(ByteRange { start: 0, end: 1 })
/// );
/// assert_eq!(parse_range_header(None, 10), RangeParseResult::Ignored);
/// ```
pub fn parse_range_header(range_header: Option<&str>, total: usize) -> RangeParseResult {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeParseResult::Ignored;
    };
    // an empty body is always served whole
    if total == 0 || spec.contains(',') {
        return RangeParseResult::Ignored;
    }
    let Some((start, end)) = spec.split_once('-') else {
        return RangeParseResult::Ignored;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return suffix_range(end, total);
    }

    let Ok(start) = start.parse::<usize>() else {
        return RangeParseResult::Ignored;
    };
    let end = if end.is_empty() {
        None
    } else {
        match end.parse::<usize>() {
            Ok(e) => Some(e),
            Err(_) => return RangeParseResult::Ignored,
        }
    };

    if start >= total {
        return RangeParseResult::NotSatisfiable;
    }
    match end {
        Some(e) if e < start => RangeParseResult::Ignored,
        Some(e) => RangeParseResult::Satisfiable(ByteRange {
            start,
            end: e.min(total - 1),
        }),
        None => RangeParseResult::Satisfiable(ByteRange {
            start,
            end: total - 1,
        }),
    }
}

/// `-N`: the last N bytes
fn suffix_range(suffix: &str, total: usize) -> RangeParseResult {
    let Ok(suffix) = suffix.parse::<usize>() else {
        return RangeParseResult::Ignored;
    };
    if suffix == 0 {
        return RangeParseResult::NotSatisfiable;
    }
    RangeParseResult::Satisfiable(ByteRange {
        start: total.saturating_sub(suffix),
        end: total - 1,
    })
}
