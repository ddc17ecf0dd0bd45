//! HTTP protocol helpers
//!
//! Conditional requests, MIME types, byte ranges and canned responses.
//! Nothing in here knows about the path index.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::{parse_range_header, ByteRange, RangeParseResult};
pub use response::{
    build_304_response, build_404_response, build_405_response, build_416_response,
    build_error_response, build_options_response,
};
