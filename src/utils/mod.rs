//! Utility modules supporting catalog operations.
//!
//! - [`HttpClient`]: the shared transport (timeout, redirects, `User-Agent`)
//! - [`Downloader`]: fetches a file and resolves its filename
//! - [`clean_text`], [`dedup_by_id`], [`sort_case_insensitive`],
//!   [`format_from_mime`]: normalization applied to both sources
//!
//! # Filename resolution
//!
//! ```rust
//! use flibusta_fetch::utils::resolve_filename;
//!
//! let name = resolve_filename(Some("attachment; filename=\"book%20one.fb2\""), "http://x/b/1/fb2");
//! assert_eq!(name, "book one.fb2");
//!
//! // Without a header the last path segment is used as-is
//! assert_eq!(resolve_filename(None, "http://x/b/123/epub"), "epub");
//! ```

mod download;
mod http;
mod normalize;

pub use download::{
    filename_from_disposition, filename_from_url, resolve_filename, sanitize_filename, Downloader,
    PLACEHOLDER_FILENAME,
};
pub use http::HttpClient;
pub use normalize::{
    absolute_url, clean_text, dedup_by_id, format_from_mime, sort_case_insensitive,
};
