//! Catalog source plugins behind one trait.
//!
//! The catalog exposes two independent access paths:
//!
//! - [`HtmlSource`] scrapes the rendered search and author pages
//! - [`FeedSource`] reads the OPDS (Atom) feed
//!
//! Both implement [`CatalogSource`]. [`FallbackCatalog`] depends only on the
//! trait: it asks the primary source first and falls back to the secondary
//! one when the primary fails or finds nothing. A new access path can be
//! added by implementing the trait.

mod fallback;
mod feed;
mod html;
mod opds;
pub mod mock;

pub use fallback::{FallbackCatalog, StatusSender, StatusUpdate};
pub use feed::FeedSource;
pub use html::HtmlSource;
pub use opds::{FeedDocument, FeedEntry, FeedLink, FeedPerson};
pub use mock::MockSource;

use crate::models::{Author, Book, SearchResult, SourceKind};
use async_trait::async_trait;

/// The interface every catalog access path implements.
///
/// Methods return `Err` for transport and parse failures. Callers that need
/// the "absent result" contract go through [`FallbackCatalog`], which logs
/// the error and moves on.
#[async_trait]
pub trait CatalogSource: Send + Sync + std::fmt::Debug {
    /// Which backend this is; recorded as provenance on every result
    fn kind(&self) -> SourceKind;

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Search books by free text. `page` is zero-based.
    async fn search_books(&self, query: &str, page: u32)
        -> Result<SearchResult<Book>, SourceError>;

    /// Search authors by free text. `page` is zero-based.
    async fn search_authors(
        &self,
        query: &str,
        page: u32,
    ) -> Result<SearchResult<Author>, SourceError>;

    /// List an author's books, alphabetically
    async fn author_books(
        &self,
        author_id: &str,
        page: u32,
    ) -> Result<SearchResult<Book>, SourceError>;

    /// Lightweight reachability check for startup diagnostics
    async fn probe(&self) -> Result<(), SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connection, timeout or body read failure
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Malformed or unexpected document structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl SourceError {
    /// Whether this is a transport-level failure (as opposed to a parse failure)
    pub fn is_transport(&self) -> bool {
        matches!(self, SourceError::Network(_) | SourceError::Status(_))
    }
}

/// Reject blank search terms before any request is made
pub(crate) fn require_query(query: &str) -> Result<&str, SourceError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SourceError::InvalidRequest("empty search query".to_string()));
    }
    Ok(query)
}

/// Author ids are numeric and end up in a URL path
pub(crate) fn require_author_id(author_id: &str) -> Result<&str, SourceError> {
    let author_id = author_id.trim();
    if author_id.is_empty() || !author_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(SourceError::InvalidRequest(format!(
            "invalid author id '{}'",
            author_id
        )));
    }
    Ok(author_id)
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::Status(status.as_u16()),
            None => SourceError::Network(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
