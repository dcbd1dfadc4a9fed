//! Primary/fallback orchestration across two catalog sources.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::{Author, Book, SearchResult, SourceKind};
use crate::sources::{CatalogSource, SourceError};

/// Progress notifications emitted while an operation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// The primary source failed or found nothing; the secondary is queried next
    FallingBack { from: SourceKind, to: SourceKind },
}

impl std::fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusUpdate::FallingBack { from, to } => {
                write!(f, "No results from the {} catalog, trying {}...", from, to)
            }
        }
    }
}

/// Channel on which status updates are delivered.
///
/// Sends never block; a dropped receiver is ignored.
pub type StatusSender = UnboundedSender<StatusUpdate>;

/// Queries the primary source and falls back to the secondary one.
///
/// The secondary source is used only when the primary fails or returns no
/// items. A secondary result is returned even when it is empty, and the two
/// are never merged. Requests are strictly sequential.
#[derive(Debug, Clone)]
pub struct FallbackCatalog {
    primary: Arc<dyn CatalogSource>,
    fallback: Arc<dyn CatalogSource>,
}

impl FallbackCatalog {
    pub fn new(primary: Arc<dyn CatalogSource>, fallback: Arc<dyn CatalogSource>) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &Arc<dyn CatalogSource> {
        &self.primary
    }

    pub fn fallback(&self) -> &Arc<dyn CatalogSource> {
        &self.fallback
    }

    /// Search books; `None` only when both sources failed
    pub async fn search_books(
        &self,
        query: &str,
        page: u32,
        status: Option<&StatusSender>,
    ) -> Option<SearchResult<Book>> {
        tracing::info!("Searching books: '{}' (page {})", query, page);
        self.run(
            "book search",
            status,
            self.primary.search_books(query, page),
            || self.fallback.search_books(query, page),
        )
        .await
    }

    /// Search authors; `None` only when both sources failed
    pub async fn search_authors(
        &self,
        query: &str,
        page: u32,
        status: Option<&StatusSender>,
    ) -> Option<SearchResult<Author>> {
        tracing::info!("Searching authors: '{}' (page {})", query, page);
        self.run(
            "author search",
            status,
            self.primary.search_authors(query, page),
            || self.fallback.search_authors(query, page),
        )
        .await
    }

    /// List an author's books; `None` only when both sources failed
    pub async fn author_books(
        &self,
        author_id: &str,
        page: u32,
        status: Option<&StatusSender>,
    ) -> Option<SearchResult<Book>> {
        tracing::info!("Listing books of author {}", author_id);
        self.run(
            "author books",
            status,
            self.primary.author_books(author_id, page),
            || self.fallback.author_books(author_id, page),
        )
        .await
    }

    async fn run<T, P, F, Fut>(
        &self,
        operation: &str,
        status: Option<&StatusSender>,
        primary: P,
        fallback: F,
    ) -> Option<SearchResult<T>>
    where
        P: Future<Output = Result<SearchResult<T>, SourceError>>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SearchResult<T>, SourceError>>,
    {
        match primary.await {
            Ok(result) if !result.is_empty() => {
                tracing::info!(
                    "{}: {} results from {}",
                    operation,
                    result.len(),
                    self.primary.name()
                );
                return Some(result);
            }
            Ok(_) => tracing::info!("{}: {} returned no results", operation, self.primary.name()),
            Err(e) => tracing::warn!("{}: {} failed: {}", operation, self.primary.name(), e),
        }

        if let Some(sender) = status {
            let update = StatusUpdate::FallingBack {
                from: self.primary.kind(),
                to: self.fallback.kind(),
            };
            if sender.send(update).is_err() {
                tracing::debug!("Status receiver dropped");
            }
        }

        match fallback().await {
            Ok(result) => {
                tracing::info!(
                    "{}: {} results from {}",
                    operation,
                    result.len(),
                    self.fallback.name()
                );
                Some(result)
            }
            Err(e) => {
                tracing::error!("{}: {} failed: {}", operation, self.fallback.name(), e);
                None
            }
        }
    }
}
