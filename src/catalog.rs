//! Catalog facade: one entry point for search, browsing and downloads.

use std::sync::Arc;

use crate::config::Config;
use crate::models::{Author, Book, DownloadedBook, SearchResult, SourceKind};
use crate::sources::{FallbackCatalog, FeedSource, HtmlSource, SourceError, StatusSender};
use crate::utils::{Downloader, HttpClient};

/// Outcome of the startup connectivity probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionReport {
    /// First access path that answered, HTML before the feed
    pub reachable: Option<SourceKind>,
}

impl ConnectionReport {
    pub fn is_connected(&self) -> bool {
        self.reachable.is_some()
    }
}

impl std::fmt::Display for ConnectionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reachable {
            Some(kind) => write!(f, "Connected to the catalog ({})", kind),
            None => write!(f, "Could not connect to the catalog"),
        }
    }
}

/// The catalog client.
///
/// Owns one shared HTTP transport, the HTML source as primary, the feed
/// source as fallback, and the downloader.
#[derive(Debug, Clone)]
pub struct Catalog {
    sources: FallbackCatalog,
    downloader: Downloader,
}

impl Catalog {
    /// Build the transport and both sources from configuration
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = Arc::new(HttpClient::new(config)?);
        let html = HtmlSource::new(client.clone(), config.base_url());
        let feed = FeedSource::new(client.clone(), config.base_url());

        Ok(Self::from_parts(
            FallbackCatalog::new(Arc::new(html), Arc::new(feed)),
            Downloader::new(client),
        ))
    }

    /// Assemble a catalog from existing parts
    pub fn from_parts(sources: FallbackCatalog, downloader: Downloader) -> Self {
        Self {
            sources,
            downloader,
        }
    }

    pub fn sources(&self) -> &FallbackCatalog {
        &self.sources
    }

    pub async fn search_books(
        &self,
        query: &str,
        page: u32,
        status: Option<&StatusSender>,
    ) -> Option<SearchResult<Book>> {
        self.sources.search_books(query, page, status).await
    }

    pub async fn search_authors(
        &self,
        query: &str,
        page: u32,
        status: Option<&StatusSender>,
    ) -> Option<SearchResult<Author>> {
        self.sources.search_authors(query, page, status).await
    }

    pub async fn author_books(
        &self,
        author_id: &str,
        page: u32,
        status: Option<&StatusSender>,
    ) -> Option<SearchResult<Book>> {
        self.sources.author_books(author_id, page, status).await
    }

    /// Download a book file; there is no fallback path for downloads
    pub async fn download(&self, url: &str) -> Option<DownloadedBook> {
        self.downloader.download(url).await
    }

    /// Probe the HTML root, then the feed root
    pub async fn check_connection(&self) -> ConnectionReport {
        tracing::info!("Checking catalog connection");

        for source in [self.sources.primary(), self.sources.fallback()] {
            match source.probe().await {
                Ok(()) => {
                    return ConnectionReport {
                        reachable: Some(source.kind()),
                    }
                }
                Err(e) => tracing::warn!("{} check failed: {}", source.name(), e),
            }
        }

        ConnectionReport { reachable: None }
    }
}
