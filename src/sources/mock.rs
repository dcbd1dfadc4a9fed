//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::{Author, Book, BookBuilder, DownloadLink, SearchResult, SourceKind};
use crate::sources::{CatalogSource, SourceError};

/// A mock source that returns predefined results and counts calls.
///
/// Unset responses yield an empty result; [`MockSource::fail_with_status`]
/// makes every operation fail instead.
#[derive(Debug)]
pub struct MockSource {
    kind: SourceKind,
    books: Mutex<Option<Vec<Book>>>,
    authors: Mutex<Option<Vec<Author>>>,
    failure: Mutex<Option<u16>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            books: Mutex::new(None),
            authors: Mutex::new(None),
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Books returned by book search and author listing
    pub fn set_books(&self, books: Vec<Book>) {
        *self.books.lock().unwrap() = Some(books);
    }

    pub fn set_authors(&self, authors: Vec<Author>) {
        *self.authors.lock().unwrap() = Some(authors);
    }

    /// Fail every operation with the given HTTP status
    pub fn fail_with_status(&self, status: u16) {
        *self.failure.lock().unwrap() = Some(status);
    }

    /// Number of operations invoked so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.failure.lock().unwrap() {
            Some(status) => Err(SourceError::Status(status)),
            None => Ok(()),
        }
    }

    fn books(&self) -> SearchResult<Book> {
        let books = self.books.lock().unwrap().clone().unwrap_or_default();
        SearchResult::new(books, self.kind)
    }
}

#[async_trait]
impl CatalogSource for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn search_books(&self, _query: &str, _page: u32) -> Result<SearchResult<Book>, SourceError> {
        self.record()?;
        Ok(self.books())
    }

    async fn search_authors(
        &self,
        _query: &str,
        _page: u32,
    ) -> Result<SearchResult<Author>, SourceError> {
        self.record()?;
        let authors = self.authors.lock().unwrap().clone().unwrap_or_default();
        Ok(SearchResult::new(authors, self.kind))
    }

    async fn author_books(
        &self,
        _author_id: &str,
        _page: u32,
    ) -> Result<SearchResult<Book>, SourceError> {
        self.record()?;
        Ok(self.books())
    }

    async fn probe(&self) -> Result<(), SourceError> {
        self.record()
    }
}

/// Helper function to create a mock book with one fb2 link for testing.
pub fn make_book(book_id: &str, title: &str) -> Book {
    BookBuilder::new(book_id, title)
        .author(Author::new("1", "Test Author"))
        .download_links(vec![DownloadLink::new(
            format!("http://example.com/b/{}/fb2", book_id),
            "fb2",
        )])
        .build()
}
