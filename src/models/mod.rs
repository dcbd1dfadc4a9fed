//! Core data models for books, authors and search results.

mod book;
mod search;

pub use book::{Author, Book, BookBuilder, DownloadLink};
pub use search::{DownloadedBook, SearchResult, SourceKind};
