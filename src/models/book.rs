//! Book, author and download link models shared by both catalog sources.

use serde::{Deserialize, Serialize};

/// An author as reported by one catalog source.
///
/// Identifiers are only unique within a source: the HTML pages and the OPDS
/// feed may assign different ids to the same person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Catalog identifier, empty when the source did not expose one
    pub id: String,

    /// Display name (may be empty, e.g. on an author's own bibliography page)
    pub name: String,

    /// Source-relative locator such as `/a/1234`
    pub uri: Option<String>,

    /// Number of books, when the source reports it
    pub books_count: Option<u32>,
}

impl Author {
    /// Create an author with an id and a display name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            uri: None,
            books_count: None,
        }
    }

    /// Set the source-relative locator
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

/// A downloadable rendition of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    /// Absolute URL of the file
    pub url: String,

    /// Lower-case format token (`fb2`, `epub`, `mobi`, `pdf`, ...)
    pub format: String,

    /// MIME type reported by the source, if any
    pub mime_type: Option<String>,
}

impl DownloadLink {
    pub fn new(url: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: format.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// A book from the catalog.
///
/// A book without download links is still valid; the HTML listing only
/// carries ids and titles and its links are synthesized afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Catalog identifier, unique within one result set
    pub id: String,

    /// Cleaned, non-empty title
    pub title: String,

    /// Authors in source order
    pub authors: Vec<Author>,

    pub language: Option<String>,

    /// Preferred format token, the first one the source offers
    pub format: Option<String>,

    pub year: Option<String>,

    /// Plain-text description with markup stripped and entities decoded
    pub description: Option<String>,

    pub download_links: Vec<DownloadLink>,

    pub cover_url: Option<String>,

    /// File size as reported by the source, e.g. `583 Kb`
    pub size: Option<String>,
}

impl Book {
    /// Create a book with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            language: None,
            format: None,
            year: None,
            description: None,
            download_links: Vec::new(),
            cover_url: None,
            size: None,
        }
    }

    /// Find the download link for a format token (case-insensitive)
    pub fn download_link(&self, format: &str) -> Option<&DownloadLink> {
        self.download_links
            .iter()
            .find(|link| link.format.eq_ignore_ascii_case(format))
    }

    /// Comma-separated list of the non-empty author names
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Available format tokens in link order
    pub fn formats(&self) -> Vec<&str> {
        self.download_links.iter().map(|l| l.format.as_str()).collect()
    }
}

/// Builder for constructing Book objects
#[derive(Debug, Clone)]
pub struct BookBuilder {
    book: Book,
}

impl BookBuilder {
    /// Create a new builder with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            book: Book::new(id, title),
        }
    }

    pub fn author(mut self, author: Author) -> Self {
        self.book.authors.push(author);
        self
    }

    pub fn authors(mut self, authors: Vec<Author>) -> Self {
        self.book.authors = authors;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.book.language = Some(language.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.book.format = Some(format.into());
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.book.year = Some(year.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.book.description = Some(description.into());
        self
    }

    pub fn download_links(mut self, links: Vec<DownloadLink>) -> Self {
        self.book.download_links = links;
        self
    }

    pub fn cover_url(mut self, url: impl Into<String>) -> Self {
        self.book.cover_url = Some(url.into());
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.book.size = Some(size.into());
        self
    }

    /// Build the Book
    pub fn build(self) -> Book {
        self.book
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_builder() {
        let book = BookBuilder::new("123", "Мастер и Маргарита")
            .author(Author::new("45", "Михаил Булгаков"))
            .language("ru")
            .format("fb2")
            .year("1967")
            .size("1.2 Mb")
            .download_links(vec![
                DownloadLink::new("http://flibusta.is/b/123/fb2", "fb2"),
                DownloadLink::new("http://flibusta.is/b/123/epub", "epub"),
            ])
            .build();

        assert_eq!(book.id, "123");
        assert_eq!(book.language.as_deref(), Some("ru"));
        assert_eq!(book.format.as_deref(), Some("fb2"));
        assert_eq!(book.size.as_deref(), Some("1.2 Mb"));
        assert_eq!(book.formats(), vec!["fb2", "epub"]);
        assert_eq!(book.author_names(), "Михаил Булгаков");
    }

    #[test]
    fn test_download_link_lookup() {
        let book = BookBuilder::new("1", "Test")
            .download_links(vec![DownloadLink::new("http://x/b/1/mobi", "mobi")])
            .build();

        assert!(book.download_link("MOBI").is_some());
        assert!(book.download_link("pdf").is_none());
    }

    #[test]
    fn test_author_names_skips_empty() {
        let book = BookBuilder::new("1", "Test")
            .author(Author::new("7", ""))
            .author(Author::new("8", "Лев Толстой"))
            .build();

        assert_eq!(book.author_names(), "Лев Толстой");
    }
}
