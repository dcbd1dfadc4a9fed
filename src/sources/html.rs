//! HTML catalog source: scrapes the rendered search and author pages.
//!
//! The listing pages carry no acquisition links, so every book gets the
//! conventional `/b/{id}/{format}` links for fb2, epub and mobi.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::models::{Author, Book, BookBuilder, DownloadLink, SearchResult, SourceKind};
use crate::sources::{require_author_id, require_query, CatalogSource, SourceError};
use crate::utils::{clean_text, dedup_by_id, sort_case_insensitive, HttpClient};

/// Formats every book on the HTML site can be downloaded in
const SYNTHESIZED_FORMATS: [&str; 3] = ["fb2", "epub", "mobi"];

/// Anchor texts on author pages that point at `/b/{id}` but are actions,
/// not titles
const NON_TITLE_ANCHORS: [&str; 7] = ["читать", "скачать", "fb2", "epub", "mobi", "rtf", "txt"];

/// Lines linking to a series listing are not book rows
const SERIES_MARKER: &str = "/s/";

fn book_anchor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<a[^>]*href=["']?/b/(\d+)["']?[^>]*>([^<]+)</a>"#)
            .expect("valid book anchor regex")
    })
}

fn author_anchor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<a[^>]*href=["']?/a/(\d+)["']?[^>]*>([^<]+)</a>"#)
            .expect("valid author anchor regex")
    })
}

/// Author anchors in the writers section may wrap highlighted markup and
/// are usually followed by a book count such as `(212 книг)`
fn section_author_anchor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a[^>]*href=["']?/a/(\d+)["']?[^>]*>(.+?)</a>(?:\s*\((\d+)[^)]*\))?"#)
            .expect("valid author anchor regex")
    })
}

fn writers_section() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)Найденные писатели[^<]*</h3>\s*<ul>(.*?)</ul>")
            .expect("valid writers section regex")
    })
}

/// HTML catalog source
#[derive(Debug, Clone)]
pub struct HtmlSource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl HtmlSource {
    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, query: &str, page: Option<u32>) -> String {
        let mut url = format!(
            "{}/booksearch?ask={}",
            self.base_url,
            urlencoding::encode(query)
        );
        if let Some(page) = page {
            url.push_str(&format!("&page={}", page));
        }
        url
    }

    async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        tracing::info!("HTML request: {}", url);
        self.client.get_text(url).await
    }

    /// Parse a book search page.
    ///
    /// Scans line by line: the first book anchor on a line is the book, an
    /// author anchor on the same line is its author. `has_more` is a
    /// heuristic on the raw text, not a page count: it looks for the
    /// substring `page={page + 1}`, which also matches longer page numbers
    /// sharing that prefix.
    pub fn parse_book_search(html: &str, base_url: &str, page: u32) -> SearchResult<Book> {
        let mut books = Vec::new();

        for line in html.lines() {
            if line.contains(SERIES_MARKER) {
                continue;
            }

            let Some(caps) = book_anchor().captures(line) else {
                continue;
            };
            let book_id = &caps[1];
            let title = clean_text(&caps[2]);
            if title.is_empty() {
                tracing::debug!("Skipping book {} with empty title", book_id);
                continue;
            }

            let mut builder = BookBuilder::new(book_id, title)
                .format(SYNTHESIZED_FORMATS[0])
                .download_links(synthesized_links(base_url, book_id));

            if let Some(author_caps) = author_anchor().captures(line) {
                let name = clean_text(&author_caps[2]);
                if !name.is_empty() {
                    let id = &author_caps[1];
                    builder = builder.author(Author::new(id, name).with_uri(format!("/a/{}", id)));
                }
            }

            books.push(builder.build());
        }

        let mut books = dedup_by_id(books, |b| b.id.as_str());
        sort_case_insensitive(&mut books, |b| b.title.as_str());

        // Substring match: for page 0 this also fires on `page=10`, `page=11`
        // and so on, so it can over-report.
        let has_more = html.contains(&format!("page={}", page + 1));
        SearchResult::new(books, SourceKind::Html).has_more(has_more)
    }

    /// Parse the "found writers" section of a search page.
    ///
    /// Anchors outside that section are ignored; a page without the
    /// section yields an empty result.
    pub fn parse_author_search(html: &str) -> SearchResult<Author> {
        let Some(section) = writers_section().captures(html).and_then(|c| c.get(1)) else {
            return SearchResult::empty(SourceKind::Html);
        };

        let authors: Vec<Author> = section_author_anchor()
            .captures_iter(section.as_str())
            .filter_map(|caps| {
                let id = caps[1].to_string();
                let name = clean_text(&caps[2]);
                if name.is_empty() {
                    return None;
                }
                let uri = format!("/a/{}", id);
                let mut author = Author::new(id, name).with_uri(uri);
                author.books_count = caps.get(3).and_then(|m| m.as_str().parse().ok());
                Some(author)
            })
            .collect();

        let mut authors = dedup_by_id(authors, |a| a.id.as_str());
        sort_case_insensitive(&mut authors, |a| a.name.as_str());

        SearchResult::new(authors, SourceKind::Html)
    }

    /// Parse an author's bibliography page
    pub fn parse_author_books(html: &str, author_id: &str, base_url: &str) -> SearchResult<Book> {
        let books: Vec<Book> = book_anchor()
            .captures_iter(html)
            .filter_map(|caps| {
                let book_id = &caps[1];
                let title = clean_text(&caps[2]);
                if title.is_empty() || is_action_label(&title) {
                    return None;
                }
                Some(
                    BookBuilder::new(book_id, title)
                        .author(Author::new(author_id, ""))
                        .format(SYNTHESIZED_FORMATS[0])
                        .download_links(synthesized_links(base_url, book_id))
                        .build(),
                )
            })
            .collect();

        let mut books = dedup_by_id(books, |b| b.id.as_str());
        sort_case_insensitive(&mut books, |b| b.title.as_str());

        SearchResult::new(books, SourceKind::Html)
    }
}

fn is_action_label(text: &str) -> bool {
    let lower = text.to_lowercase();
    NON_TITLE_ANCHORS.contains(&lower.as_str())
}

fn synthesized_links(base_url: &str, book_id: &str) -> Vec<DownloadLink> {
    SYNTHESIZED_FORMATS
        .iter()
        .map(|format| DownloadLink::new(format!("{}/b/{}/{}", base_url, book_id, format), *format))
        .collect()
}

#[async_trait]
impl CatalogSource for HtmlSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Html
    }

    async fn search_books(&self, query: &str, page: u32) -> Result<SearchResult<Book>, SourceError> {
        let query = require_query(query)?;
        let html = self.fetch(&self.search_url(query, Some(page))).await?;
        Ok(Self::parse_book_search(&html, &self.base_url, page))
    }

    async fn search_authors(
        &self,
        query: &str,
        _page: u32,
    ) -> Result<SearchResult<Author>, SourceError> {
        let query = require_query(query)?;
        // The HTML search lists all matching writers on the first page
        let html = self.fetch(&self.search_url(query, None)).await?;
        Ok(Self::parse_author_search(&html))
    }

    async fn author_books(
        &self,
        author_id: &str,
        _page: u32,
    ) -> Result<SearchResult<Book>, SourceError> {
        let author_id = require_author_id(author_id)?;
        let alphabet_url = format!("{}/a/{}/alphabet", self.base_url, author_id);
        let html = match self.fetch(&alphabet_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Alphabetical listing failed ({}), trying the author page", e);
                self.fetch(&format!("{}/a/{}", self.base_url, author_id))
                    .await?
            }
        };

        Ok(Self::parse_author_books(&html, author_id, &self.base_url))
    }

    async fn probe(&self) -> Result<(), SourceError> {
        self.client.probe(&self.base_url).await
    }
}
