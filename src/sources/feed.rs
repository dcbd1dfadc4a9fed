//! OPDS feed catalog source.
//!
//! Unlike the HTML pages, the feed carries explicit acquisition links with
//! MIME types and an exact `next` relation for pagination.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};

use super::opds::{FeedDocument, FeedEntry, FeedLink, FeedPerson};
use crate::models::{Author, Book, BookBuilder, DownloadLink, SearchResult, SourceKind};
use crate::sources::{require_author_id, require_query, CatalogSource, SourceError};
use crate::utils::{
    absolute_url, clean_text, dedup_by_id, format_from_mime, sort_case_insensitive, HttpClient,
};

/// Placeholder for entries without a title or author name
const UNKNOWN: &str = "Unknown";

/// Viewer links are acquisition-like but not downloadable files
const VIEWER_MIME: &str = "text/html";

/// Relation prefix for cover images
const IMAGE_REL: &str = "opds-spec.org/image";

/// Entry title marking the alphabetical bibliography on an author's root feed
const ALPHABET_TITLE: &str = "алфавит";

/// Link fragment marking the alphabetical bibliography
const ALPHABET_HREF: &str = "alphabet";

fn id_regex(pattern: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    pattern.get_or_init(|| Regex::new(source).expect("valid feed regex"))
}

fn book_id_in(href: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let caps = id_regex(&RE, r"/b/(\d+)").captures(href)?;
    Some(caps[1].to_string())
}

fn author_id_in(uri: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let caps = id_regex(&RE, r"/a/(\d+)").captures(uri)?;
    Some(caps[1].to_string())
}

/// Entry content lists the file size as `Размер: 583 Kb`
fn size_in(content: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let caps = id_regex(&RE, r"(?i)Размер:\s*([^<\n]+)").captures(content)?;
    let size = caps[1].trim();
    if size.is_empty() {
        None
    } else {
        Some(size.to_string())
    }
}

fn feed_author_id_in(href: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let caps = id_regex(&RE, r"/author/(\d+)").captures(href)?;
    Some(caps[1].to_string())
}

/// Search type parameter of the opensearch endpoint
#[derive(Debug, Clone, Copy)]
enum SearchType {
    Books,
    Authors,
}

impl SearchType {
    fn as_str(&self) -> &'static str {
        match self {
            SearchType::Books => "books",
            SearchType::Authors => "authors",
        }
    }
}

/// OPDS catalog source
#[derive(Debug, Clone)]
pub struct FeedSource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl FeedSource {
    /// Create a feed source; `base_url` is the catalog root, the feed is
    /// expected under `{base_url}/opds`
    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn feed_url(&self) -> String {
        format!("{}/opds", self.base_url)
    }

    fn search_url(&self, query: &str, search_type: SearchType, page: u32) -> String {
        format!(
            "{}/opensearch?searchTerm={}&searchType={}&pageNumber={}",
            self.feed_url(),
            urlencoding::encode(query),
            search_type.as_str(),
            page
        )
    }

    async fn fetch(&self, url: &str) -> Result<FeedDocument, SourceError> {
        tracing::info!("OPDS request: {}", url);
        let xml = self.client.get_text(url).await?;
        FeedDocument::parse(&xml)
    }

    /// Convert feed entries to books.
    ///
    /// Entries without a book id or without any downloadable link are
    /// dropped.
    pub fn parse_books(doc: &FeedDocument, base_url: &str) -> Vec<Book> {
        let books: Vec<Book> = doc
            .entries
            .iter()
            .filter_map(|entry| entry_to_book(entry, base_url))
            .collect();

        let mut books = dedup_by_id(books, |b| b.id.as_str());
        sort_case_insensitive(&mut books, |b| b.title.as_str());
        books
    }

    /// Convert author search entries to authors
    pub fn parse_authors(doc: &FeedDocument) -> Vec<Author> {
        let mut authors: Vec<Author> = doc
            .entries
            .iter()
            .filter_map(|entry| {
                let name = clean_text(entry.title.as_deref()?);
                if name.is_empty() {
                    return None;
                }
                let id = entry
                    .links
                    .iter()
                    .find_map(|link| feed_author_id_in(&link.href))
                    .unwrap_or_default();
                let author = if id.is_empty() {
                    Author::new(id, name)
                } else {
                    let uri = format!("/a/{}", id);
                    Author::new(id, name).with_uri(uri)
                };
                Some(author)
            })
            .collect();

        sort_case_insensitive(&mut authors, |a| a.name.as_str());
        authors
    }

    /// Find the alphabetical bibliography link on an author's root feed
    pub fn alphabetical_link(doc: &FeedDocument) -> Option<&str> {
        doc.entries.iter().find_map(|entry| {
            let title_matches = entry
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(ALPHABET_TITLE));

            entry
                .links
                .iter()
                .find(|link| title_matches || link.href.contains(ALPHABET_HREF))
                .map(|link| link.href.as_str())
        })
    }
}

fn entry_to_book(entry: &FeedEntry, base_url: &str) -> Option<Book> {
    let Some(book_id) = entry.links.iter().find_map(|link| book_id_in(&link.href)) else {
        tracing::debug!("Skipping feed entry without a book id: {:?}", entry.title);
        return None;
    };

    let links = download_links(&entry.links, base_url);
    if links.is_empty() {
        tracing::debug!("Skipping book {} without downloadable formats", book_id);
        return None;
    }

    let title = entry
        .title
        .as_deref()
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let mut builder = BookBuilder::new(book_id, title)
        .authors(entry.authors.iter().map(person_to_author).collect())
        .format(links[0].format.as_str())
        .download_links(links);

    if let Some(language) = &entry.language {
        builder = builder.language(language.as_str());
    }
    if let Some(year) = &entry.issued {
        builder = builder.year(year.as_str());
    }
    if let Some(size) = entry.content.as_deref().and_then(size_in) {
        builder = builder.size(size);
    }
    if let Some(description) = entry.content.as_deref().map(clean_text) {
        if !description.is_empty() {
            builder = builder.description(description);
        }
    }
    if let Some(cover) = cover_link(&entry.links) {
        builder = builder.cover_url(absolute_url(base_url, &cover.href));
    }

    Some(builder.build())
}

fn person_to_author(person: &FeedPerson) -> Author {
    let name = person
        .name
        .as_deref()
        .map(clean_text)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let id = person
        .uri
        .as_deref()
        .and_then(author_id_in)
        .unwrap_or_default();

    let author = Author::new(id, name);
    match &person.uri {
        Some(uri) => author.with_uri(uri.as_str()),
        None => author,
    }
}

/// Acquisition links minus viewer links, with formats derived from MIME types
fn download_links(links: &[FeedLink], base_url: &str) -> Vec<DownloadLink> {
    links
        .iter()
        .filter(|link| link.is_acquisition())
        .filter(|link| {
            !link
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.contains(VIEWER_MIME))
        })
        .map(|link| {
            let url = absolute_url(base_url, &link.href);
            match link.mime_type.as_deref().filter(|m| !m.trim().is_empty()) {
                Some(mime) => DownloadLink::new(url, format_from_mime(mime)).with_mime_type(mime),
                // No type reported: the conventional URL ends in the format
                None => {
                    let format = url
                        .trim_end_matches('/')
                        .rsplit('/')
                        .next()
                        .unwrap_or_default()
                        .to_lowercase();
                    DownloadLink::new(url, format)
                }
            }
        })
        .collect()
}

/// Full-size cover preferred over the thumbnail
fn cover_link(links: &[FeedLink]) -> Option<&FeedLink> {
    let images = || {
        links
            .iter()
            .filter(|link| link.rel.as_deref().is_some_and(|rel| rel.contains(IMAGE_REL)))
    };
    images()
        .find(|link| !link.rel.as_deref().unwrap_or_default().contains("thumbnail"))
        .or_else(|| images().next())
}

#[async_trait]
impl CatalogSource for FeedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }

    async fn search_books(&self, query: &str, page: u32) -> Result<SearchResult<Book>, SourceError> {
        let query = require_query(query)?;
        let doc = self
            .fetch(&self.search_url(query, SearchType::Books, page))
            .await?;
        let books = Self::parse_books(&doc, &self.base_url);
        Ok(SearchResult::new(books, SourceKind::Feed).has_more(doc.has_next()))
    }

    async fn search_authors(
        &self,
        query: &str,
        page: u32,
    ) -> Result<SearchResult<Author>, SourceError> {
        let query = require_query(query)?;
        let doc = self
            .fetch(&self.search_url(query, SearchType::Authors, page))
            .await?;
        let authors = Self::parse_authors(&doc);
        Ok(SearchResult::new(authors, SourceKind::Feed).has_more(doc.has_next()))
    }

    async fn author_books(
        &self,
        author_id: &str,
        _page: u32,
    ) -> Result<SearchResult<Book>, SourceError> {
        let author_id = require_author_id(author_id)?;
        let root_url = format!("{}/author/{}", self.feed_url(), author_id);
        let root = self.fetch(&root_url).await?;

        // Bibliographies sit behind a secondary link on the author's root feed
        let doc = match Self::alphabetical_link(&root) {
            Some(href) => {
                let url = absolute_url(&self.base_url, href);
                self.fetch(&url).await?
            }
            None => root,
        };

        let books = Self::parse_books(&doc, &self.base_url);
        Ok(SearchResult::new(books, SourceKind::Feed))
    }

    async fn probe(&self) -> Result<(), SourceError> {
        self.client.probe(&self.feed_url()).await
    }
}
