//! Minimal OPDS (Atom) document reader.
//!
//! Only the parts the feed source needs are kept: feed-level links, and per
//! entry the title, authors, content, `dc:language`, `dc:issued` and links.
//! Namespace prefixes are ignored; elements are matched by local name.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::sources::SourceError;

/// A `<link>` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedLink {
    pub href: String,
    pub rel: Option<String>,
    pub mime_type: Option<String>,
}

impl FeedLink {
    /// Whether the relation marks a downloadable file
    pub fn is_acquisition(&self) -> bool {
        self.rel
            .as_deref()
            .is_some_and(|rel| rel.contains("acquisition"))
    }

    pub fn rel_is(&self, rel: &str) -> bool {
        self.rel.as_deref() == Some(rel)
    }
}

/// An `<author>` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPerson {
    pub name: Option<String>,
    pub uri: Option<String>,
}

/// An `<entry>` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub authors: Vec<FeedPerson>,
    pub content: Option<String>,
    pub language: Option<String>,
    pub issued: Option<String>,
    pub links: Vec<FeedLink>,
}

/// A parsed feed document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    pub links: Vec<FeedLink>,
    pub entries: Vec<FeedEntry>,
}

impl FeedDocument {
    /// Parse a feed; documents whose root is not `<feed>` are rejected
    pub fn parse(xml: &str) -> Result<Self, SourceError> {
        let mut reader = Reader::from_str(xml);
        let mut parser = FeedParser::default();

        loop {
            match reader.read_event()? {
                Event::Start(e) => parser.start(&e),
                Event::Empty(e) => {
                    parser.start(&e);
                    parser.end(&local_name(&e));
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    parser.end(&name);
                }
                Event::Text(e) => parser.text(&e),
                Event::CData(e) => parser.buffer.push_str(&String::from_utf8_lossy(&e)),
                Event::Eof => break,
                _ => {}
            }
        }

        if !parser.saw_feed {
            return Err(SourceError::Parse("document root is not an Atom feed".to_string()));
        }

        Ok(parser.document)
    }

    /// Whether the feed links to a next page
    pub fn has_next(&self) -> bool {
        self.links.iter().any(|link| link.rel_is("next"))
    }
}

#[derive(Debug, Default)]
struct FeedParser {
    document: FeedDocument,
    stack: Vec<String>,
    entry: Option<FeedEntry>,
    author: Option<FeedPerson>,
    buffer: String,
    saw_feed: bool,
}

impl FeedParser {
    fn in_content(&self) -> bool {
        self.stack.iter().any(|name| name == "content")
    }

    fn start(&mut self, e: &BytesStart) {
        let name = local_name(e);

        if self.stack.is_empty() && name == "feed" {
            self.saw_feed = true;
        }

        // xhtml content keeps collecting text across its child elements
        if !self.in_content() {
            self.buffer.clear();
        }

        match name.as_str() {
            "entry" => self.entry = Some(FeedEntry::default()),
            "author" if self.entry.is_some() => self.author = Some(FeedPerson::default()),
            "link" if !self.in_content() => {
                let link = read_link(e);
                match self.entry.as_mut() {
                    Some(entry) => entry.links.push(link),
                    None => self.document.links.push(link),
                }
            }
            _ => {}
        }

        self.stack.push(name);
    }

    fn text(&mut self, e: &BytesText) {
        match e.unescape() {
            Ok(text) => self.buffer.push_str(&text),
            // Tolerate HTML entities the XML layer does not know
            Err(_) => self.buffer.push_str(&String::from_utf8_lossy(e)),
        }
    }

    fn end(&mut self, name: &str) {
        self.stack.pop();
        let parent = self.stack.last().map(String::as_str);
        let value = self.buffer.trim().to_string();

        if self.in_content() {
            return;
        }

        match (name, parent) {
            ("name", Some("author")) => {
                if let Some(author) = self.author.as_mut() {
                    author.name = non_empty(value);
                }
            }
            ("uri", Some("author")) => {
                if let Some(author) = self.author.as_mut() {
                    author.uri = non_empty(value);
                }
            }
            ("author", Some("entry")) => {
                if let (Some(entry), Some(author)) = (self.entry.as_mut(), self.author.take()) {
                    entry.authors.push(author);
                }
            }
            ("entry", _) => {
                if let Some(entry) = self.entry.take() {
                    self.document.entries.push(entry);
                }
            }
            (field, Some("entry")) => {
                if let Some(entry) = self.entry.as_mut() {
                    match field {
                        "title" => entry.title = non_empty(value),
                        "content" => entry.content = non_empty(value),
                        "language" => entry.language = non_empty(value),
                        "issued" => entry.issued = non_empty(value),
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        self.buffer.clear();
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn read_link(e: &BytesStart) -> FeedLink {
    let mut link = FeedLink::default();
    for attr in e.attributes().with_checks(false).flatten() {
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        match attr.key.local_name().as_ref() {
            b"href" => link.href = value,
            b"rel" => link.rel = Some(value),
            b"type" => link.mime_type = Some(value),
            _ => {}
        }
    }
    link
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
