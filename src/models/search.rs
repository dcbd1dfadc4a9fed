//! Search result and download models.

use serde::{Deserialize, Serialize};

/// Which catalog backend produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Rendered HTML search/browse pages
    Html,
    /// OPDS (Atom) feed
    Feed,
}

impl SourceKind {
    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Html => "HTML",
            SourceKind::Feed => "OPDS",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Results of one catalog operation.
///
/// `T` is either [`Book`](super::Book) or [`Author`](super::Author), so a
/// result is always homogeneous.
///
/// `has_more` means different things per source: the HTML pages only hint at
/// a next page through a link in the raw markup, while the feed carries an
/// explicit `next` relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    pub items: Vec<T>,

    /// Best-effort count, zero when unknown
    pub total_count: usize,

    pub has_more: bool,

    /// Provenance, for display only
    pub source: SourceKind,
}

impl<T> SearchResult<T> {
    /// Create a result; `total_count` is taken from the item count
    pub fn new(items: Vec<T>, source: SourceKind) -> Self {
        Self {
            total_count: items.len(),
            items,
            has_more: false,
            source,
        }
    }

    /// Create an empty result for a source
    pub fn empty(source: SourceKind) -> Self {
        Self::new(Vec::new(), source)
    }

    /// Set whether another page is available
    pub fn has_more(mut self, has_more: bool) -> Self {
        self.has_more = has_more;
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Maximum length of the title part of a generated filename
const MAX_TITLE_FILENAME_CHARS: usize = 50;

/// A downloaded book file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedBook {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl DownloadedBook {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Filename to save the file under when `format` was requested.
    ///
    /// Keeps the server-provided name when it already ends with `.{format}`,
    /// otherwise builds one from the book title.
    pub fn filename_for(&self, title: &str, format: &str) -> String {
        let extension = format!(".{}", format.to_lowercase());
        if self.filename.to_lowercase().ends_with(&extension) {
            return self.filename.clone();
        }

        let safe_title: String = title
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .collect();
        let safe_title: String = safe_title
            .trim()
            .chars()
            .take(MAX_TITLE_FILENAME_CHARS)
            .collect();
        let safe_title = if safe_title.is_empty() {
            "book".to_string()
        } else {
            safe_title
        };

        format!("{}{}", safe_title, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SourceKind::Html).unwrap(), "\"html\"");
        assert_eq!(serde_json::to_string(&SourceKind::Feed).unwrap(), "\"feed\"");
    }

    #[test]
    fn test_search_result_counts() {
        let result = SearchResult::new(vec![1, 2, 3], SourceKind::Html).has_more(true);
        assert_eq!(result.total_count, 3);
        assert!(result.has_more);
        assert!(!result.is_empty());

        let empty: SearchResult<u8> = SearchResult::empty(SourceKind::Feed);
        assert!(empty.is_empty());
        assert_eq!(empty.total_count, 0);
    }

    #[test]
    fn test_filename_for_keeps_matching_extension() {
        let file = DownloadedBook::new(vec![1, 2], "Bulgakov_Master.fb2");
        assert_eq!(file.filename_for("Мастер", "fb2"), "Bulgakov_Master.fb2");
    }

    #[test]
    fn test_filename_for_builds_from_title() {
        let file = DownloadedBook::new(vec![], "epub");
        assert_eq!(
            file.filename_for("Война и мир: том 1!", "epub"),
            "Война и мир том 1.epub"
        );
    }

    #[test]
    fn test_filename_for_truncates_long_titles() {
        let file = DownloadedBook::new(vec![], "book");
        let title = "a".repeat(80);
        let name = file.filename_for(&title, "mobi");
        assert_eq!(name, format!("{}.mobi", "a".repeat(50)));
    }

    #[test]
    fn test_filename_for_empty_title() {
        let file = DownloadedBook::new(vec![], "x");
        assert_eq!(file.filename_for("???", "pdf"), "book.pdf");
    }
}
