//! Download resolution: fetch an acquisition URL and name the file.

use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use std::sync::{Arc, OnceLock};

use super::HttpClient;
use crate::models::DownloadedBook;
use crate::sources::SourceError;

/// Name used when neither the headers nor the URL provide one
pub const PLACEHOLDER_FILENAME: &str = "book";

fn disposition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)filename\*?\s*=\s*([^;]+)").expect("valid filename regex")
    })
}

/// Extract a filename from a `Content-Disposition` value.
///
/// Handles quoted and bare values as well as the RFC 5987 `filename*=`
/// form; the value is percent-decoded when it contains `%`.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = disposition_regex()
        .captures(header)?
        .get(1)?
        .as_str()
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'');

    // filename*=UTF-8''name.fb2
    let raw = match raw.find("''") {
        Some(pos) => &raw[pos + 2..],
        None => raw,
    };

    let name = if raw.contains('%') {
        urlencoding::decode(raw)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw.to_string())
    } else {
        raw.to_string()
    };

    let name = name.trim().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Last non-empty path segment of a URL, ignoring query and fragment
pub fn filename_from_url(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_string(),
    };

    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
}

/// Reduce a server-supplied name to a bare file name.
///
/// Only the final path component is kept and leading dots are removed, so
/// the result can be joined to a directory without escaping it. Returns
/// `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let name = name.replace('\0', "");
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let last = last.trim().trim_start_matches('.').trim();

    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}

/// Resolve a filename: header first, then the URL, then the placeholder.
///
/// Candidates are passed through [`sanitize_filename`]; one that sanitizes
/// to nothing is skipped.
pub fn resolve_filename(content_disposition: Option<&str>, url: &str) -> String {
    content_disposition
        .and_then(filename_from_disposition)
        .and_then(|name| sanitize_filename(&name))
        .or_else(|| filename_from_url(url).and_then(|name| sanitize_filename(&name)))
        .unwrap_or_else(|| PLACEHOLDER_FILENAME.to_string())
}

/// Fetches book files.
///
/// There is no fallback path for downloads, so failures are reported to the
/// caller as an absent result.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Arc<HttpClient>,
}

impl Downloader {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Download a file, returning `None` on any transport or status failure
    pub async fn download(&self, url: &str) -> Option<DownloadedBook> {
        match self.try_download(url).await {
            Ok(book) => {
                tracing::info!("Downloaded: {} ({} bytes)", book.filename, book.size());
                Some(book)
            }
            Err(e) => {
                tracing::error!("Download of {} failed: {}", url, e);
                None
            }
        }
    }

    async fn try_download(&self, url: &str) -> Result<DownloadedBook, SourceError> {
        tracing::info!("Downloading: {}", url);
        let response = self.client.get(url).await?;

        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read file body: {}", e)))?;

        let filename = resolve_filename(disposition.as_deref(), url);
        Ok(DownloadedBook::new(bytes.to_vec(), filename))
    }
}
