//! Normalization shared by the HTML and feed sources.
//!
//! Every string extracted from either source is untrusted: it goes through
//! [`clean_text`] before it becomes part of a model, results are
//! deduplicated by identifier with [`dedup_by_id`], and ordered with
//! [`sort_case_insensitive`].

use scraper::Html;
use std::collections::HashSet;

/// MIME types with a known short format token
const FORMAT_MAP: &[(&str, &str)] = &[
    ("application/fb2+zip", "fb2"),
    ("application/fb2", "fb2"),
    ("application/epub+zip", "epub"),
    ("application/epub", "epub"),
    ("application/pdf", "pdf"),
    ("application/x-mobipocket-ebook", "mobi"),
];

/// Strip markup, decode entities and collapse whitespace.
///
/// Returns an empty string when nothing readable is left.
pub fn clean_text(raw: &str) -> String {
    if !raw.contains('<') && !raw.contains('&') {
        return collapse_whitespace(raw);
    }

    let fragment = Html::parse_fragment(raw);
    let text: String = fragment.root_element().text().collect();
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Map a MIME type to a lower-case format token.
///
/// Unmapped types fall back to their subtype with any `x-` prefix removed,
/// so `application/x-custom` becomes `custom`.
pub fn format_from_mime(mime_type: &str) -> String {
    let mime_type = mime_type.trim().to_lowercase();
    if let Some((_, format)) = FORMAT_MAP.iter().find(|(mime, _)| *mime == mime_type) {
        return (*format).to_string();
    }

    let subtype = mime_type.rsplit('/').next().unwrap_or(&mime_type);
    let subtype = subtype.split(';').next().unwrap_or(subtype).trim();
    subtype.strip_prefix("x-").unwrap_or(subtype).to_string()
}

/// Remove later items whose id was already seen; the first occurrence wins
pub fn dedup_by_id<T, F>(items: Vec<T>, id: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(id(item).to_string()))
        .collect()
}

/// Stable case-insensitive sort on a string key
pub fn sort_case_insensitive<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by_cached_key(|item| key(item).to_lowercase());
}

/// Resolve an href from the catalog against the base URL.
///
/// Absolute URLs are returned unchanged; anything else is joined to `base`.
pub fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            href.trim_start_matches('/')
        ),
    }
}
