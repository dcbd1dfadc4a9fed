//! Integration tests for flibusta-fetch
//!
//! These tests run the full catalog client against a local mock HTTP server.

use flibusta_fetch::sources::StatusUpdate;
use flibusta_fetch::{Catalog, Config, SourceKind};
use mockito::{Matcher, Server, ServerGuard};
use tokio::sync::mpsc;

const SEARCH_PAGE: &str = r#"<html><body>
<h3>Найденные книги (3):</h3>
<ul>
<li><a href="/b/3">Zebra</a> - <a href="/a/30">Автор Три</a></li>
<li><a href="/b/1">apple</a> - <a href="/a/10">Автор Один</a></li>
<li><a href="/b/2">Mango</a> - <a href="/a/20">Автор Два</a></li>
</ul>
</body></html>"#;

const EMPTY_PAGE: &str = r#"<html><body><p>Ничего не найдено</p></body></html>"#;

const FEED_TWO_BOOKS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:dc="http://purl.org/dc/terms/">
  <title>Поиск книг</title>
  <entry>
    <title>Понедельник начинается в субботу</title>
    <author><name>Аркадий Стругацкий</name><uri>/a/2345</uri></author>
    <link href="/b/501/fb2" rel="http://opds-spec.org/acquisition/open-access" type="application/fb2+zip"/>
  </entry>
  <entry>
    <title>Жук в муравейнике</title>
    <author><name>Борис Стругацкий</name><uri>/a/2346</uri></author>
    <link href="/b/502/epub" rel="http://opds-spec.org/acquisition/open-access" type="application/epub+zip"/>
  </entry>
</feed>"#;

fn catalog(server: &ServerGuard) -> Catalog {
    Catalog::new(&Config::with_base_url(server.url())).expect("catalog client")
}

fn book_search_query(query: &str, page: u32) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("ask".to_string(), query.to_string()),
        Matcher::UrlEncoded("page".to_string(), page.to_string()),
    ])
}

#[tokio::test]
async fn test_html_hit_never_queries_feed() {
    let mut server = Server::new_async().await;

    let html_mock = server
        .mock("GET", "/booksearch")
        .match_query(book_search_query("стругацкие", 0))
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(SEARCH_PAGE)
        .expect(1)
        .create_async()
        .await;

    let feed_mock = server
        .mock("GET", Matcher::Regex("^/opds".to_string()))
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = catalog(&server)
        .search_books("стругацкие", 0, None)
        .await
        .expect("search result");

    assert_eq!(result.source, SourceKind::Html);
    let titles: Vec<&str> = result.items.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["apple", "Mango", "Zebra"]);
    assert_eq!(
        result.items[0].download_links[0].url,
        format!("{}/b/1/fb2", server.url())
    );

    html_mock.assert_async().await;
    feed_mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_html_falls_back_to_feed() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/booksearch")
        .match_query(book_search_query("жук", 0))
        .with_status(200)
        .with_body(EMPTY_PAGE)
        .create_async()
        .await;

    let feed_mock = server
        .mock("GET", "/opds/opensearch")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("searchTerm".to_string(), "жук".to_string()),
            Matcher::UrlEncoded("searchType".to_string(), "books".to_string()),
            Matcher::UrlEncoded("pageNumber".to_string(), "0".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/atom+xml")
        .with_body(FEED_TWO_BOOKS)
        .expect(1)
        .create_async()
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = catalog(&server)
        .search_books("жук", 0, Some(&tx))
        .await
        .expect("search result");

    assert_eq!(result.source, SourceKind::Feed);
    assert_eq!(result.len(), 2);
    assert_eq!(result.items[0].title, "Жук в муравейнике");
    assert_eq!(result.items[0].formats(), vec!["epub"]);
    assert_eq!(
        result.items[1].download_links[0].url,
        format!("{}/b/501/fb2", server.url())
    );
    assert!(!result.has_more);

    assert!(matches!(
        rx.try_recv(),
        Ok(StatusUpdate::FallingBack {
            from: SourceKind::Html,
            to: SourceKind::Feed
        })
    ));

    feed_mock.assert_async().await;
}

#[tokio::test]
async fn test_html_server_error_falls_back_to_empty_feed() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/booksearch")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    server
        .mock("GET", "/opds/opensearch")
        .match_query(Matcher::UrlEncoded(
            "searchType".to_string(),
            "authors".to_string(),
        ))
        .with_status(200)
        .with_body(r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>Пусто</title></feed>"#)
        .create_async()
        .await;

    let result = catalog(&server)
        .search_authors("никто", 0, None)
        .await
        .expect("empty feed result is still a result");

    assert_eq!(result.source, SourceKind::Feed);
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_both_sources_failing_is_absent() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/booksearch")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    server
        .mock("GET", "/opds/opensearch")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html><body>maintenance</body></html>")
        .create_async()
        .await;

    let result = catalog(&server).search_books("что угодно", 0, None).await;
    assert!(result.is_none());
}

#[tokio::test]
async fn test_author_search_reads_writers_section() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/booksearch")
        .match_query(Matcher::UrlEncoded("ask".to_string(), "толстой".to_string()))
        .with_status(200)
        .with_body(
            r#"<h3>Найденные писатели (2):</h3>
<ul>
<li><a href="/a/5678">Толстой Лев Николаевич</a></li>
<li><a href="/a/1111">Толстой Алексей Николаевич</a></li>
</ul>"#,
        )
        .create_async()
        .await;

    let result = catalog(&server)
        .search_authors("толстой", 0, None)
        .await
        .expect("author result");

    assert_eq!(result.source, SourceKind::Html);
    let ids: Vec<&str> = result.items.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["1111", "5678"]);
}

#[tokio::test]
async fn test_author_books_retry_plain_author_page() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/a/42/alphabet")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let author_page = server
        .mock("GET", "/a/42")
        .with_status(200)
        .with_body(
            r#"<h1>Автор</h1>
<a href="/b/77">Пикник на обочине</a> <a href="/b/77/read">читать</a> <a href="/b/77/fb2">fb2</a>
<a href="/b/78">Град обреченный</a> <a href="/b/78/epub">epub</a>"#,
        )
        .expect(1)
        .create_async()
        .await;

    let feed_mock = server
        .mock("GET", Matcher::Regex("^/opds".to_string()))
        .expect(0)
        .create_async()
        .await;

    let result = catalog(&server)
        .author_books("42", 0, None)
        .await
        .expect("author books");

    assert_eq!(result.source, SourceKind::Html);
    let titles: Vec<&str> = result.items.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Град обреченный", "Пикник на обочине"]);
    assert!(!result.has_more);

    author_page.assert_async().await;
    feed_mock.assert_async().await;
}

#[tokio::test]
async fn test_blank_query_makes_no_requests() {
    let mut server = Server::new_async().await;

    let any_request = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = catalog(&server).search_books("   ", 0, None).await;
    assert!(result.is_none());

    any_request.assert_async().await;
}

#[tokio::test]
async fn test_author_books_follow_feed_alphabet_link() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", Matcher::Regex(r"^/a/42".to_string()))
        .with_status(404)
        .create_async()
        .await;

    server
        .mock("GET", "/opds/author/42")
        .with_status(200)
        .with_body(
            r#"<feed xmlns="http://www.w3.org/2005/Atom">
<entry><title>Книги автора по сериям</title><link href="/opds/authorsequences/42"/></entry>
<entry><title>Книги автора по алфавиту</title><link href="/opds/author/42/alphabet"/></entry>
</feed>"#,
        )
        .create_async()
        .await;

    let alphabet_mock = server
        .mock("GET", "/opds/author/42/alphabet")
        .with_status(200)
        .with_body(FEED_TWO_BOOKS)
        .expect(1)
        .create_async()
        .await;

    let result = catalog(&server)
        .author_books("42", 0, None)
        .await
        .expect("author books");

    assert_eq!(result.source, SourceKind::Feed);
    assert_eq!(result.len(), 2);
    alphabet_mock.assert_async().await;
}

#[tokio::test]
async fn test_download_uses_content_disposition() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/b/123/fb2")
        .with_status(200)
        .with_header("content-disposition", r#"attachment; filename="book%20one.fb2""#)
        .with_body(b"<FictionBook/>".to_vec())
        .create_async()
        .await;

    let url = format!("{}/b/123/fb2", server.url());
    let book = catalog(&server).download(&url).await.expect("downloaded");

    assert_eq!(book.filename, "book one.fb2");
    assert_eq!(book.bytes, b"<FictionBook/>".to_vec());
    assert_eq!(book.filename_for("Война и мир", "fb2"), "book one.fb2");
}

#[tokio::test]
async fn test_download_keeps_file_name_inside_output_dir() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/b/124/fb2")
        .with_status(200)
        .with_header("content-disposition", r#"attachment; filename="../../evil.fb2""#)
        .with_body("<FictionBook/>")
        .create_async()
        .await;

    let url = format!("{}/b/124/fb2", server.url());
    let book = catalog(&server).download(&url).await.expect("downloaded");

    assert_eq!(book.filename, "evil.fb2");
}

#[tokio::test]
async fn test_download_names_file_from_url() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/b/123/epub")
        .with_status(200)
        .with_body("PK")
        .create_async()
        .await;

    let url = format!("{}/b/123/epub", server.url());
    let book = catalog(&server).download(&url).await.expect("downloaded");

    assert_eq!(book.filename, "epub");
    assert_eq!(book.filename_for("Война и мир", "epub"), "Война и мир.epub");
}

#[tokio::test]
async fn test_download_failure_is_absent() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/b/999/fb2")
        .with_status(404)
        .create_async()
        .await;

    let url = format!("{}/b/999/fb2", server.url());
    assert!(catalog(&server).download(&url).await.is_none());
}

#[tokio::test]
async fn test_check_connection_prefers_html_root() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/")
        .with_status(200)
        .with_body("<html></html>")
        .create_async()
        .await;

    let report = catalog(&server).check_connection().await;
    assert_eq!(report.reachable, Some(SourceKind::Html));
}

#[tokio::test]
async fn test_check_connection_falls_back_to_feed_root() {
    let mut server = Server::new_async().await;

    server.mock("GET", "/").with_status(502).create_async().await;
    server
        .mock("GET", "/opds")
        .with_status(200)
        .with_body(r#"<feed xmlns="http://www.w3.org/2005/Atom"/>"#)
        .create_async()
        .await;

    let report = catalog(&server).check_connection().await;
    assert_eq!(report.reachable, Some(SourceKind::Feed));
    assert!(report.is_connected());
}
