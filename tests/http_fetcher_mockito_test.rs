//! `HttpFetcher` integration tests against a faked HTTP server (`mockito`),
//! exercising the real `reqwest` request path instead of a stub `Fetcher`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use sitetree_crawler::config::{FetchOptions, RedirectPolicy};
use sitetree_crawler::{Fetcher, HttpFetcher};

#[tokio::test]
async fn fetches_html_body_and_lowercases_header_names() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/page")
        .with_status(200)
        .with_header("Content-Type", "text/html; charset=utf-8")
        .with_header("X-Frame-Options", "DENY")
        .with_body("<html><head><title>Mocked</title></head><body>hi</body></html>")
        .create_async()
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let url = Url::parse(&format!("{}/page", server.url())).unwrap();
    let opts = FetchOptions::default();
    let cancel = CancellationToken::new();

    let page = fetcher.fetch(&url, &opts, Duration::from_secs(5), &cancel).await.unwrap();

    assert!(page.html.contains("Mocked"));
    assert_eq!(page.headers.get("x-frame-options").map(String::as_str), Some("DENY"));
}

#[tokio::test]
async fn non_html_content_type_is_surfaced_as_unsupported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/data.json")
        .with_status(200)
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let url = Url::parse(&format!("{}/data.json", server.url())).unwrap();
    let opts = FetchOptions::default();
    let cancel = CancellationToken::new();

    let result = fetcher.fetch(&url, &opts, Duration::from_secs(5), &cancel).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn http_5xx_status_is_surfaced_as_scrape_failed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server.mock("GET", "/broken").with_status(503).create_async().await;

    let fetcher = HttpFetcher::new().unwrap();
    let url = Url::parse(&format!("{}/broken", server.url())).unwrap();
    let opts = FetchOptions { redirect: RedirectPolicy::Follow, ..FetchOptions::default() };
    let cancel = CancellationToken::new();

    let result = fetcher.fetch(&url, &opts, Duration::from_secs(5), &cancel).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn follow_policy_resolves_redirect_to_final_page() {
    let mut server = mockito::Server::new_async().await;
    let _redirect = server
        .mock("GET", "/old")
        .with_status(302)
        .with_header("Location", "/new")
        .create_async()
        .await;
    let _target = server
        .mock("GET", "/new")
        .with_status(200)
        .with_header("Content-Type", "text/html")
        .with_body("<html><body>landed</body></html>")
        .create_async()
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let url = Url::parse(&format!("{}/old", server.url())).unwrap();
    let opts = FetchOptions { redirect: RedirectPolicy::Follow, ..FetchOptions::default() };
    let cancel = CancellationToken::new();

    let page = fetcher.fetch(&url, &opts, Duration::from_secs(5), &cancel).await.unwrap();
    assert!(page.html.contains("landed"));
    assert!(page.final_url.as_str().ends_with("/new"));
}

#[tokio::test]
async fn error_policy_fails_on_redirect_instead_of_following() {
    let mut server = mockito::Server::new_async().await;
    let _redirect = server
        .mock("GET", "/old")
        .with_status(302)
        .with_header("Location", "/new")
        .create_async()
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let url = Url::parse(&format!("{}/old", server.url())).unwrap();
    let opts = FetchOptions { redirect: RedirectPolicy::Error, ..FetchOptions::default() };
    let cancel = CancellationToken::new();

    let result = fetcher.fetch(&url, &opts, Duration::from_secs(5), &cancel).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn manual_policy_surfaces_raw_redirect_without_following() {
    let mut server = mockito::Server::new_async().await;
    let _redirect = server
        .mock("GET", "/old")
        .with_status(302)
        .with_header("Location", "/new")
        .create_async()
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let url = Url::parse(&format!("{}/old", server.url())).unwrap();
    let opts = FetchOptions { redirect: RedirectPolicy::Manual, ..FetchOptions::default() };
    let cancel = CancellationToken::new();

    let page = fetcher.fetch(&url, &opts, Duration::from_secs(5), &cancel).await.unwrap();
    assert_eq!(page.headers.get("location").map(String::as_str), Some("/new"));
    assert!(page.final_url.as_str().ends_with("/old"));
}
