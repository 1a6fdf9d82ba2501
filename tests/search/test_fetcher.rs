// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::body::Body;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use web_research_node::search::{ContentFetchConfig, HttpFetcher, PageFetcher};
use web_research_node::ResearchError;

const PAGE: &str = "<html><head><title>Local</title></head><body><p>Served locally.</p></body></html>";

async fn start_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/page",
            get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], PAGE) }),
        )
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/unavailable", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route(
            "/loop/:n",
            get(|Path(n): Path<u32>| async move { Redirect::temporary(&format!("/loop/{}", n + 1)) }),
        )
        .route(
            "/hop/:n",
            get(|Path(n): Path<u32>| async move {
                if n == 0 {
                    Redirect::temporary("/page")
                } else {
                    Redirect::temporary(&format!("/hop/{}", n - 1))
                }
            }),
        )
        .route("/big", get(|| async { "x".repeat(10_000) }))
        .route(
            "/stream",
            get(|| async {
                let chunks = futures::stream::iter(
                    (0..20).map(|_| Ok::<_, std::io::Error>(vec![b'a'; 500])),
                );
                Body::from_stream(chunks).into_response()
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                PAGE
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fetcher() -> HttpFetcher {
    let config = ContentFetchConfig {
        allow_private_hosts: true,
        ..Default::default()
    };
    HttpFetcher::new(&config).unwrap()
}

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_fetch_page() {
    let addr = start_server().await;
    let page = fetcher()
        .fetch(&format!("http://{}/page", addr), TIMEOUT, 1 << 20)
        .await
        .unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.body, PAGE.as_bytes());
    assert!(page.content_type.unwrap().starts_with("text/html"));
}

#[tokio::test]
async fn test_status_mapping() {
    let addr = start_server().await;
    let fetcher = fetcher();

    let missing = fetcher
        .fetch(&format!("http://{}/missing", addr), TIMEOUT, 1 << 20)
        .await;
    assert_eq!(missing.unwrap_err(), ResearchError::HttpError { status: 404 });

    let unavailable = fetcher
        .fetch(&format!("http://{}/unavailable", addr), TIMEOUT, 1 << 20)
        .await
        .unwrap_err();
    assert_eq!(unavailable, ResearchError::HttpError { status: 503 });
    assert!(unavailable.is_transient());
}

#[tokio::test]
async fn test_redirects_followed_within_cap() {
    let addr = start_server().await;
    let page = fetcher()
        .fetch(&format!("http://{}/hop/3", addr), TIMEOUT, 1 << 20)
        .await
        .unwrap();
    assert!(page.url.ends_with("/page"));
}

#[tokio::test]
async fn test_redirect_loop_is_connection_error() {
    let addr = start_server().await;
    let result = fetcher()
        .fetch(&format!("http://{}/loop/0", addr), TIMEOUT, 1 << 20)
        .await;
    assert!(matches!(result, Err(ResearchError::ConnectionError(_))));
}

#[tokio::test]
async fn test_declared_length_over_limit() {
    let addr = start_server().await;
    let result = fetcher()
        .fetch(&format!("http://{}/big", addr), TIMEOUT, 1_000)
        .await;
    assert_eq!(result.unwrap_err(), ResearchError::TooLarge { limit_bytes: 1_000 });
}

#[tokio::test]
async fn test_streamed_body_over_limit() {
    let addr = start_server().await;
    let result = fetcher()
        .fetch(&format!("http://{}/stream", addr), TIMEOUT, 2_000)
        .await;
    assert_eq!(result.unwrap_err(), ResearchError::TooLarge { limit_bytes: 2_000 });

    let whole = fetcher()
        .fetch(&format!("http://{}/stream", addr), TIMEOUT, 1 << 20)
        .await
        .unwrap();
    assert_eq!(whole.body.len(), 10_000);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let addr = start_server().await;
    let result = fetcher()
        .fetch(&format!("http://{}/slow", addr), Duration::from_millis(200), 1 << 20)
        .await;
    assert_eq!(result.unwrap_err(), ResearchError::Timeout { timeout_ms: 200 });
}

#[tokio::test]
async fn test_private_host_refused_by_default() {
    let addr = start_server().await;
    let fetcher = HttpFetcher::new(&ContentFetchConfig::default()).unwrap();
    let result = fetcher
        .fetch(&format!("http://{}/page", addr), TIMEOUT, 1 << 20)
        .await;
    assert!(matches!(result, Err(ResearchError::InvalidInput(_))));
}
