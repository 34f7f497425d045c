//! Local upstreams for relay tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{
        header::{CONTENT_TYPE, LOCATION},
        HeaderMap, StatusCode,
    },
    routing::post,
    Router,
};
use reqwest::Client;
use tokio::net::TcpListener;
use url::Url;

use super::forwarder::build_client;

/// A running upstream that echoes JSON bodies with a fixed status.
pub struct Upstream {
    pub url: Url,
    pub hits: Arc<AtomicUsize>,
}

/// Start an upstream on an ephemeral port.
///
/// Requests without a JSON content type get 415 so tests notice a missing header.
pub async fn spawn_upstream(status: StatusCode) -> Upstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new().route(
        "/hook",
        post(move |headers: HeaderMap, body: Bytes| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let is_json = headers
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.starts_with("application/json"))
                    .unwrap_or(false);
                let status = if is_json {
                    status
                } else {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                };
                (status, [(CONTENT_TYPE, "application/json")], body)
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream {
        url: Url::parse(&format!("http://{}/hook", addr)).unwrap(),
        hits,
    }
}

/// A URL on a port nothing listens on.
pub async fn refused_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{}/hook", addr)).unwrap()
}

/// Start an upstream that answers every POST with `302 Found` to `location`.
pub async fn spawn_redirect(location: Url) -> Upstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let location = location.to_string();

    let app = Router::new().route(
        "/hook",
        post(move || {
            let counter = counter.clone();
            let location = location.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::FOUND, [(LOCATION, location)])
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream {
        url: Url::parse(&format!("http://{}/hook", addr)).unwrap(),
        hits,
    }
}

/// Relay client as built at startup, with a short timeout.
pub fn test_client() -> Client {
    build_client(Duration::from_secs(5)).unwrap()
}
