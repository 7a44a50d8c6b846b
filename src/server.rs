//! HTTP Server
//!
//! Read-only endpoints serving the merged feed in each output format, plus a
//! small status page and a health probe. Every handler works from an atomic
//! snapshot of the cache, so a concurrent refresh never changes a response
//! mid-render.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::merge::CacheStore;
use crate::render::{self, FeedMeta, RenderError};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: CacheStore,
    pub meta: FeedMeta,
}

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/rss.xml", get(rss_feed))
        .route("/atom.xml", get(atom_feed))
        .route("/feed.json", get(json_feed))
        .route("/health", get(health))
        .with_state(state)
}

async fn status(State(state): State<AppState>) -> Response {
    let cache = state.store.snapshot().await;
    let body = format!(
        "{}\n\n{} items, last build {}\n\nFeeds:\n  /rss.xml   RSS 2.0\n  /atom.xml  Atom 1.0\n  /feed.json JSON Feed 1.1\n",
        state.meta.title,
        cache.items.len(),
        cache.last_build.to_rfc2822(),
    );
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn rss_feed(State(state): State<AppState>) -> Response {
    let cache = state.store.snapshot().await;
    feed_response(
        render::rss(&state.meta, &cache),
        "application/rss+xml; charset=utf-8",
    )
}

async fn atom_feed(State(state): State<AppState>) -> Response {
    let cache = state.store.snapshot().await;
    feed_response(
        render::atom(&state.meta, &cache),
        "application/atom+xml; charset=utf-8",
    )
}

async fn json_feed(State(state): State<AppState>) -> Response {
    let cache = state.store.snapshot().await;
    feed_response(
        render::json(&state.meta, &cache),
        "application/feed+json; charset=utf-8",
    )
}

async fn health(State(state): State<AppState>) -> Response {
    let cache = state.store.snapshot().await;
    Json(json!({
        "ok": true,
        "items": cache.items.len(),
        "last_build": cache.last_build.to_rfc3339(),
    }))
    .into_response()
}

fn feed_response(result: Result<String, RenderError>, content_type: &'static str) -> Response {
    match result {
        Ok(body) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(error) => {
            tracing::error!("failed to render feed: {error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::Cache;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use tower::util::ServiceExt;

    fn empty_state() -> AppState {
        AppState {
            store: CacheStore::new(),
            meta: FeedMeta {
                title: "Planet Test".to_string(),
                site_url: "https://planet.example.com".to_string(),
                description: "Merged test feed".to_string(),
            },
        }
    }

    fn sample_item() -> crate::feed::Item {
        crate::feed::Item {
            title: "A Post".to_string(),
            link: "https://example.com/a".to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            description: "<p>Hello</p>".to_string(),
            author_name: String::new(),
            image_url: None,
            video: None,
            enclosure: None,
            source: "https://src.example.com/rss".to_string(),
        }
    }

    async fn get_path(state: AppState, path: &str) -> (StatusCode, String, String) {
        let router = create_router(state);
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn seeded_state() -> AppState {
        let state = empty_state();
        state
            .store
            .replace(Cache {
                items: vec![sample_item()],
                last_build: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            })
            .await;
        state
    }

    #[tokio::test]
    async fn test_rss_endpoint() {
        let (status, content_type, body) = get_path(seeded_state().await, "/rss.xml").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/rss+xml; charset=utf-8");
        assert!(body.contains("<rss version=\"2.0\""));
        assert!(body.contains("https://example.com/a"));
    }

    #[tokio::test]
    async fn test_atom_endpoint() {
        let (status, content_type, body) = get_path(seeded_state().await, "/atom.xml").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/atom+xml; charset=utf-8");
        assert!(body.contains("http://www.w3.org/2005/Atom"));
    }

    #[tokio::test]
    async fn test_json_endpoint() {
        let (status, content_type, body) = get_path(seeded_state().await, "/feed.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/feed+json; charset=utf-8");
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["version"], "https://jsonfeed.org/version/1.1");
    }

    #[tokio::test]
    async fn test_status_page() {
        let (status, content_type, body) = get_path(seeded_state().await, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("Planet Test"));
        assert!(body.contains("1 items"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, _, body) = get_path(seeded_state().await, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["ok"], true);
        assert_eq!(parsed["items"], 1);
    }

    #[tokio::test]
    async fn test_endpoints_serve_empty_cache() {
        for path in ["/rss.xml", "/atom.xml", "/feed.json", "/", "/health"] {
            let (status, _, _) = get_path(empty_state(), path).await;
            assert_eq!(status, StatusCode::OK, "path {path}");
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let (status, _, _) = get_path(empty_state(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
