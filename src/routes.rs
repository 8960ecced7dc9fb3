use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;
use crate::translate::TRANSLATIONS_URL_PREFIX;

pub fn create_routes(state: &AppState) -> Router<AppState> {
    let upload_config = &state.config.upload;

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // REST API routes
        .route("/upload", post(handlers::upload_files))
        .route("/translate", post(handlers::translate_session))

        // Downloads
        .nest_service(
            &format!("/{}", upload_config.url_prefix()),
            ServeDir::new(upload_config.root_path()),
        )
        .nest_service(
            &format!("/{}", TRANSLATIONS_URL_PREFIX),
            ServeDir::new(&state.config.translation.output_directory),
        )
}

/// Full application router with request limits, tracing and CORS applied.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let body_limit = state.config.upload.max_request_bytes;

    Router::new()
        .merge(create_routes(&state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extraction::UnstructuredClient;
    use crate::session::SessionStore;
    use crate::translate::PlaceholderTranslator;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_router() -> (Router, String) {
        let root = format!("target/test-routes-{}", uuid::Uuid::new_v4());
        let mut config = Config::default();
        config.upload.root_directory = root.clone();
        let sessions = SessionStore::open(&root, false).await.unwrap();
        let loader = Arc::new(UnstructuredClient::new(&config.extraction).unwrap());
        let state = AppState::with_parts(config, sessions, loader, Arc::new(PlaceholderTranslator));
        (build_router(state), root)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, root) = test_router().await;
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn translate_rejects_malformed_json() {
        let (router, root) = test_router().await;
        let response = router
            .oneshot(
                Request::post("/translate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn upload_without_multipart_is_bad_request() {
        let (router, root) = test_router().await;
        let response = router
            .oneshot(
                Request::post("/upload")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let _ = tokio::fs::remove_dir_all(root).await;
    }
}
