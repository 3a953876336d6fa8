pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::chat::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/resume",
            post(handlers::handle_upload_resume).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/sessions/:id/messages",
            post(handlers::handle_send_message),
        )
        .route("/api/v1/sessions/:id/retry", post(handlers::handle_retry))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::chat::controller::tests::{harness, RESUME, REPLY};
    use crate::chat::prompts::{UPLOAD_CONFIRMATION, UPLOAD_FIRST_REPLY};
    use crate::chat::store::SessionStore;
    use crate::config::tests::test_config;

    const BOUNDARY: &str = "jobs-ai-test-boundary";

    fn app(extracted: Option<&str>, retrieval_failures: usize) -> Router {
        let h = harness(extracted, retrieval_failures, Some(REPLY));
        build_router(AppState {
            controller: Arc::new(h.controller),
            sessions: SessionStore::new(),
            config: test_config(),
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn upload(uri: &str, field: &str, contents: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"resume.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let (status, body) = send(app, post_empty("/api/v1/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_create_session_returns_greeting() {
        let app = app(Some(RESUME), 0);
        let (status, body) = send(&app, post_empty("/api/v1/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["resume_uploaded"], false);
        assert_eq!(body["history"].as_array().unwrap().len(), 1);
        assert_eq!(body["history"][0]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_message_before_upload() {
        let app = app(Some(RESUME), 0);
        let id = create_session(&app).await;

        let (status, body) = send(
            &app,
            post_json(
                &format!("/api/v1/sessions/{id}/messages"),
                serde_json::json!({"message": "I want a backend role"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["content"], UPLOAD_FIRST_REPLY);
        assert_eq!(body["history"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_upload_then_chat() {
        let app = app(Some(RESUME), 0);
        let id = create_session(&app).await;

        let (status, body) = send(
            &app,
            upload(&format!("/api/v1/sessions/{id}/resume"), "resume", b"%PDF-1.7"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "processed");
        assert_eq!(body["resume_text"], RESUME);

        let (status, body) = send(
            &app,
            upload(&format!("/api/v1/sessions/{id}/resume"), "resume", b"%PDF-1.7"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "already_processed");
        assert!(body.get("resume_text").is_none());

        let (status, body) = send(
            &app,
            post_json(
                &format!("/api/v1/sessions/{id}/messages"),
                serde_json::json!({"message": "software engineer"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["content"], REPLY);
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[1]["content"], UPLOAD_CONFIRMATION);
    }

    #[tokio::test]
    async fn test_failed_upload_is_422_and_session_unchanged() {
        let app = app(None, 0);
        let id = create_session(&app).await;

        let (status, body) = send(
            &app,
            upload(&format!("/api/v1/sessions/{id}/resume"), "resume", b"garbage"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Error processing resume"));

        let request = Request::builder()
            .uri(format!("/api/v1/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&app, request).await;
        assert_eq!(body["resume_uploaded"], false);
        assert_eq!(body["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_without_resume_field_is_400() {
        let app = app(Some(RESUME), 0);
        let id = create_session(&app).await;
        let (status, _) = send(
            &app,
            upload(&format!("/api/v1/sessions/{id}/resume"), "avatar", b"%PDF-"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_retrieval_failure_then_retry() {
        let app = app(Some(RESUME), 1);
        let id = create_session(&app).await;
        send(
            &app,
            upload(&format!("/api/v1/sessions/{id}/resume"), "resume", b"%PDF-"),
        )
        .await;

        let (status, body) = send(
            &app,
            post_json(
                &format!("/api/v1/sessions/{id}/messages"),
                serde_json::json!({"message": "software engineer"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Error processing request"));

        let (status, body) = send(&app, post_empty(&format!("/api/v1/sessions/{id}/retry"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["content"], REPLY);
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2]["role"], "user");
    }

    #[tokio::test]
    async fn test_empty_message_is_400() {
        let app = app(Some(RESUME), 0);
        let id = create_session(&app).await;
        let (status, body) = send(
            &app,
            post_json(
                &format!("/api/v1/sessions/{id}/messages"),
                serde_json::json!({"message": "  "}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app(Some(RESUME), 0);
        let (status, _) = send(
            &app,
            post_json(
                &format!("/api/v1/sessions/{}/messages", uuid::Uuid::new_v4()),
                serde_json::json!({"message": "hi"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_end_session() {
        let app = app(Some(RESUME), 0);
        let id = create_session(&app).await;
        let delete = |id: &str| {
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/v1/sessions/{id}"))
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = send(&app, delete(&id)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, delete(&id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_sessions() {
        let app = app(Some(RESUME), 0);
        create_session(&app).await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 1);
    }
}
