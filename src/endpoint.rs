//! HTTP surface of the report log.

use super::upgrade_log::{IncomingReport, UpgradeLog};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use chrono::Local;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum EndpointError {
    /// The body is not JSON or lacks a required field.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The entry could not be appended. It is lost.
    #[error("log write failed: {0}")]
    LogWrite(String),
}

impl EndpointError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::LogWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        // Bodies stay generic; details go to the server log only.
        let body = match &self {
            Self::InvalidPayload(_) => "Invalid payload",
            Self::LogWrite(_) => "Internal server error",
        };
        (self.status_code(), body).into_response()
    }
}

#[derive(Clone)]
struct EndpointState {
    log: Arc<UpgradeLog>,
}

/// Router with the report endpoint mounted at `path`.
///
/// Only POST is routed; axum answers every other method on `path` with
/// 405 Method Not Allowed.
pub fn router(path: &str, log: UpgradeLog) -> Router {
    let state = EndpointState { log: Arc::new(log) };
    Router::new()
        .route(path, post(ingest))
        .with_state(state)
}

async fn ingest(
    State(state): State<EndpointState>,
    body: Bytes,
) -> Result<StatusCode, EndpointError> {
    let report: IncomingReport = serde_json::from_slice(&body).map_err(|e| {
        info!(error = %e, "rejected diagnostic report");
        EndpointError::InvalidPayload(e.to_string())
    })?;

    let entry = report.to_log_entry(Local::now());
    let log = Arc::clone(&state.log);
    tokio::task::spawn_blocking(move || log.append(&entry))
        .await
        .map_err(|e| EndpointError::LogWrite(e.to_string()))?
        .map_err(|e| {
            error!(error = %e, "failed to append diagnostic report");
            EndpointError::LogWrite(e.to_string())
        })?;

    info!(
        device = report.device_type.as_deref().unwrap_or("unknown"),
        reasons = report.unsupported_reasons.len(),
        "diagnostic report logged"
    );
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn request(method: Method, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/upgrade-log")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const VALID: &str = r#"{"userAgent":"UA","timestamp":"2026-10-19T09:00:00.000Z","url":"https://example.com/","deviceType":"mobile","unsupportedReasons":["缺少fetch API"]}"#;

    #[tokio::test]
    async fn valid_post_is_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upgrade.log");
        let app = router("/upgrade-log", UpgradeLog::new(&path));

        let response = app.oneshot(request(Method::POST, VALID)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("设备类型: mobile\n"));
        assert!(content.contains("- 缺少fetch API\n"));
    }

    #[tokio::test]
    async fn other_methods_are_not_allowed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upgrade.log");
        let app = router("/upgrade-log", UpgradeLog::new(&path));

        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let response = app
                .clone()
                .oneshot(request(method, VALID))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn malformed_bodies_are_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upgrade.log");
        let app = router("/upgrade-log", UpgradeLog::new(&path));

        for body in [
            "",
            "not json",
            "{}",
            r#"{"userAgent":"UA","timestamp":"t","url":"u","deviceType":"pc"}"#,
        ] {
            let response = app
                .clone()
                .oneshot(request(Method::POST, body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unwritable_log_is_a_server_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the open fail.
        let app = router("/upgrade-log", UpgradeLog::new(dir.path()));
        let response = app.oneshot(request(Method::POST, VALID)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
