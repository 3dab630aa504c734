//! HTTP delivery.
//!
//! `POST /api/export-epub` takes a JSON book record and answers with the EPUB
//! as an attachment. `POST /api/export/:format` does the same for a named
//! format, rejecting formats this crate does not produce.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;

use crate::delivery::Download;
use crate::error::{Error, Result};
use crate::export::ExportFormat;
use crate::packager::Packager;

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body; covers arrive inline as data URLs.
    pub max_body_bytes: usize,
    /// Optional user settings document applied to every export.
    pub settings_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_bytes: 20 * 1024 * 1024,
            settings_path: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: env::var("BINDERY_HOST").unwrap_or(defaults.host),
            port: env::var("BINDERY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            max_body_bytes: env::var("BINDERY_MAX_BODY_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            settings_path: env::var_os("BINDERY_SETTINGS").map(PathBuf::from),
        }
    }

    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Build the export router.
pub fn router(packager: Packager, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/export-epub", post(export_epub))
        .route("/api/export/:format", post(export_format))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(Arc::new(packager))
}

async fn export_epub(State(packager): State<Arc<Packager>>, body: String) -> Result<Download> {
    run_export(packager, body, ExportFormat::Epub).await
}

async fn export_format(
    State(packager): State<Arc<Packager>>,
    Path(format): Path<String>,
    body: String,
) -> Result<Download> {
    let format: ExportFormat = format.parse()?;
    run_export(packager, body, format).await
}

async fn run_export(packager: Arc<Packager>, body: String, format: ExportFormat) -> Result<Download> {
    if let Some(err) = format.unsupported_error() {
        return Err(err);
    }
    tokio::task::spawn_blocking(move || packager.export_json(&body, format))
        .await
        .map_err(|e| Error::Serialization(format!("export task failed: {e}")))?
}

impl IntoResponse for Download {
    fn into_response(self) -> Response {
        let headers = self.headers();
        (headers, self.bytes).into_response()
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Packaging(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::UnsupportedFormat { .. } => StatusCode::NOT_IMPLEMENTED,
            Error::Serialization(msg) => {
                tracing::error!("Serialization error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match &self {
            Error::UnsupportedFormat { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let body = ErrorResponse {
            error: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Packager::new(), 1024 * 1024)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_export_epub_attachment() {
        let response = app()
            .oneshot(post_json(
                "/api/export-epub",
                r#"{"metadata": {"title": "Tom & Jerry"}, "chapters": [{"title": "a", "content": "b"}]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/epub+zip");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"tom_jerry.epub\""
        );
        let length: usize = headers[header::CONTENT_LENGTH].to_str().unwrap().parse().unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert_eq!(bytes.len(), length);
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let response = app()
            .oneshot(post_json("/api/export-epub", r#"{"metadata": {}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_empty_chapters_is_unprocessable() {
        let response = app()
            .oneshot(post_json("/api/export-epub", r#"{"metadata": {"title": "T"}, "chapters": []}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_azw3_not_implemented() {
        let response = app()
            .oneshot(post_json("/api/export/azw3", r#"{"metadata": {"title": "T"}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "unsupported_format");
        assert!(body["message"].as_str().unwrap().contains("Kindle"));
    }

    #[test]
    fn test_default_config_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr().unwrap().port(), 3000);
        assert!(config.settings_path.is_none());
    }
}
