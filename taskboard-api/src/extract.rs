/// Request extractors whose rejections use the API error envelope
///
/// Axum's own `Json` extractor rejects with a plain-text body. Handlers
/// take [`AppJson`] instead so a malformed body gets the same
/// `{"error", "message", "details"}` shape as every other failure:
///
/// | Rejection | Status |
/// |---|---|
/// | body does not match the request type | 422 |
/// | invalid JSON syntax, missing content type | 400 |

use crate::error::ApiError;
use axum::extract::{rejection::JsonRejection, FromRequest};

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => ApiError::invalid_field("body", err.body_text()),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        routing::post,
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    async fn echo(AppJson(body): AppJson<Named>) -> String {
        body.name
    }

    async fn send(content_type: Option<&str>, body: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route("/", post(echo));
        let mut request = Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }

        let response = app
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_accepts_valid_body() {
        let (status, _) = send(Some("application/json"), r#"{"name":"Backlog"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_field_is_validation_envelope() {
        let (status, json) = send(Some("application/json"), "{}").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["details"][0]["field"], "body");
        assert!(json["details"][0]["message"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_syntax_error_is_bad_request_envelope() {
        let (status, json) = send(Some("application/json"), "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request_envelope() {
        let (status, json) = send(None, r#"{"name":"x"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad_request");
        assert!(json["message"].as_str().unwrap().contains("Content-Type"));
    }
}
