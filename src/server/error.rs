//! Error types and response mapping for the HTTP transport.
//!
//! Every failure leaves the server as a JSON body of the form
//! `{"error": {"type": ..., "message": ...}}` with a mapped status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::tree::TreeError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    #[error("Session limit of {limit} reached")]
    TooManySessions { limit: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Server is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl ServerError {
    /// Map error variant to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::TooManySessions { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ServerError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Tree(err) => match err {
                TreeError::NotBuilt => StatusCode::CONFLICT,
                TreeError::Disposed => StatusCode::GONE,
                TreeError::UnknownNode(_) => StatusCode::NOT_FOUND,
                TreeError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                TreeError::Handler { .. } | TreeError::Widget(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Error type string for JSON responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::SessionNotFound(_) => "session_not_found",
            ServerError::TooManySessions { .. } => "too_many_sessions",
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Timeout { .. } => "timeout",
            ServerError::ShuttingDown => "shutting_down",
            ServerError::Tree(err) => match err {
                TreeError::NotBuilt => "not_built",
                TreeError::Disposed => "session_disposed",
                TreeError::UnknownNode(_) => "unknown_node",
                TreeError::Cancelled => "cancelled",
                TreeError::Handler { .. } => "handler_error",
                TreeError::Widget(_) => "widget_error",
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, error_type = self.error_type(), "request failed");
        }
        let body = serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetId;

    #[test]
    fn test_session_not_found_status_code() {
        let err = ServerError::SessionNotFound("abc".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_type(), "session_not_found");
    }

    #[test]
    fn test_tree_errors_are_mapped() {
        let err = ServerError::from(TreeError::UnknownNode(WidgetId::new("w")));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_type(), "unknown_node");

        let err = ServerError::from(TreeError::Handler {
            widget: WidgetId::new("w"),
            event: "onClick".to_string(),
            source: anyhow::anyhow!("boom"),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_type(), "handler_error");
    }

    #[test]
    fn test_error_response_format() {
        let response = ServerError::Timeout { duration_ms: 50 }.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
