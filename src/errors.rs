// src/errors.rs
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("M-Pesa auth failed: {0}")]
    UpstreamAuth(String),

    /// `body` holds whatever the gateway sent back, when it sent anything.
    #[error("M-Pesa transaction failed: {message}")]
    UpstreamTransaction { message: String, body: Option<Value> },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("HTTP client error: {0}")]
    HttpClientError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamAuth(_)
            | AppError::UpstreamTransaction { .. }
            | AppError::ConfigurationError(_)
            | AppError::HttpClientError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Detail surfaced to the client. Gateway bodies are passed through as-is so
    /// the caller sees exactly what the gateway rejected.
    pub fn client_message(&self) -> Value {
        match self {
            AppError::UpstreamTransaction {
                body: Some(body), ..
            } => body.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.client_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

// Helper conversion functions
impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn upstream_auth(msg: impl Into<String>) -> Self {
        AppError::UpstreamAuth(msg.into())
    }

    pub fn upstream_transaction(msg: impl Into<String>, body: Option<Value>) -> Self {
        AppError::UpstreamTransaction {
            message: msg.into(),
            body,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }

    pub fn http_client(msg: impl Into<String>) -> Self {
        AppError::HttpClientError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
