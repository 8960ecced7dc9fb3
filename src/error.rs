use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure talking to an external collaborator (extraction or translation service).
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Worth retrying: connection failures, timeouts, 408/429 and 5xx responses.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    #[error("upstream failure: {0}")]
    Permanent(String),
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, UpstreamError::Transient(_))
    }

    /// Classify an HTTP status returned by an upstream service.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("{} {}", status, body.trim());
        if status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
        {
            UpstreamError::Transient(message)
        } else {
            UpstreamError::Permanent(message)
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            UpstreamError::Transient(err.to_string())
        } else if let Some(status) = err.status() {
            UpstreamError::from_status(status, "")
        } else {
            UpstreamError::Permanent(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Empty(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: UpstreamError,
    },
}

impl AppError {
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn upstream(context: impl Into<String>, source: UpstreamError) -> Self {
        AppError::Upstream {
            context: context.into(),
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::Empty(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage { .. } | AppError::Upstream { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status();
        let (error, details) = match &self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Empty(msg)
            | AppError::PayloadTooLarge(msg) => (msg.clone(), None),
            AppError::Storage { context, source } => {
                tracing::error!(error = %source, "{}", context);
                (context.clone(), Some(source.to_string()))
            }
            AppError::Upstream { context, source } => {
                tracing::error!(error = %source, "{}", context);
                (context.clone(), Some(source.to_string()))
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
