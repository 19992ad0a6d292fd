//! Error handling for the bookshelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bookshelf_db::StoreError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Error response format: `error` always, `message` when the failure carries
/// an operation summary in `error` and the underlying cause separately.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("{}", describe_store(.context, .source))]
    Store {
        context: Option<String>,
        source: StoreError,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Wrap a store failure, reporting its text as the `error` field
    pub fn store(source: StoreError) -> Self {
        Self::Store {
            context: None,
            source,
        }
    }

    /// Wrap a store failure under an operation summary such as
    /// `"Failed to create book"`; the cause moves to the `message` field
    pub fn operation(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: Some(context.into()),
            source,
        }
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Store { source, .. } => match source {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_body(self) -> ErrorBody {
        match self {
            AppError::BadRequest { message } => ErrorBody {
                error: message,
                message: None,
            },
            AppError::Store {
                context: Some(context),
                source,
            } => ErrorBody {
                error: context,
                message: Some(source.to_string()),
            },
            AppError::Store {
                context: None,
                source,
            } => ErrorBody {
                error: source.to_string(),
                message: None,
            },
            AppError::Internal(e) => ErrorBody {
                error: e.to_string(),
                message: None,
            },
        }
    }
}

fn describe_store(context: &Option<String>, source: &StoreError) -> String {
    match context {
        Some(context) => format!("{context}: {source}"),
        None => source.to_string(),
    }
}

impl From<StoreError> for AppError {
    fn from(source: StoreError) -> Self {
        Self::store(source)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::now_v7();
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %self,
                "request failed"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %self,
                "request rejected"
            );
        }

        (status, Json(self.into_body())).into_response()
    }
}
