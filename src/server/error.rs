//! HTTP-facing error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::relay::{
    error::ValidationError,
    ports::{AuthError, StoreError},
};

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller could not be authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(AuthError),

    /// The message was rejected before reaching the bus.
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    /// The store could not serve the request.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// Metrics could not be rendered.
    #[error("metrics unavailable: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err)
    }
}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(AuthError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Store(_) | Self::Metrics(_) => {
                tracing::error!(error = %self, "request failed");
            }
            Self::Unauthorized(_) | Self::Rejected(_) => {
                tracing::debug!(error = %self, "request rejected");
            }
        }
        let message = match &self {
            Self::Unauthorized(AuthError::Unavailable(_)) => "authentication unavailable".to_owned(),
            Self::Unauthorized(_) => "unauthorized".to_owned(),
            Self::Rejected(err) => err.to_string(),
            Self::Store(_) => "fetch failed".to_owned(),
            Self::Metrics(_) => "metrics unavailable".to_owned(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
