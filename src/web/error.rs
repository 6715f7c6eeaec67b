use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::storage::DatabaseError;

/// Failures surfaced by the HTTP handlers
#[derive(Debug, Error)]
pub enum WebError {
    /// Reading from the article store failed
    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),

    /// Serializing the derived feed failed
    #[error("Render error: {0:#}")]
    Render(anyhow::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        let message = match &self {
            WebError::Store(_) => "Article store unavailable",
            WebError::Render(_) => "Failed to render feed",
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}
