//! Error types for the mirror service's HTTP layer.
//!
//! [`ApiError`] converts into an Axum response with a JSON body of the form
//! `{"error": "...", "status": 404}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use streamcrud_core::{LookupError, NotFoundReason};

/// Errors returned by the REST handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The item did not appear in the mirror.
    #[error("item {id} not found ({reason:?})")]
    NotFound {
        /// The requested id as it appeared in the route.
        id: String,
        /// Why the lookup gave up.
        reason: NotFoundReason,
    },

    /// The route did not carry a usable id.
    #[error("invalid id: {0}")]
    InvalidId(#[from] LookupError),

    /// A request body did not match the route.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidId(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
