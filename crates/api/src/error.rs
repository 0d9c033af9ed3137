//! Error types for the REST server.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use marketplace::MarketplaceError;
use thiserror::Error;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Marketplace rule or storage failure.
    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),

    /// Malformed request that never reached the marketplace.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Marketplace(err) => match err {
                MarketplaceError::Validation(_) => StatusCode::BAD_REQUEST,
                MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
                MarketplaceError::NotFound { .. } => StatusCode::NOT_FOUND,
                MarketplaceError::Conflict(_) | MarketplaceError::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                MarketplaceError::MissingCounterpart { .. } | MarketplaceError::Database(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
            self.to_string()
        };

        let body = serde_json::json!({
            "success": false,
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `Json` whose rejections use the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `Query` whose rejections use the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
