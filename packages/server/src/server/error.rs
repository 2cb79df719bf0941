use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::common::{AuthError, MarketError};

/// JSON error body returned by every route
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Route-level error: a `MarketError` rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub MarketError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MarketError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketError::Unauthenticated => StatusCode::UNAUTHORIZED,
            MarketError::InvalidState(_) => StatusCode::CONFLICT,
            MarketError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            MarketError::Conflict(_) => StatusCode::CONFLICT,
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match &self.0 {
            MarketError::Validation(_) => "validation",
            MarketError::Forbidden(_) => "forbidden",
            MarketError::Unauthenticated => "unauthenticated",
            MarketError::InvalidState(_) => "invalid_state",
            MarketError::InsufficientFunds { .. } => "insufficient_funds",
            MarketError::Conflict(_) => "conflict",
            MarketError::NotFound(_) => "not_found",
            MarketError::Storage(_) => "internal",
        }
    }
}

impl From<MarketError> for ApiError {
    fn from(error: MarketError) -> Self {
        Self(error)
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            MarketError::Storage(e) => {
                tracing::error!(error = ?e, "Storage failure while handling request");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
