use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quotedesk_core::Error as CoreError;
use quotedesk_market_data::MarketDataError;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} {}", status, self);
        } else {
            tracing::debug!("{} {}", status, self);
        }
        let body = Json(json!({ "success": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::StockNotFound(_) => ApiError::NotFound(err.to_string()),
            CoreError::StockAlreadyExists(_) => ApiError::Conflict(err.to_string()),
            CoreError::Validation(_) => ApiError::BadRequest(err.to_string()),
            CoreError::QuoteFetch(ref e) if matches!(e.cause, MarketDataError::InvalidRequest(_)) => {
                ApiError::BadRequest(err.to_string())
            }
            CoreError::QuoteFetch(_) => ApiError::BadGateway(err.to_string()),
            CoreError::Repository(_) => ApiError::Internal(err.to_string()),
        }
    }
}
