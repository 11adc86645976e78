use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use forms::{
    Outcome, StoreError,
    ip_limit::LIMITED_MESSAGE,
    pipeline::UNEXPECTED_MESSAGE,
};
use thiserror::Error;
use tracing::error;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
pub const LOAD_FAILURE_MESSAGE: &str = "Failed to load data. Please try again.";

/// Every variant renders as `{success: false, message}`. Store details stay in
/// the logs.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many requests, retry after {retry_after}s")]
    TooManyRequests { retry_after: u64 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MalformedPayload => (StatusCode::BAD_REQUEST, UNEXPECTED_MESSAGE),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE),
            AppError::TooManyRequests { .. } => (StatusCode::TOO_MANY_REQUESTS, LIMITED_MESSAGE),
            AppError::Store(err) => {
                error!("Store read failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, LOAD_FAILURE_MESSAGE)
            }
        };

        let mut response = (status, Json(Outcome::failure(message))).into_response();

        if let AppError::TooManyRequests { retry_after } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
        }

        response
    }
}
