//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{OrderError, StorageError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request outside the domain's responsibility.
    BadRequest(String),
    /// Domain logic error; carries the wire-contract message.
    Order(OrderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Order(err) => order_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String) {
    let status = match &err {
        OrderError::StoreNotFound(_)
        | OrderError::UnknownStore(_)
        | OrderError::ProductNotFound(_)
        | OrderError::OrderNotFound(_)
        | OrderError::OrderNotUpdatable => StatusCode::NOT_FOUND,
        OrderError::ProductOutsideStore
        | OrderError::InsufficientStock
        | OrderError::InvalidStatusTransition { .. } => StatusCode::BAD_REQUEST,
        OrderError::Storage(
            StorageError::VersionConflict { .. } | StorageError::Duplicate { .. },
        ) => StatusCode::CONFLICT,
        OrderError::Storage(_) => {
            tracing::error!(error = %err, "storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}
