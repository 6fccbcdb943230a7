use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sitepress_core::BookingRequestError;
use sitepress_publish::{PublishError, StoreError};

/// API error type, rendered as the JSON error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Publish(#[from] PublishError),

    /// An upstream service (repository host, notification relay) failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl From<BookingRequestError> for ApiError {
    fn from(err: BookingRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Publish(err) => {
                let status = match err {
                    PublishError::Validation(_) => StatusCode::BAD_REQUEST,
                    PublishError::Conflict { .. } => StatusCode::CONFLICT,
                    PublishError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    PublishError::RemoteRead { .. }
                    | PublishError::RemoteWrite { .. }
                    | PublishError::Unconfirmed { .. } => StatusCode::BAD_GATEWAY,
                    PublishError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind(), err.to_string())
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream", msg.clone()),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg.clone())
            }
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payloadTooLarge", msg.clone())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error_type, %message, "request failed");
        }

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
