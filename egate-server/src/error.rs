use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Every failure an operation can surface to a caller. Each variant
/// maps to a status code and a `{"error": msg}` body.
#[derive(Debug)]
pub enum ApiError {
    DuplicateUsername,
    InvalidCredentials,
    TargetNotFound,
    UserNotFound,
    DuplicateRequest,
    RequestNotFound,
    MissingParameters(&'static str),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::DuplicateUsername => {
                (StatusCode::BAD_REQUEST, "username already exists".to_string())
            }
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "authentication failed".to_string())
            }
            ApiError::TargetNotFound => {
                (StatusCode::NOT_FOUND, "target user not found".to_string())
            }
            ApiError::UserNotFound => (StatusCode::NOT_FOUND, "user not found".to_string()),
            ApiError::DuplicateRequest => {
                (StatusCode::BAD_REQUEST, "friend request already sent".to_string())
            }
            ApiError::RequestNotFound => {
                (StatusCode::BAD_REQUEST, "friend request does not exist".to_string())
            }
            ApiError::MissingParameters(which) => {
                (StatusCode::BAD_REQUEST, format!("{which} are required"))
            }
            ApiError::Internal(err) => {
                tracing::error!("request failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

// This enables using `?` on fallible persistence/serialization calls
// inside handlers and store operations.
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        ApiError::Internal(err.into())
    }
}
