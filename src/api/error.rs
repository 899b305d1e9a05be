use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::ApiResponse;
use crate::error::Error;

/// Newtype so the core taxonomy can cross the axum boundary; the status
/// mapping lives here and nowhere else.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::NoSuchUser(_) | Error::NoSuchLink(_) | Error::NoSuchInvite(_) => {
                (StatusCode::NOT_FOUND, self.0.to_string())
            }
            Error::UserExists(_) => (StatusCode::CONFLICT, self.0.to_string()),
            Error::BadPassword(_) | Error::AlreadyUsedInvite(_) | Error::BadPermissions => {
                (StatusCode::FORBIDDEN, self.0.to_string())
            }
            Error::InvalidToken => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            Error::InvalidTagName(_) | Error::BadFileUpload(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            Error::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(message);
        (status, Json(body)).into_response()
    }
}
