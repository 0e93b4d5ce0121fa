//! Mapping from service errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use services::error::SessionServiceError;

/// Client-facing error: a status code and an identifying message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<SessionServiceError> for ApiError {
    fn from(err: SessionServiceError) -> Self {
        let status = match &err {
            SessionServiceError::UserNotFound(_)
            | SessionServiceError::SessionNotFound(_)
            | SessionServiceError::QuestionNotFound(_)
            | SessionServiceError::NoQuestionsForTopic(_) => StatusCode::NOT_FOUND,
            SessionServiceError::TopicsNotFound(_)
            | SessionServiceError::NoCurrentQuestion
            | SessionServiceError::Session(_) => StatusCode::BAD_REQUEST,
            SessionServiceError::Agent(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}
