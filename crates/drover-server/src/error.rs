use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use drover_core::DroverError;

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(DroverError::InvalidKind(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<DroverError>() {
            match e {
                DroverError::TalkNotFound(_) => StatusCode::NOT_FOUND,
                DroverError::TalkExists(_) => StatusCode::CONFLICT,
                DroverError::InvalidKind(_) => StatusCode::BAD_REQUEST,
                DroverError::Profile(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DroverError::Storage(_)
                | DroverError::Runtime(_)
                | DroverError::Pulse(_)
                | DroverError::Io(_)
                | DroverError::Yaml(_)
                | DroverError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
