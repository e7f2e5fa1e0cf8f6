//! Mapping from the shared error taxonomy onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use croco_core::Error;

/// Request-level failure. Everything propagates here and is rendered as a
/// plain status message; nothing is retried.
#[derive(Debug)]
pub enum AppError {
    Core(Error),
    Internal(String),
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::Core(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Core(e) => {
                let status = match &e {
                    Error::NotFound(_) => StatusCode::NOT_FOUND,
                    Error::InvalidArchive(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    Error::Conflict(_) => StatusCode::CONFLICT,
                    Error::Forbidden(_) => StatusCode::FORBIDDEN,
                    Error::SpellService(_) => StatusCode::BAD_GATEWAY,
                    Error::Io(_) | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            AppError::Internal(message) => {
                tracing::error!("internal error: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: Error) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn test_taxonomy_maps_to_statuses() {
        assert_eq!(status_of(Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(Error::InvalidArchive("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(Error::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(Error::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(Error::SpellService("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(Error::Database("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
