// src/error.rs
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::db::StoreError;
use crate::history::HistoryError;
use crate::poll::PollError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Poll(err) => match err {
                PollError::Validation(_) => StatusCode::BAD_REQUEST,
                PollError::NotFound(_) | PollError::OptionNotFound(_) => StatusCode::NOT_FOUND,
                PollError::Permission => StatusCode::FORBIDDEN,
                PollError::Closed | PollError::AlreadyClosed => StatusCode::CONFLICT,
                PollError::Contention(_) => StatusCode::SERVICE_UNAVAILABLE,
                PollError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::History(err) => match err {
                HistoryError::Validation(_) => StatusCode::BAD_REQUEST,
                HistoryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "Internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Anything that stops the server from coming up.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Unauthenticated, StatusCode::UNAUTHORIZED)]
    #[case(AppError::MalformedPayload("x".into()), StatusCode::BAD_REQUEST)]
    #[case(PollError::Validation("x".into()).into(), StatusCode::BAD_REQUEST)]
    #[case(PollError::NotFound("poll:1".into()).into(), StatusCode::NOT_FOUND)]
    #[case(PollError::OptionNotFound(9).into(), StatusCode::NOT_FOUND)]
    #[case(PollError::Permission.into(), StatusCode::FORBIDDEN)]
    #[case(PollError::Closed.into(), StatusCode::CONFLICT)]
    #[case(PollError::AlreadyClosed.into(), StatusCode::CONFLICT)]
    #[case(PollError::Contention("poll:1".into()).into(), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(HistoryError::Validation("x".into()).into(), StatusCode::BAD_REQUEST)]
    fn maps_errors_to_status(#[case] error: AppError, #[case] expected: StatusCode) {
        assert_eq!(error.status_code(), expected);
        assert_eq!(error.into_response().status(), expected);
    }

    #[test]
    fn storage_errors_hide_details() {
        let error: AppError = PollError::Store(StoreError::Serialization(
            serde_json::from_str::<u32>("nope").unwrap_err(),
        ))
        .into();

        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
