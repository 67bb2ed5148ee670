use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::FormRejection,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::error;

use crate::views;

/// Where anonymous visitors are sent when an action needs a signed-in user.
pub const SIGN_IN_PATH: &str = "/users/sign_in";

/// Every way a request can end short of success. Each variant maps to one
/// status; none of them outlive the request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("sign in required")]
    NotAuthenticated,

    #[error("record not found")]
    NotFound,

    #[error("not the owner")]
    Forbidden,

    /// Carries the re-rendered form page.
    #[error("submission failed validation")]
    Unprocessable(String),

    /// Carries the re-rendered sign-in page.
    #[error("invalid email or password")]
    InvalidCredentials(String),

    #[error("malformed request: {message}")]
    Malformed { status: StatusCode, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Malformed {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Malformed {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::Malformed {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotAuthenticated => Redirect::to(SIGN_IN_PATH).into_response(),
            AppError::NotFound => (StatusCode::NOT_FOUND, Html(views::not_found())).into_response(),
            AppError::Forbidden => (StatusCode::FORBIDDEN, Html(views::forbidden())).into_response(),
            AppError::Unprocessable(page) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response()
            }
            AppError::InvalidCredentials(page) => {
                (StatusCode::UNAUTHORIZED, Html(page)).into_response()
            }
            AppError::Malformed { status, message } => (status, message).into_response(),
            AppError::Internal(e) => {
                error!("Internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
