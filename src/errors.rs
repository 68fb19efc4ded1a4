use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Request,
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{attachments, config::config, db};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation")]
    Validation(String),
    #[error("not_found")]
    NotFound(String),
    #[error(transparent)]
    DB(db::Error),
    #[error(transparent)]
    Attachment(attachments::Error),
    #[error("unexpected")]
    Unexpected(String),
}

impl From<db::Error> for Error {
    fn from(error: db::Error) -> Self {
        match error {
            db::Error::NotFound(msg) => Self::NotFound(msg),
            error => Self::DB(error),
        }
    }
}

impl From<attachments::Error> for Error {
    fn from(error: attachments::Error) -> Self {
        Self::Attachment(error)
    }
}

impl From<MultipartError> for Error {
    fn from(error: MultipartError) -> Self {
        Self::Validation(error.body_text())
    }
}

impl From<MultipartRejection> for Error {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Attachment(error) if error.is_rejection() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Response

/// The envelope all four endpoints share on failure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        let message = match error {
            Error::Validation(message) => message.clone(),
            Error::NotFound(message) => message.clone(),
            Error::Attachment(error) if error.is_rejection() => error.to_string(),
            _ => "Unexpected error".into(),
        };

        // Internal detail never leaves the process outside development.
        let detail = if error.status() == StatusCode::INTERNAL_SERVER_ERROR && config().is_dev() {
            Some(format!("{error:?}"))
        } else {
            None
        };

        Self {
            success: false,
            message,
            error: detail,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = Arc::new(self);

        let mut res = axum::Json(ErrorResponse::from(error.as_ref())).into_response();
        res.extensions_mut().insert(error);

        *res.status_mut() = status;
        res
    }
}

pub async fn on_error(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let error = response.extensions().get::<Arc<Error>>().map(Arc::as_ref);
    if let Some(error) = error {
        tracing::error!("{:?}", error);
    }

    response
}
