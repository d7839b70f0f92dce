use actix_web::{http::StatusCode, ResponseError};
use log::error;
use thiserror::Error;

use crate::response::response_from_error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{msg}")]
    Biz { status: StatusCode, msg: String },
}

impl AppError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::Biz { status, msg: msg.into() }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn key_error() -> Self {
        Self::bad_request("KEY_ERROR")
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn invalid_token() -> Self {
        Self::unauthorized("INVALID_TOKEN")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// The social provider answered without an email address.
    pub fn email_required() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "EMAIL REQUIRED")
    }

    pub fn upstream() -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "PROVIDER ERROR")
    }

    pub fn system_exception() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "SYSTEM_EXCEPTION")
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Biz { status, .. } => *status,
        }
    }

    pub fn msg(&self) -> &str {
        match self {
            Self::Biz { msg, .. } => msg,
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        error!("database error: {}", err);
        Self::system_exception()
    }
}

impl From<sea_orm::TransactionError<AppError>> for AppError {
    fn from(err: sea_orm::TransactionError<AppError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(e) => e.into(),
            sea_orm::TransactionError::Transaction(e) => e,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        response_from_error(self)
    }
}
