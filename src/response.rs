use actix_web::{error::JsonPayloadError, HttpRequest, HttpResponse};
use log::warn;
use serde::Serialize;

use crate::error::AppError;

#[derive(Serialize)]
pub struct MessageDto {
    pub message: String,
}

impl MessageDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn success() -> Self {
        Self::new("SUCCESS")
    }
}

pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("rejected json body on {}: {}", req.path(), err);
    AppError::key_error().into()
}

pub fn response_from_error(err: &AppError) -> HttpResponse {
    HttpResponse::build(err.status()).json(MessageDto::new(err.msg()))
}
