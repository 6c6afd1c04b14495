use std::{io, sync::{Mutex, MutexGuard}};

use actix_web::{ResponseError, HttpResponse, http::{StatusCode, header::ContentType}};

use crate::render::render_not_found;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("store error: {0}")]
    Store(#[from] io::Error),
    #[error("shared state lock was poisoned")]
    Poisoned,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound(kind) => {
                tracing::debug!(kind, "entity not found");
                HttpResponse::build(StatusCode::NOT_FOUND)
                    .content_type(ContentType::html())
                    .body(render_not_found())
            },
            e => {
                tracing::error!(error = %e, "request failed");
                HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
                    .content_type(ContentType::plaintext())
                    .body("Internal server error")
            },
        }
    }
}

/// Locks shared state, turning a poisoned mutex into a 500 instead of a panic.
pub fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex.lock().map_err(|_| AppError::Poisoned)
}
