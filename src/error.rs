use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Rejected client input. The display string is the reason sent back to the client.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid json")]
    InvalidJson,

    #[error("empty message")]
    EmptyText,
}

/// Failure reading or writing the backing data file.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not replace data file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("no message id left after {0}")]
    IdExhausted(i64),
}

/// Everything a request handler can fail with.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("blocking task was canceled")]
    Blocking,
}

impl From<BlockingError> for ChatError {
    fn from(_: BlockingError) -> Self {
        ChatError::Blocking
    }
}

#[derive(Serialize)]
struct ErrorDso<'a> {
    error: &'a str,
}

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ChatError::Validation(e) => {
                HttpResponse::BadRequest().json(ErrorDso { error: &e.to_string() })
            }
            other => {
                // Internal details stay in the log, never in the body.
                tracing::error!(error = %other, "request failed");
                HttpResponse::InternalServerError().json(ErrorDso {
                    error: "internal server error",
                })
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
