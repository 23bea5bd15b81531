use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};

use crate::domain::FieldErrors;
use crate::util::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    ValidationError(FieldErrors),
    #[error("Not found.")]
    NotFound,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        Self::ValidationError(errors)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        match self {
            Self::ValidationError(errors) => response.json(errors),
            Self::NotFound => response.json(serde_json::json!({ "detail": "Not found." })),
            Self::UnexpectedError(_) => {
                response.json(serde_json::json!({ "detail": "A server error occurred." }))
            }
        }
    }
}

/// Malformed bodies are reported like any other validation failure.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::ValidationError(FieldErrors::single("non_field_errors", err.to_string())).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::ValidationError(FieldErrors::single("non_field_errors", err.to_string())).into()
}
