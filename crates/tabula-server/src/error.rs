//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tabula_algebra::AlgebraError;
use tabula_ast::QueryError;
use thiserror::Error;
use tracing::warn;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Algebra(#[from] AlgebraError),

    #[error("query task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Query(QueryError::Parse(_)) => StatusCode::BAD_REQUEST,
            ApiError::Query(QueryError::Algebra(e)) | ApiError::Algebra(e) => algebra_status(e),
            ApiError::Query(QueryError::Io(_)) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn algebra_status(error: &AlgebraError) -> StatusCode {
    match error {
        AlgebraError::UnknownCollection(_) => StatusCode::NOT_FOUND,
        AlgebraError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        AlgebraError::MissingField(_)
        | AlgebraError::MalformedKey(_)
        | AlgebraError::UnknownField(_)
        | AlgebraError::IncompatibleKind { .. }
        | AlgebraError::NotATuple(_)
        | AlgebraError::UnsupportedOperator(_)
        | AlgebraError::InvalidTypeTag(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AlgebraError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    /// Parser attempts, one per line, for parse failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        let trace = match err {
            ApiError::Query(QueryError::Parse(failure)) => {
                Some(failure.trace.to_string().lines().map(str::to_string).collect())
            }
            _ => None,
        };
        Self {
            error: err.to_string(),
            code: err.status_code().as_u16(),
            trace,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(status = status.as_u16(), error = %self, "request failed");
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
