use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

/// Failure of the results finalization workflow.
///
/// Every variant means nothing was committed.
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("Hackathon {0} not found")]
    NotFound(i32),

    #[error("Hackathon {0} has no submission with a positive average score")]
    NoScoredSubmissions(i32),

    #[error("Storage error: {0}")]
    Storage(#[from] DbErr),

    #[error("Certificate issuance failed: {0}")]
    Certificate(#[from] CertificateError),
}

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Storage error: {0}")]
    Storage(#[from] DbErr),

    #[error("No free certificate number derived from '{base}' after {attempts} attempts")]
    NumberSpaceExhausted { base: String, attempts: u32 },
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Storage error: {0}")]
    Storage(#[from] DbErr),

    #[error("No free slug derived from '{base}' after {attempts} attempts")]
    SlugCollisionExhaustion { base: String, attempts: u32 },
}

/// Failure reported by a message sender.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by the mail service: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        SendError::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `NOT_FOUND`,
    /// `NO_SCORED_SUBMISSIONS`, `INTERNAL_ERROR`.
    #[schema(example = "NO_SCORED_SUBMISSIONS")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "No winners could be determined")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    NoScoredSubmissions,
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::NoScoredSubmissions => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    code: "NO_SCORED_SUBMISSIONS",
                    message: "No winners could be determined".into(),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "Operation failed, retry".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<FinalizeError> for AppError {
    fn from(err: FinalizeError) -> Self {
        match err {
            FinalizeError::NotFound(id) => AppError::NotFound(format!("Hackathon {id} not found")),
            FinalizeError::NoScoredSubmissions(_) => AppError::NoScoredSubmissions,
            other => AppError::Internal(format!("Finalization failed: {other}")),
        }
    }
}
