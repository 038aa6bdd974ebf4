use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

use crate::openai::UpstreamError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")] InvalidInput(String),
    #[error("asset not found: {0}")] AssetNotFound(String),
    #[error("upstream error: {0}")] Upstream(#[from] UpstreamError),
    #[error("generation cancelled by user")] CancelledByUser,
    #[error("internal error: {0}")] Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::AssetNotFound(_) => "asset_not_found",
            AppError::Upstream(_) => "upstream_error",
            AppError::CancelledByUser => "cancelled",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::AssetNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::CancelledByUser => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self { AppError::Internal(e.to_string()) }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "❌ {}", self);
        } else {
            tracing::warn!(kind = self.kind(), "⚠️ {}", self);
        }
        let body = json!({ "success": false, "error": self.kind(), "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}
