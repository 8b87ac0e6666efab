use std::any::Any;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::search::NotFound;
use crate::server::images::ImageNotFound;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error(transparent)]
    Image(#[from] ImageNotFound),

    #[error("Not found")]
    UnknownRoute,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::Image(_) | AppError::UnknownRoute => {
                StatusCode::NOT_FOUND
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(cause) = &self {
            error!(error = %format!("{cause:#}"), "request failed");
        }

        // Display of Internal never includes the cause.
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Response for a handler that panicked.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
