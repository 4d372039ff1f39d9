use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the read views.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("Database Error: {context}")]
    Database { context: &'static str },
}

impl AppError {
    /// Log the cause and hide it behind a fixed message.
    pub fn database(context: &'static str, cause: anyhow::Error) -> Self {
        tracing::error!("{}: {:?}", context, cause);
        AppError::Database { context }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvoiceNotFound => StatusCode::NOT_FOUND,
            AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
