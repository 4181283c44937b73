// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),
}

impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    AppError::Store(StoreError::Database(err))
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<StoreError>() {
      Ok(store_err) => AppError::Store(store_err),
      Err(other) => AppError::Store(StoreError::from(other)),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Store(err) => match err {
        StoreError::Validation { .. } | StoreError::InsufficientStock { .. } | StoreError::EmptyCart => {
          StatusCode::UNPROCESSABLE_ENTITY
        }
        StoreError::Forbidden => StatusCode::FORBIDDEN,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Delivery(_)
        | StoreError::Database(_)
        | StoreError::Migration(_)
        | StoreError::Workflow(_)
        | StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }

    let body = match self {
      AppError::Store(err) => match err.field() {
        // Field-keyed validation shape: {"message", "errors": {field: [msg]}}
        Some(field) => {
          let message = err.client_message();
          json!({ "message": message, "errors": { field: [message] } })
        }
        None => match err {
          StoreError::Forbidden => json!({ "error": "Forbidden" }),
          StoreError::NotFound(m) => json!({ "error": m }),
          StoreError::Database(_) | StoreError::Migration(_) => json!({ "error": "Database operation failed" }),
          StoreError::Delivery(_) => json!({ "error": "Email service error" }),
          StoreError::Workflow(source) => {
            json!({ "error": "Workflow processing error", "detail": source.to_string() })
          }
          other => json!({ "error": "An internal error occurred", "detail": other.to_string() }),
        },
      },
      AppError::Auth(m) => json!({ "error": m }),
      AppError::Config(_) => json!({ "error": "Configuration issue" }),
    };

    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
