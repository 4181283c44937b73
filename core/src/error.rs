// core/src/error.rs

use crate::flow::FlowError;
use thiserror::Error;

/// Every failure the storefront core can report.
///
/// `Validation`, `InsufficientStock` and `EmptyCart` carry the request field
/// they refer to so outer layers can render field-keyed messages.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Validation failed for '{field}': {message}")]
  Validation { field: &'static str, message: String },

  #[error("Insufficient stock: {message}")]
  InsufficientStock { field: &'static str, message: String },

  #[error("Your cart is empty. Please add items before checkout.")]
  EmptyCart,

  /// Acting on another user's cart resource. Deliberately carries no detail.
  #[error("Forbidden")]
  Forbidden,

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Mail delivery failed: {0}")]
  Delivery(String),

  #[error("Database Error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration Error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Workflow Error: {0}")]
  Workflow(#[from] FlowError),

  #[error("Internal Error: {0}")]
  Internal(String),
}

impl StoreError {
  pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
    StoreError::Validation {
      field,
      message: message.into(),
    }
  }

  pub fn insufficient_stock(field: &'static str, message: impl Into<String>) -> Self {
    StoreError::InsufficientStock {
      field,
      message: message.into(),
    }
  }

  /// The request field a client-facing error is attached to, if any.
  pub fn field(&self) -> Option<&'static str> {
    match self {
      StoreError::Validation { field, .. } | StoreError::InsufficientStock { field, .. } => Some(*field),
      StoreError::EmptyCart => Some("cart"),
      _ => None,
    }
  }

  /// The message shown to the client next to `field()`.
  pub fn client_message(&self) -> String {
    match self {
      StoreError::Validation { message, .. } | StoreError::InsufficientStock { message, .. } => message.clone(),
      other => other.to_string(),
    }
  }

  /// Errors a background job may retry: the mail transport or the database
  /// can recover between attempts.
  pub fn is_transient(&self) -> bool {
    matches!(self, StoreError::Delivery(_) | StoreError::Database(_))
  }
}

impl From<anyhow::Error> for StoreError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(db_err) => StoreError::Database(db_err),
      Err(other) => StoreError::Internal(other.to_string()),
    }
  }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
