// core/src/flow/error.rs
use thiserror::Error;

/// Failures raised by the workflow engine itself rather than by step handlers.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context type {context_type}")]
  NotRegistered { context_type: &'static str },

  #[error("Context type mismatch in registry (expected {expected_type})")]
  TypeMismatch { expected_type: &'static str },
}
