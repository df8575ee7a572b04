// storefront/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use flowline::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Invalid status: {0}")]
  InvalidStatus(String),

  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Unauthenticated: {0}")]
  Unauthenticated(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Invalid transition: {0}")]
  InvalidTransition(String),

  #[error("Persistence Error: {0}")]
  Persistence(String),

  #[error("Gateway Error: {0}")]
  Gateway(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Whether a failed notification delivery is worth another attempt.
  pub fn is_retryable(&self) -> bool {
    matches!(self, AppError::Gateway(_) | AppError::Persistence(_) | AppError::Internal(_))
  }
}

impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    match err {
      sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
      other => AppError::Persistence(other.to_string()),
    }
  }
}

impl From<sqlx::migrate::MigrateError> for AppError {
  fn from(err: sqlx::migrate::MigrateError) -> Self {
    AppError::Persistence(format!("Migration failed: {}", err))
  }
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    AppError::Gateway(err.to_string())
  }
}

impl From<crate::services::message_template::TemplateError> for AppError {
  fn from(err: crate::services::message_template::TemplateError) -> Self {
    AppError::Validation(format!("Message template: {}", err))
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::InvalidStatus(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::InvalidTransition(_) => StatusCode::CONFLICT,
      AppError::Persistence(_)
      | AppError::Gateway(_)
      | AppError::Config(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Rejecting request");
    }
    let message = match self {
      AppError::InvalidStatus(m)
      | AppError::Validation(m)
      | AppError::Unauthenticated(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::InvalidTransition(m) => m.clone(),
      AppError::Persistence(_) => "Database operation failed".to_string(),
      AppError::Gateway(_) => "Downstream service failed".to_string(),
      AppError::Config(_) => "Configuration issue".to_string(),
      AppError::Workflow { .. } => "Workflow processing error".to_string(),
      AppError::Internal(_) => "An internal error occurred".to_string(),
    };
    HttpResponse::build(status).json(json!({ "error": message }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
