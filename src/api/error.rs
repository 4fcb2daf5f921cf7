//! Error types for the portal API and their HTTP status mapping.

use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{message}")]
  BadRequest { message: String },

  #[error("{message}")]
  NotFound { message: String },

  #[error("Method not allowed")]
  MethodNotAllowed,

  /// Database or connection failure. `details` is only shown outside production.
  #[error("{message}: {details}")]
  Upstream { message: String, details: String },
}

impl ApiError {
  pub fn bad_request(message: impl Into<String>) -> Self {
    Self::BadRequest {
      message: message.into(),
    }
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::NotFound {
      message: message.into(),
    }
  }

  pub fn upstream(message: impl Into<String>, details: impl std::fmt::Display) -> Self {
    Self::Upstream {
      message: message.into(),
      details: details.to_string(),
    }
  }

  pub fn status_code(&self) -> StatusCode {
    match self {
      Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
      Self::NotFound { .. } => StatusCode::NOT_FOUND,
      Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
      Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Message safe to show to any client.
  pub fn public_message(&self) -> String {
    match self {
      Self::Upstream { message, .. } => message.clone(),
      other => other.to_string(),
    }
  }

  /// `data` payload of the error envelope.
  pub fn to_data(&self, production: bool) -> Value {
    let mut data = json!({
      "error": true,
      "message": self.public_message(),
      "code": self.status_code().as_u16(),
    });

    if let Self::Upstream { details, .. } = self {
      if !production {
        data["details"] = Value::String(details.clone());
      }
    }

    data
  }
}
