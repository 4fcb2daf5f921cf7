//! The one place responses are built.
//!
//! Status code, `success` and `meta.response_time` are all derived here, so
//! they cannot disagree.

use std::time::Instant;

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Environment;
use crate::types::{Meta, ResponseEnvelope, API_VERSION};

use super::error::ApiError;

const CACHE_CONTROL: &str = "public, max-age=300";

/// Per-request facts the envelope reports.
#[derive(Debug, Clone)]
pub struct RequestContext {
  started: Instant,
  pub production: bool,
  method: Method,
  uri: String,
  host: String,
  user_agent: String,
}

impl RequestContext {
  pub fn new(method: &Method, uri: &Uri, headers: &HeaderMap, environment: Environment) -> Self {
    let header_str =
      |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());
    let host = header_str(header::HOST);

    Self {
      started: Instant::now(),
      production: environment.is_production(host),
      method: method.clone(),
      uri: uri.to_string(),
      host: host.unwrap_or_default().to_string(),
      user_agent: header_str(header::USER_AGENT)
        .unwrap_or("Unknown")
        .to_string(),
    }
  }

  pub fn environment_name(&self) -> &'static str {
    if self.production {
      "production"
    } else {
      "development"
    }
  }

  fn response_time(&self) -> String {
    let ms = self.started.elapsed().as_secs_f64() * 1000.0;
    format!("{}ms", (ms * 100.0).round() / 100.0)
  }

  fn debug_block(&self) -> Option<Value> {
    (!self.production).then(|| {
      json!({
        "server": self.host,
        "method": self.method.as_str(),
        "uri": self.uri,
        "user_agent": self.user_agent,
      })
    })
  }
}

/// Successful handler output.
#[derive(Debug)]
pub struct Reply {
  pub data: Value,
  pub message: Option<String>,
  pub headers: HeaderMap,
}

impl Reply {
  pub fn new(data: impl Serialize) -> Result<Self, ApiError> {
    let data =
      serde_json::to_value(data).map_err(|e| ApiError::upstream("Failed to encode response", e))?;
    Ok(Self {
      data,
      message: None,
      headers: HeaderMap::new(),
    })
  }

  pub fn message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  pub fn header(mut self, name: header::HeaderName, value: &str) -> Self {
    if let Ok(value) = HeaderValue::from_str(value) {
      self.headers.insert(name, value);
    }
    self
  }
}

/// Build the envelope response.
pub fn respond(
  ctx: &RequestContext,
  status: StatusCode,
  data: Value,
  message: Option<String>,
  mut headers: HeaderMap,
) -> Response {
  let envelope = ResponseEnvelope {
    success: status.as_u16() < 400,
    timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)),
    data: Some(data),
    meta: Some(Meta {
      response_time: ctx.response_time(),
      version: API_VERSION.to_string(),
      environment: ctx.environment_name().to_string(),
    }),
    message,
    debug: ctx.debug_block(),
  };

  headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
  (status, headers, Json(envelope)).into_response()
}

pub fn success(ctx: &RequestContext, reply: Reply) -> Response {
  respond(ctx, StatusCode::OK, reply.data, reply.message, reply.headers)
}

pub fn failure(ctx: &RequestContext, err: &ApiError) -> Response {
  match err {
    ApiError::Upstream { .. } => tracing::error!(uri = %ctx.uri, "API error: {}", err),
    _ => tracing::debug!(uri = %ctx.uri, status = err.status_code().as_u16(), "{}", err),
  }

  respond(
    ctx,
    err.status_code(),
    err.to_data(ctx.production),
    Some(err.public_message()),
    HeaderMap::new(),
  )
}

/// Empty 200 for CORS preflight requests that reach the router.
pub fn preflight() -> Response {
  (
    StatusCode::OK,
    [(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL))],
  )
    .into_response()
}
