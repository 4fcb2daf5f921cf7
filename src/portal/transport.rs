//! HTTP transport for the portal client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::error::ClientError;

/// HTTP methods the portal API understands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
  #[default]
  Get,
  Post,
  Put,
  Delete,
}

impl HttpMethod {
  fn as_reqwest(self) -> reqwest::Method {
    match self {
      Self::Get => reqwest::Method::GET,
      Self::Post => reqwest::Method::POST,
      Self::Put => reqwest::Method::PUT,
      Self::Delete => reqwest::Method::DELETE,
    }
  }
}

/// Per-request options. Serialized as part of the cache key, so two requests
/// differing only in headers or body are cached separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOptions {
  pub use_cache: bool,
  pub method: HttpMethod,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub body: Option<Value>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub headers: BTreeMap<String, String>,
}

impl Default for RequestOptions {
  fn default() -> Self {
    Self {
      use_cache: true,
      method: HttpMethod::Get,
      body: None,
      headers: BTreeMap::new(),
    }
  }
}

impl RequestOptions {
  pub fn uncached() -> Self {
    Self {
      use_cache: false,
      ..Self::default()
    }
  }

  pub fn post(body: Value) -> Self {
    Self {
      method: HttpMethod::Post,
      body: Some(body),
      ..Self::default()
    }
  }

  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.insert(name.into(), value.into());
    self
  }
}

/// One network attempt: send the request, return the decoded JSON body.
///
/// Non-2xx statuses and undecodable bodies are errors so the caller can retry.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, url: &str, options: &RequestOptions) -> Result<Value, ClientError>;
}

/// `reqwest`-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self, ClientError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("flint/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, url: &str, options: &RequestOptions) -> Result<Value, ClientError> {
    let mut request = self
      .client
      .request(options.method.as_reqwest(), url)
      .header(reqwest::header::ACCEPT, "application/json")
      .header(reqwest::header::CACHE_CONTROL, "max-age=300");

    for (name, value) in &options.headers {
      request = request.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &options.body {
      request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(ClientError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
      });
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
  }
}
