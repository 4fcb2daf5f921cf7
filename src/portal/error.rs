use thiserror::Error;

/// Errors raised by the portal client.
///
/// Only [`ClientError::InvalidIdentifier`] ever reaches callers of the
/// high-level portal methods; everything else is absorbed into fallback data.
#[derive(Debug, Error)]
pub enum ClientError {
  /// HTTP request failed before a response arrived
  #[error("HTTP request failed: {0}")]
  Network(#[from] reqwest::Error),

  /// Server answered with a non-2xx status
  #[error("HTTP {status}: {reason}")]
  Status { status: u16, reason: String },

  /// Response body was not a valid envelope or payload
  #[error("Failed to parse response: {0}")]
  MalformedBody(#[from] serde_json::Error),

  /// Envelope reported `success: false` or carried no data
  #[error("{0}")]
  Unsuccessful(String),

  /// Every retry attempt failed
  #[error("API request failed after {attempts} attempts: {source}")]
  Exhausted {
    attempts: u32,
    #[source]
    source: Box<ClientError>,
  },

  /// Identifier failed numeric validation; no request was made
  #[error("Invalid property ID provided: {0:?}")]
  InvalidIdentifier(String),
}
