//! Cache keys for portal requests.

use sha2::{Digest, Sha256};

use crate::cache::QueryKey;

use super::transport::RequestOptions;

/// An endpoint plus the options it was requested with.
#[derive(Debug, Clone)]
pub struct RequestKey<'a> {
  pub endpoint: &'a str,
  pub options: &'a RequestOptions,
}

impl QueryKey for RequestKey<'_> {
  fn cache_hash(&self) -> String {
    // Headers live in a BTreeMap, so the serialization is stable.
    let options = serde_json::to_string(self.options).unwrap_or_default();
    let input = format!("{}_{}", self.endpoint, options);
    hash_string(&input)
  }

  fn description(&self) -> String {
    let method = serde_json::to_value(self.options.method)
      .ok()
      .and_then(|v| v.as_str().map(String::from))
      .unwrap_or_default();
    format!("{} {}", method, self.endpoint)
  }
}

fn hash_string(input: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn key_for(endpoint: &str, options: &RequestOptions) -> String {
    RequestKey { endpoint, options }.cache_hash()
  }

  #[test]
  fn test_same_request_same_key() {
    let a = RequestOptions::default().header("B", "2").header("A", "1");
    let b = RequestOptions::default().header("A", "1").header("B", "2");
    assert_eq!(key_for("properties", &a), key_for("properties", &b));
    assert_eq!(key_for("properties", &a).len(), 64);
  }

  #[test]
  fn test_endpoint_and_options_distinguish_keys() {
    let get = RequestOptions::default();
    let post = RequestOptions::post(json!({"query": "woody"}));

    assert_ne!(key_for("properties", &get), key_for("properties/1", &get));
    assert_ne!(key_for("search", &get), key_for("search", &post));
  }

  #[test]
  fn test_description() {
    let options = RequestOptions::default();
    let key = RequestKey {
      endpoint: "schools?suburb=Redcliffe",
      options: &options,
    };
    assert_eq!(key.description(), "GET schools?suburb=Redcliffe");
  }
}
