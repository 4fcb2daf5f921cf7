//! Route table: request method and path to a handler.

use axum::http::Method;

use crate::types::is_numeric_id;

use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  Properties,
  Property(i64),
  Search,
  PropertyHistory(i64),
  MarketInsights,
  Schools,
  Health,
  Stats,
}

impl Route {
  /// Resolve a request. `base_path` is an optional prefix stripped first.
  ///
  /// Only GET is accepted, plus POST for `search`. Identifiers are validated
  /// here so no handler ever sees a non-numeric id.
  pub fn resolve(method: &Method, path: &str, base_path: &str) -> Result<Self, ApiError> {
    if method != Method::GET && method != Method::POST {
      return Err(ApiError::MethodNotAllowed);
    }

    let segments = segments(path, base_path);
    let route = match segments.as_slice() {
      [] => Route::Health,
      ["properties"] => Route::Properties,
      ["properties", id, ..] => Route::Property(parse_id(id, "Invalid property ID")?),
      ["search", ..] => Route::Search,
      ["property-history"] => return Err(ApiError::bad_request("Property ID required")),
      ["property-history", id, ..] => Route::PropertyHistory(parse_id(id, "Invalid property ID")?),
      ["market-insights", ..] => Route::MarketInsights,
      ["schools", ..] => Route::Schools,
      ["health", ..] => Route::Health,
      ["stats", ..] => Route::Stats,
      _ => return Err(ApiError::not_found("Endpoint not found")),
    };

    if method == Method::POST && route != Route::Search {
      return Err(ApiError::MethodNotAllowed);
    }

    Ok(route)
  }
}

/// Non-empty path segments after stripping `base_path`.
fn segments<'a>(path: &'a str, base_path: &str) -> Vec<&'a str> {
  let path = path.trim_matches('/');
  let base = base_path.trim_matches('/');

  let rest = if base.is_empty() {
    path
  } else if path == base {
    ""
  } else {
    path
      .strip_prefix(base)
      .and_then(|rest| rest.strip_prefix('/'))
      .unwrap_or(path)
  };

  rest.split('/').filter(|s| !s.is_empty()).collect()
}

fn parse_id(raw: &str, message: &str) -> Result<i64, ApiError> {
  if !is_numeric_id(raw) {
    return Err(ApiError::bad_request(message));
  }
  raw.parse().map_err(|_| ApiError::bad_request(message))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn get(path: &str) -> Result<Route, ApiError> {
    Route::resolve(&Method::GET, path, "")
  }

  #[test]
  fn test_route_table() {
    assert_eq!(get("/").unwrap(), Route::Health);
    assert_eq!(get("/properties").unwrap(), Route::Properties);
    assert_eq!(get("/properties/").unwrap(), Route::Properties);
    assert_eq!(get("/properties/12").unwrap(), Route::Property(12));
    assert_eq!(get("/search").unwrap(), Route::Search);
    assert_eq!(get("/property-history/3").unwrap(), Route::PropertyHistory(3));
    assert_eq!(get("/market-insights").unwrap(), Route::MarketInsights);
    assert_eq!(get("/schools").unwrap(), Route::Schools);
    assert_eq!(get("/health").unwrap(), Route::Health);
    assert_eq!(get("/stats").unwrap(), Route::Stats);
  }

  #[test]
  fn test_invalid_ids() {
    let err = get("/properties/abc").unwrap_err();
    assert_eq!(err.to_string(), "Invalid property ID");

    let err = get("/property-history/1x").unwrap_err();
    assert_eq!(err.to_string(), "Invalid property ID");

    let err = get("/property-history").unwrap_err();
    assert_eq!(err.to_string(), "Property ID required");

    // Out of range for i64
    assert!(get("/properties/99999999999999999999").is_err());
  }

  #[test]
  fn test_unknown_endpoint() {
    let err = get("/agents").unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(err.to_string(), "Endpoint not found");
  }

  #[test]
  fn test_methods() {
    assert_eq!(
      Route::resolve(&Method::POST, "/search", "").unwrap(),
      Route::Search
    );
    assert!(matches!(
      Route::resolve(&Method::POST, "/properties", ""),
      Err(ApiError::MethodNotAllowed)
    ));
    assert!(matches!(
      Route::resolve(&Method::DELETE, "/properties/1", ""),
      Err(ApiError::MethodNotAllowed)
    ));
    assert!(matches!(
      Route::resolve(&Method::PUT, "/nowhere", ""),
      Err(ApiError::MethodNotAllowed)
    ));
  }

  #[test]
  fn test_base_path_is_stripped() {
    assert_eq!(
      Route::resolve(&Method::GET, "/api/properties/2", "/api/").unwrap(),
      Route::Property(2)
    );
    assert_eq!(Route::resolve(&Method::GET, "/api", "api").unwrap(), Route::Health);
    // Paths outside the prefix are still routed as-is
    assert_eq!(Route::resolve(&Method::GET, "/stats", "api").unwrap(), Route::Stats);
    // A prefix match must end on a segment boundary
    assert!(Route::resolve(&Method::GET, "/apiary", "api").is_err());
  }
}
