//! Route handlers. Each runs synchronously against the shared connection.

use std::collections::HashMap;

use axum::http::header;
use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::db::queries;
use crate::types::{HealthStatus, SearchFilters, API_VERSION};

use super::envelope::Reply;
use super::error::ApiError;
use super::routes::Route;

/// A routed request with its decoded parameters.
#[derive(Debug, Clone)]
pub struct RouteRequest {
  pub route: Route,
  pub params: HashMap<String, String>,
  pub search: SearchRequest,
  pub environment: &'static str,
}

impl RouteRequest {
  fn param(&self, name: &str) -> Option<&str> {
    self
      .params
      .get(name)
      .map(String::as_str)
      .filter(|v| !v.is_empty())
  }
}

/// Search phrase plus filters, from the query string or a JSON body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
  pub query: String,
  pub filters: SearchFilters,
}

impl SearchRequest {
  /// `query` (or its alias `q`) and filters from query-string parameters.
  pub fn from_params(params: &HashMap<String, String>) -> Self {
    let get = |name: &str| params.get(name).cloned();
    Self {
      query: get("query").or_else(|| get("q")).unwrap_or_default(),
      filters: SearchFilters {
        property_type: get("type"),
        min_price: get("min_price"),
        max_price: get("max_price"),
        bedrooms: get("bedrooms"),
        bathrooms: get("bathrooms"),
      },
    }
  }

  /// Same fields from a JSON object body. Numbers are accepted for the
  /// numeric filters; an empty body is an empty search.
  pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
      return Ok(Self::default());
    }

    let value: Value =
      serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
    let object = value
      .as_object()
      .ok_or_else(|| ApiError::bad_request("Invalid JSON body"))?;

    let field = |name: &str| match object.get(name) {
      Some(Value::String(s)) => Some(s.clone()),
      Some(Value::Number(n)) => Some(n.to_string()),
      _ => None,
    };

    Ok(Self {
      query: field("query").or_else(|| field("q")).unwrap_or_default(),
      filters: SearchFilters {
        property_type: field("type"),
        min_price: field("min_price"),
        max_price: field("max_price"),
        bedrooms: field("bedrooms"),
        bathrooms: field("bathrooms"),
      },
    })
  }
}

pub fn handle(conn: &Connection, request: &RouteRequest) -> Result<Reply, ApiError> {
  match request.route {
    Route::Properties => all_properties(conn),
    Route::Property(id) => property_by_id(conn, id),
    Route::Search => search(conn, &request.search),
    Route::PropertyHistory(id) => property_history(conn, id),
    Route::MarketInsights => market_insights(conn, request.param("suburb")),
    Route::Schools => schools(conn, request.param("suburb"), request.param("postcode")),
    Route::Health => health(conn, request.environment),
    Route::Stats => stats(conn),
  }
}

fn all_properties(conn: &Connection) -> Result<Reply, ApiError> {
  let fail = |e| ApiError::upstream("Failed to retrieve properties", e);

  let last_modified = queries::properties_last_modified(conn)
    .map_err(fail)?
    .unwrap_or_else(Utc::now);
  let properties = queries::list_properties(conn).map_err(fail)?;
  let count = properties.len();

  Ok(
    Reply::new(properties)?
      .message(format!("Retrieved {} properties", count))
      .header(header::ETAG, &etag("all_properties", last_modified.timestamp()))
      .header(
        header::LAST_MODIFIED,
        &last_modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
      ),
  )
}

/// Quoted hex digest of a collection name and its modification time.
fn etag(collection: &str, modified: i64) -> String {
  let mut hasher = Sha256::new();
  hasher.update(format!("{}{}", collection, modified).as_bytes());
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

fn property_by_id(conn: &Connection, id: i64) -> Result<Reply, ApiError> {
  let detail = queries::find_property(conn, id)
    .map_err(|e| ApiError::upstream("Failed to retrieve property", e))?
    .ok_or_else(|| ApiError::not_found("Property not found"))?;

  Ok(Reply::new(detail)?.message("Property details retrieved successfully"))
}

fn search(conn: &Connection, request: &SearchRequest) -> Result<Reply, ApiError> {
  let results = queries::search_properties(conn, &request.query, &request.filters)
    .map_err(|e| ApiError::upstream("Search failed", e))?;
  let count = results.len();

  Ok(Reply::new(results)?.message(format!("Found {} properties matching search criteria", count)))
}

fn property_history(conn: &Connection, id: i64) -> Result<Reply, ApiError> {
  let history = queries::property_history(conn, id)
    .map_err(|e| ApiError::upstream("Failed to retrieve property history", e))?;
  let count = history.len();

  Ok(Reply::new(history)?.message(format!("Retrieved {} history records", count)))
}

fn market_insights(conn: &Connection, suburb: Option<&str>) -> Result<Reply, ApiError> {
  let insights = queries::market_insights(conn, suburb)
    .map_err(|e| ApiError::upstream("Failed to retrieve market insights", e))?;

  Ok(Reply::new(insights)?.message("Retrieved market insights"))
}

fn schools(
  conn: &Connection,
  suburb: Option<&str>,
  postcode: Option<&str>,
) -> Result<Reply, ApiError> {
  let schools = queries::schools(conn, suburb, postcode)
    .map_err(|e| ApiError::upstream("Failed to retrieve schools", e))?;
  let count = schools.len();

  Ok(Reply::new(schools)?.message(format!("Retrieved {} schools", count)))
}

fn health(conn: &Connection, environment: &str) -> Result<Reply, ApiError> {
  let status = HealthStatus {
    status: "healthy".to_string(),
    database: queries::probe(conn),
    timestamp: Utc::now().to_rfc3339(),
    version: API_VERSION.to_string(),
    environment: environment.to_string(),
  };

  Ok(Reply::new(status)?.message("API is healthy"))
}

fn stats(conn: &Connection) -> Result<Reply, ApiError> {
  let stats = queries::property_stats(conn)
    .map_err(|e| ApiError::upstream("Failed to retrieve property statistics", e))?;

  Ok(Reply::new(stats)?.message("Retrieved property statistics"))
}
