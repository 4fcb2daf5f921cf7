//! Wire types shared by the API server and the portal client.
//!
//! Every server route answers with a [`ResponseEnvelope`]; the `data` payload is
//! one of the record types below (or a list of them).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version reported in every envelope's `meta` block.
pub const API_VERSION: &str = "2.0";

/// Standard JSON wrapper returned by every route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
  pub success: bool,
  #[serde(default)]
  pub timestamp: Option<String>,
  #[serde(default)]
  pub data: Option<T>,
  #[serde(default)]
  pub meta: Option<Meta>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub debug: Option<Value>,
}

impl<T> ResponseEnvelope<T> {
  /// Envelope used by the client when it has to report a failure itself.
  pub fn failure(message: impl Into<String>) -> Self {
    Self {
      success: false,
      timestamp: None,
      data: None,
      meta: None,
      message: Some(message.into()),
      debug: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
  /// Server-side handling time, e.g. `"3.14ms"`
  pub response_time: String,
  pub version: String,
  pub environment: String,
}

// ============================================================================
// Property records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub lat: f64,
  pub lng: f64,
}

/// A listing as stored in the `properties` table, with JSON columns decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
  pub id: i64,
  pub address: String,
  pub suburb: String,
  pub state: String,
  pub postcode: String,
  #[serde(rename = "type", default)]
  pub property_type: String,
  #[serde(default)]
  pub price: Option<i64>,
  #[serde(default)]
  pub bedrooms: u32,
  #[serde(default)]
  pub bathrooms: u32,
  #[serde(default)]
  pub parking_spaces: Option<u32>,
  #[serde(default)]
  pub land_area: Option<f64>,
  #[serde(default)]
  pub floor_area: Option<f64>,
  #[serde(default)]
  pub year_built: Option<i32>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub features: Vec<String>,
  #[serde(default)]
  pub images: Vec<String>,
  #[serde(default)]
  pub coordinates: Option<Coordinates>,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
}

impl Property {
  /// `"{address}, {suburb} {state} {postcode}"`
  pub fn full_address(&self) -> String {
    format!(
      "{}, {} {} {}",
      self.address, self.suburb, self.state, self.postcode
    )
  }

  pub fn price_formatted(&self) -> String {
    format_price(self.price)
  }
}

/// Row shape for the property list and search routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
  #[serde(flatten)]
  pub property: Property,
  #[serde(default)]
  pub history_count: i64,
  #[serde(default)]
  pub last_sold_date: Option<String>,
  #[serde(default)]
  pub last_sold_price: Option<i64>,
  #[serde(default)]
  pub has_history: bool,
  #[serde(default)]
  pub full_address: Option<String>,
  #[serde(default)]
  pub price_formatted: Option<String>,
}

impl PropertySummary {
  pub fn new(
    property: Property,
    history_count: i64,
    last_sold_date: Option<String>,
    last_sold_price: Option<i64>,
  ) -> Self {
    let full_address = Some(property.full_address());
    let price_formatted = Some(property.price_formatted());
    Self {
      property,
      history_count,
      last_sold_date,
      last_sold_price,
      has_history: history_count > 0,
      full_address,
      price_formatted,
    }
  }
}

/// Single property with its sale history and nearby schools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDetail {
  #[serde(flatten)]
  pub property: Property,
  #[serde(default)]
  pub history_count: i64,
  #[serde(default)]
  pub avg_price: Option<f64>,
  #[serde(default)]
  pub last_activity: Option<String>,
  #[serde(default)]
  pub full_address: Option<String>,
  #[serde(default)]
  pub price_formatted: Option<String>,
  #[serde(default)]
  pub history: Vec<SaleRecord>,
  #[serde(default)]
  pub nearby_schools: Vec<School>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
  pub id: i64,
  pub property_id: i64,
  /// Sale date, `YYYY-MM-DD`
  pub date: String,
  pub price: i64,
  #[serde(default)]
  pub event_type: Option<String>,
  #[serde(default)]
  pub agent: Option<String>,
}

/// Sale record joined with the address of the property it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
  #[serde(flatten)]
  pub record: SaleRecord,
  pub address: String,
  pub suburb: String,
  pub state: String,
  pub postcode: String,
  pub price_formatted: String,
  pub date_formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
  pub id: i64,
  pub name: String,
  #[serde(rename = "type", default)]
  pub school_type: Option<String>,
  pub suburb: String,
  pub postcode: String,
  #[serde(default)]
  pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInsight {
  pub id: i64,
  pub suburb: String,
  pub state: String,
  #[serde(default)]
  pub median_price: Option<i64>,
  #[serde(default)]
  pub price_growth: Option<f64>,
  #[serde(default)]
  pub rental_yield: Option<f64>,
  #[serde(default)]
  pub population: Option<i64>,
  #[serde(default)]
  pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyStats {
  pub total_properties: i64,
  #[serde(default)]
  pub average_price: Option<f64>,
  #[serde(default)]
  pub min_price: Option<i64>,
  #[serde(default)]
  pub max_price: Option<i64>,
  #[serde(default)]
  pub total_suburbs: i64,
  #[serde(default)]
  pub total_states: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseCheck {
  pub status: String,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub server_info: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub test_result: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
  pub status: String,
  pub database: DatabaseCheck,
  pub timestamp: String,
  pub version: String,
  pub environment: String,
}

/// Search filters accepted by the `search` route (query string or POST body).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub property_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub min_price: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_price: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bedrooms: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bathrooms: Option<String>,
}

impl SearchFilters {
  /// Filters as `(name, value)` pairs in wire order, skipping unset ones.
  pub fn pairs(&self) -> Vec<(&'static str, &str)> {
    [
      ("type", &self.property_type),
      ("min_price", &self.min_price),
      ("max_price", &self.max_price),
      ("bedrooms", &self.bedrooms),
      ("bathrooms", &self.bathrooms),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
    .collect()
  }
}

// ============================================================================
// Display helpers
// ============================================================================

/// Format whole dollars with thousands separators (`$850,000`).
/// Missing or zero prices read "Contact for price".
pub fn format_price(price: Option<i64>) -> String {
  match price {
    Some(p) if p != 0 => format!("${}", group_thousands(p)),
    _ => "Contact for price".to_string(),
  }
}

fn group_thousands(value: i64) -> String {
  let digits = value.unsigned_abs().to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
  if value < 0 {
    out.push('-');
  }
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(ch);
  }
  out
}

/// True when `s` is a plain unsigned integer identifier.
pub fn is_numeric_id(s: &str) -> bool {
  !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
