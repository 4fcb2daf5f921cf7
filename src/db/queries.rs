//! Read-only portal queries.
//!
//! Every filter value is passed as a bound parameter; only fixed SQL fragments
//! are ever concatenated.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use crate::types::{
  format_price, Coordinates, DatabaseCheck, HistoryEntry, MarketInsight, Property, PropertyDetail,
  PropertyStats, PropertySummary, SaleRecord, School, SearchFilters,
};

/// Column list matching [`property_from_row`]; aggregates follow at index 19.
const PROPERTY_COLUMNS: &str = "p.id, p.address, p.suburb, p.state, p.postcode, p.type, p.price,
  p.bedrooms, p.bathrooms, p.parking_spaces, p.land_area, p.floor_area, p.year_built,
  p.description, p.features, p.images, p.coordinates, p.created_at, p.updated_at";

const AGGREGATE_START: usize = 19;

/// Most rows a search returns.
const SEARCH_LIMIT: i64 = 50;

/// Text the search phrase is matched against; same shape as `full_address`.
const ADDRESS_TEXT: &str = "(p.address || ', ' || p.suburb || ' ' || p.state || ' ' || p.postcode)";

fn decode_json<T: DeserializeOwned + Default>(text: Option<String>) -> T {
  text
    .and_then(|t| serde_json::from_str(&t).ok())
    .unwrap_or_default()
}

fn decode_coordinates(text: Option<String>) -> Option<Coordinates> {
  text.and_then(|t| serde_json::from_str(&t).ok())
}

fn property_from_row(row: &Row<'_>) -> rusqlite::Result<Property> {
  Ok(Property {
    id: row.get(0)?,
    address: row.get(1)?,
    suburb: row.get(2)?,
    state: row.get(3)?,
    postcode: row.get(4)?,
    property_type: row.get(5)?,
    price: row.get(6)?,
    bedrooms: row.get(7)?,
    bathrooms: row.get(8)?,
    parking_spaces: row.get(9)?,
    land_area: row.get(10)?,
    floor_area: row.get(11)?,
    year_built: row.get(12)?,
    description: row.get(13)?,
    features: decode_json(row.get(14)?),
    images: decode_json(row.get(15)?),
    coordinates: decode_coordinates(row.get(16)?),
    created_at: row.get(17)?,
    updated_at: row.get(18)?,
  })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<PropertySummary> {
  let property = property_from_row(row)?;
  Ok(PropertySummary::new(
    property,
    row.get(AGGREGATE_START)?,
    row.get(AGGREGATE_START + 1)?,
    row.get(AGGREGATE_START + 2)?,
  ))
}

fn sale_from_row(row: &Row<'_>) -> rusqlite::Result<SaleRecord> {
  Ok(SaleRecord {
    id: row.get(0)?,
    property_id: row.get(1)?,
    date: row.get(2)?,
    price: row.get(3)?,
    event_type: row.get(4)?,
    agent: row.get(5)?,
  })
}

fn school_from_row(row: &Row<'_>) -> rusqlite::Result<School> {
  Ok(School {
    id: row.get(0)?,
    name: row.get(1)?,
    school_type: row.get(2)?,
    suburb: row.get(3)?,
    postcode: row.get(4)?,
    rating: row.get(5)?,
  })
}

/// `2019-06-14` → `14 Jun 2019`; unparseable dates pass through unchanged.
pub fn format_sale_date(date: &str) -> String {
  NaiveDate::parse_from_str(date, "%Y-%m-%d")
    .map(|d| d.format("%d %b %Y").to_string())
    .unwrap_or_else(|_| date.to_string())
}

/// Escape LIKE wildcards so user text matches literally (with `ESCAPE '\'`).
fn escape_like(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(ch);
  }
  out
}

/// Collapse runs of whitespace; `None` when fewer than two characters remain.
pub fn normalize_search_phrase(query: &str) -> Option<String> {
  let phrase = query.split_whitespace().collect::<Vec<_>>().join(" ");
  (phrase.chars().count() >= 2).then_some(phrase)
}

/// Parse a numeric filter; values that are not numbers are ignored.
fn numeric_filter(value: Option<&str>) -> Option<f64> {
  value.and_then(|v| v.trim().parse::<f64>().ok()).filter(|v| v.is_finite())
}

/// All properties with sale aggregates, newest listing first.
pub fn list_properties(conn: &Connection) -> Result<Vec<PropertySummary>> {
  let sql = format!(
    "SELECT {PROPERTY_COLUMNS},
       COUNT(ph.id), MAX(ph.date), MAX(ph.price)
     FROM properties p
     LEFT JOIN property_history ph ON p.id = ph.property_id
     GROUP BY p.id
     ORDER BY p.created_at DESC, p.id DESC"
  );

  let mut stmt = conn
    .prepare(&sql)
    .map_err(|e| eyre!("Failed to prepare property list: {}", e))?;

  let rows = stmt
    .query_map([], summary_from_row)
    .map_err(|e| eyre!("Failed to query properties: {}", e))?
    .collect::<rusqlite::Result<Vec<_>>>()
    .map_err(|e| eyre!("Failed to read property row: {}", e))?;

  Ok(rows)
}

/// One property with history (10 newest) and nearby schools (5 best rated).
pub fn find_property(conn: &Connection, id: i64) -> Result<Option<PropertyDetail>> {
  let sql = format!(
    "SELECT {PROPERTY_COLUMNS},
       COUNT(ph.id), AVG(ph.price), MAX(ph.date)
     FROM properties p
     LEFT JOIN property_history ph ON p.id = ph.property_id
     WHERE p.id = ?
     GROUP BY p.id"
  );

  let found = conn
    .query_row(&sql, params![id], |row| {
      Ok((
        property_from_row(row)?,
        row.get::<_, i64>(AGGREGATE_START)?,
        row.get::<_, Option<f64>>(AGGREGATE_START + 1)?,
        row.get::<_, Option<String>>(AGGREGATE_START + 2)?,
      ))
    })
    .optional()
    .map_err(|e| eyre!("Failed to query property {}: {}", id, e))?;

  let Some((property, history_count, avg_price, last_activity)) = found else {
    return Ok(None);
  };

  let mut history_stmt = conn
    .prepare(
      "SELECT id, property_id, date, price, event_type, agent
       FROM property_history
       WHERE property_id = ?
       ORDER BY date DESC
       LIMIT 10",
    )
    .map_err(|e| eyre!("Failed to prepare history query: {}", e))?;
  let history = history_stmt
    .query_map(params![id], sale_from_row)
    .map_err(|e| eyre!("Failed to query history: {}", e))?
    .collect::<rusqlite::Result<Vec<_>>>()
    .map_err(|e| eyre!("Failed to read sale record: {}", e))?;

  let mut schools_stmt = conn
    .prepare(
      "SELECT id, name, type, suburb, postcode, rating
       FROM schools
       WHERE suburb = ? OR postcode = ?
       ORDER BY rating DESC
       LIMIT 5",
    )
    .map_err(|e| eyre!("Failed to prepare schools query: {}", e))?;
  let nearby_schools = schools_stmt
    .query_map(params![property.suburb, property.postcode], school_from_row)
    .map_err(|e| eyre!("Failed to query nearby schools: {}", e))?
    .collect::<rusqlite::Result<Vec<_>>>()
    .map_err(|e| eyre!("Failed to read school row: {}", e))?;

  Ok(Some(PropertyDetail {
    full_address: Some(property.full_address()),
    price_formatted: Some(property.price_formatted()),
    property,
    history_count,
    avg_price,
    last_activity,
    history,
    nearby_schools,
  }))
}

/// Phrase and filter search, newest listing first, at most 50 rows.
pub fn search_properties(
  conn: &Connection,
  query: &str,
  filters: &SearchFilters,
) -> Result<Vec<PropertySummary>> {
  let mut conditions: Vec<String> = Vec::new();
  let mut values: Vec<SqlValue> = Vec::new();

  if let Some(phrase) = normalize_search_phrase(query) {
    conditions.push(format!("{ADDRESS_TEXT} LIKE ? ESCAPE '\\'"));
    values.push(SqlValue::Text(format!("%{}%", escape_like(&phrase))));
  }

  if let Some(t) = filters.property_type.as_deref().filter(|t| !t.is_empty()) {
    conditions.push("p.type = ?".to_string());
    values.push(SqlValue::Text(t.to_string()));
  }

  let numeric = [
    ("p.price >= ?", filters.min_price.as_deref()),
    ("p.price <= ?", filters.max_price.as_deref()),
    ("p.bedrooms >= ?", filters.bedrooms.as_deref()),
    ("p.bathrooms >= ?", filters.bathrooms.as_deref()),
  ];
  for (condition, raw) in numeric {
    if let Some(v) = numeric_filter(raw) {
      conditions.push(condition.to_string());
      values.push(SqlValue::Real(v));
    }
  }

  let where_clause = if conditions.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conditions.join(" AND "))
  };

  let sql = format!(
    "SELECT {PROPERTY_COLUMNS},
       COUNT(ph.id), MAX(ph.date), MAX(ph.price)
     FROM properties p
     LEFT JOIN property_history ph ON p.id = ph.property_id
     {where_clause}
     GROUP BY p.id
     ORDER BY p.created_at DESC, p.id DESC
     LIMIT {SEARCH_LIMIT}"
  );

  let mut stmt = conn
    .prepare(&sql)
    .map_err(|e| eyre!("Failed to prepare search: {}", e))?;

  let rows = stmt
    .query_map(params_from_iter(values), summary_from_row)
    .map_err(|e| eyre!("Failed to search properties: {}", e))?
    .collect::<rusqlite::Result<Vec<_>>>()
    .map_err(|e| eyre!("Failed to read property row: {}", e))?;

  Ok(rows)
}

/// Sale history for one property, newest first, with its address.
pub fn property_history(conn: &Connection, property_id: i64) -> Result<Vec<HistoryEntry>> {
  let mut stmt = conn
    .prepare(
      "SELECT ph.id, ph.property_id, ph.date, ph.price, ph.event_type, ph.agent,
         p.address, p.suburb, p.state, p.postcode
       FROM property_history ph
       JOIN properties p ON ph.property_id = p.id
       WHERE ph.property_id = ?
       ORDER BY ph.date DESC",
    )
    .map_err(|e| eyre!("Failed to prepare history query: {}", e))?;

  let rows = stmt
    .query_map(params![property_id], |row| {
      let record = sale_from_row(row)?;
      Ok(HistoryEntry {
        price_formatted: format_price(Some(record.price)),
        date_formatted: format_sale_date(&record.date),
        address: row.get(6)?,
        suburb: row.get(7)?,
        state: row.get(8)?,
        postcode: row.get(9)?,
        record,
      })
    })
    .map_err(|e| eyre!("Failed to query history: {}", e))?
    .collect::<rusqlite::Result<Vec<_>>>()
    .map_err(|e| eyre!("Failed to read sale record: {}", e))?;

  Ok(rows)
}

/// Market insights, newest first, at most 10 rows.
pub fn market_insights(conn: &Connection, suburb: Option<&str>) -> Result<Vec<MarketInsight>> {
  let (where_clause, values) = match suburb {
    Some(s) => ("WHERE suburb = ?", vec![SqlValue::Text(s.to_string())]),
    None => ("", Vec::new()),
  };

  let sql = format!(
    "SELECT id, suburb, state, median_price, price_growth, rental_yield, population, created_at
     FROM market_insights
     {where_clause}
     ORDER BY created_at DESC, id DESC
     LIMIT 10"
  );

  let mut stmt = conn
    .prepare(&sql)
    .map_err(|e| eyre!("Failed to prepare market insights query: {}", e))?;

  let rows = stmt
    .query_map(params_from_iter(values), |row| {
      Ok(MarketInsight {
        id: row.get(0)?,
        suburb: row.get(1)?,
        state: row.get(2)?,
        median_price: row.get(3)?,
        price_growth: row.get(4)?,
        rental_yield: row.get(5)?,
        population: row.get(6)?,
        created_at: row.get(7)?,
      })
    })
    .map_err(|e| eyre!("Failed to query market insights: {}", e))?
    .collect::<rusqlite::Result<Vec<_>>>()
    .map_err(|e| eyre!("Failed to read market insight: {}", e))?;

  Ok(rows)
}

/// Schools filtered by suburb and/or postcode, best rated first.
pub fn schools(
  conn: &Connection,
  suburb: Option<&str>,
  postcode: Option<&str>,
) -> Result<Vec<School>> {
  let mut conditions = Vec::new();
  let mut values = Vec::new();

  if let Some(s) = suburb {
    conditions.push("suburb = ?");
    values.push(SqlValue::Text(s.to_string()));
  }
  if let Some(p) = postcode {
    conditions.push("postcode = ?");
    values.push(SqlValue::Text(p.to_string()));
  }

  let where_clause = if conditions.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conditions.join(" AND "))
  };

  let sql = format!(
    "SELECT id, name, type, suburb, postcode, rating
     FROM schools
     {where_clause}
     ORDER BY rating DESC, name ASC"
  );

  let mut stmt = conn
    .prepare(&sql)
    .map_err(|e| eyre!("Failed to prepare schools query: {}", e))?;

  let rows = stmt
    .query_map(params_from_iter(values), school_from_row)
    .map_err(|e| eyre!("Failed to query schools: {}", e))?
    .collect::<rusqlite::Result<Vec<_>>>()
    .map_err(|e| eyre!("Failed to read school row: {}", e))?;

  Ok(rows)
}

/// Aggregate counts and price range over all properties.
pub fn property_stats(conn: &Connection) -> Result<PropertyStats> {
  conn
    .query_row(
      "SELECT COUNT(*), AVG(price), MIN(price), MAX(price),
         COUNT(DISTINCT suburb), COUNT(DISTINCT state)
       FROM properties",
      [],
      |row| {
        Ok(PropertyStats {
          total_properties: row.get(0)?,
          average_price: row.get(1)?,
          min_price: row.get(2)?,
          max_price: row.get(3)?,
          total_suburbs: row.get(4)?,
          total_states: row.get(5)?,
        })
      },
    )
    .map_err(|e| eyre!("Failed to query property stats: {}", e))
}

/// Latest `updated_at` across properties, used for `Last-Modified`/`ETag`.
pub fn properties_last_modified(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
  let latest: Option<String> = conn
    .query_row("SELECT MAX(updated_at) FROM properties", [], |row| row.get(0))
    .map_err(|e| eyre!("Failed to query last modification time: {}", e))?;

  Ok(latest.and_then(|s| {
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
      .ok()
      .map(|dt| dt.and_utc())
  }))
}

/// Connectivity probe reported by the health route.
pub fn probe(conn: &Connection) -> DatabaseCheck {
  match conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)) {
    Ok(result) => DatabaseCheck {
      status: "success".to_string(),
      message: "Database connected successfully!".to_string(),
      server_info: Some(format!("SQLite {}", rusqlite::version())),
      test_result: Some(result),
    },
    Err(e) => DatabaseCheck {
      status: "error".to_string(),
      message: e.to_string(),
      server_info: None,
      test_result: None,
    },
  }
}
