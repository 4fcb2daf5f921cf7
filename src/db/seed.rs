//! Demo listings for local development (`flint seed`).

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};

struct SeedProperty {
  id: i64,
  address: &'static str,
  suburb: &'static str,
  state: &'static str,
  postcode: &'static str,
  property_type: &'static str,
  price: Option<i64>,
  bedrooms: u32,
  bathrooms: u32,
  parking_spaces: u32,
  features: &'static str,
  images: &'static str,
  coordinates: &'static str,
  created_at: &'static str,
}

const PROPERTIES: &[SeedProperty] = &[
  SeedProperty {
    id: 1,
    address: "24 Arthur Street",
    suburb: "Woody Point",
    state: "QLD",
    postcode: "4019",
    property_type: "House",
    price: Some(850_000),
    bedrooms: 4,
    bathrooms: 2,
    parking_spaces: 2,
    features: r#"["Air Conditioning","Built-in Wardrobes","Garden"]"#,
    images: r#"["/assets/images/sample-property-1.jpg"]"#,
    coordinates: r#"{"lat":-27.2631,"lng":153.1097}"#,
    created_at: "2025-08-01 09:00:00",
  },
  SeedProperty {
    id: 2,
    address: "15 Marine Parade",
    suburb: "Redcliffe",
    state: "QLD",
    postcode: "4020",
    property_type: "House",
    price: Some(920_000),
    bedrooms: 3,
    bathrooms: 2,
    parking_spaces: 2,
    features: r#"["Modern Kitchen","Large Backyard","Double Garage"]"#,
    images: r#"["/assets/images/sample-property-2.jpg"]"#,
    coordinates: r#"{"lat":-27.2308,"lng":153.1106}"#,
    created_at: "2025-08-02 09:00:00",
  },
  SeedProperty {
    id: 3,
    address: "7/102 Oxley Avenue",
    suburb: "Woody Point",
    state: "QLD",
    postcode: "4019",
    property_type: "Unit",
    price: Some(615_000),
    bedrooms: 2,
    bathrooms: 1,
    parking_spaces: 1,
    features: r#"["Ocean Views","Balcony"]"#,
    images: "[]",
    coordinates: r#"{"lat":-27.2619,"lng":153.1042}"#,
    created_at: "2025-08-03 09:00:00",
  },
  SeedProperty {
    id: 4,
    address: "3 Point Court",
    suburb: "Margate",
    state: "QLD",
    postcode: "4019",
    property_type: "Townhouse",
    price: None,
    bedrooms: 3,
    bathrooms: 2,
    parking_spaces: 1,
    features: r#"["Courtyard"]"#,
    images: "[]",
    coordinates: "{}",
    created_at: "2025-08-04 09:00:00",
  },
];

/// (property_id, date, price, event_type, agent)
const HISTORY: &[(i64, &str, i64, &str, &str)] = &[
  (1, "2019-06-14", 640_000, "Sold", "Ray White Redcliffe"),
  (1, "2012-03-02", 455_000, "Sold", "LJ Hooker Clontarf"),
  (2, "2016-11-20", 710_000, "Sold", "Ray White Redcliffe"),
  (3, "2021-02-08", 480_000, "Sold", "Harcourts Redcliffe"),
];

/// (name, type, suburb, postcode, rating)
const SCHOOLS: &[(&str, &str, &str, &str, f64)] = &[
  ("Woody Point Special School", "Special", "Woody Point", "4019", 7.8),
  ("Clontarf Beach State School", "Primary", "Clontarf", "4019", 8.4),
  ("Redcliffe State High School", "Secondary", "Redcliffe", "4020", 8.1),
  ("Humpybong State School", "Primary", "Margate", "4019", 7.5),
];

/// (suburb, state, median_price, price_growth, rental_yield, population, created_at)
const INSIGHTS: &[(&str, &str, i64, f64, f64, i64, &str)] = &[
  ("Woody Point", "QLD", 720_000, 8.5, 4.2, 5200, "2025-07-01 00:00:00"),
  ("Redcliffe", "QLD", 780_000, 7.1, 4.0, 10_300, "2025-07-01 00:00:00"),
  ("Margate", "QLD", 690_000, 6.4, 4.4, 7_900, "2025-06-01 00:00:00"),
];

/// Replace all portal data with the demo data set.
pub fn load_demo_data(conn: &Connection) -> Result<()> {
  let tx = conn
    .unchecked_transaction()
    .map_err(|e| eyre!("Failed to start seed transaction: {}", e))?;

  tx
    .execute_batch(
      "DELETE FROM property_history; DELETE FROM schools;
       DELETE FROM market_insights; DELETE FROM properties;",
    )
    .map_err(|e| eyre!("Failed to clear portal tables: {}", e))?;

  for p in PROPERTIES {
    tx
      .execute(
        "INSERT INTO properties (id, address, suburb, state, postcode, type, price, bedrooms,
           bathrooms, parking_spaces, features, images, coordinates, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
        params![
          p.id,
          p.address,
          p.suburb,
          p.state,
          p.postcode,
          p.property_type,
          p.price,
          p.bedrooms,
          p.bathrooms,
          p.parking_spaces,
          p.features,
          p.images,
          p.coordinates,
          p.created_at,
        ],
      )
      .map_err(|e| eyre!("Failed to insert property {}: {}", p.id, e))?;
  }

  for (property_id, date, price, event_type, agent) in HISTORY {
    tx
      .execute(
        "INSERT INTO property_history (property_id, date, price, event_type, agent)
         VALUES (?, ?, ?, ?, ?)",
        params![property_id, date, price, event_type, agent],
      )
      .map_err(|e| eyre!("Failed to insert sale record: {}", e))?;
  }

  for (name, school_type, suburb, postcode, rating) in SCHOOLS {
    tx
      .execute(
        "INSERT INTO schools (name, type, suburb, postcode, rating) VALUES (?, ?, ?, ?, ?)",
        params![name, school_type, suburb, postcode, rating],
      )
      .map_err(|e| eyre!("Failed to insert school: {}", e))?;
  }

  for (suburb, state, median, growth, rental_yield, population, created_at) in INSIGHTS {
    tx
      .execute(
        "INSERT INTO market_insights
           (suburb, state, median_price, price_growth, rental_yield, population, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![suburb, state, median, growth, rental_yield, population, created_at],
      )
      .map_err(|e| eyre!("Failed to insert market insight: {}", e))?;
  }

  tx
    .commit()
    .map_err(|e| eyre!("Failed to commit demo data: {}", e))?;

  tracing::info!(
    properties = PROPERTIES.len(),
    sales = HISTORY.len(),
    schools = SCHOOLS.len(),
    insights = INSIGHTS.len(),
    "Loaded demo data"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;

  #[test]
  fn test_load_demo_data_is_repeatable() {
    let db = Database::open_in_memory().unwrap();
    load_demo_data(db.conn()).unwrap();
    load_demo_data(db.conn()).unwrap();

    let count: i64 = db
      .conn()
      .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))
      .unwrap();
    assert_eq!(count, PROPERTIES.len() as i64);

    let sales: i64 = db
      .conn()
      .query_row("SELECT COUNT(*) FROM property_history", [], |row| row.get(0))
      .unwrap();
    assert_eq!(sales, HISTORY.len() as i64);
  }

  #[test]
  fn test_failed_reseed_keeps_previous_data() {
    let db = Database::open_in_memory().unwrap();
    load_demo_data(db.conn()).unwrap();
    db
      .conn()
      .execute_batch(
        "CREATE TRIGGER reject_schools BEFORE INSERT ON schools
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
      )
      .unwrap();

    assert!(load_demo_data(db.conn()).is_err());

    let count = |table: &str| -> i64 {
      db
        .conn()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
    };
    assert_eq!(count("properties"), PROPERTIES.len() as i64);
    assert_eq!(count("property_history"), HISTORY.len() as i64);
    assert_eq!(count("schools"), SCHOOLS.len() as i64);
  }
}
