/// Portal schema. `features`, `images` and `coordinates` hold JSON text.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id INTEGER PRIMARY KEY,
    address TEXT NOT NULL,
    suburb TEXT NOT NULL,
    state TEXT NOT NULL,
    postcode TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT 'House',
    price INTEGER,
    bedrooms INTEGER NOT NULL DEFAULT 0,
    bathrooms INTEGER NOT NULL DEFAULT 0,
    parking_spaces INTEGER,
    land_area REAL,
    floor_area REAL,
    year_built INTEGER,
    description TEXT,
    features TEXT,
    images TEXT,
    coordinates TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_properties_suburb ON properties(suburb);

CREATE TABLE IF NOT EXISTS property_history (
    id INTEGER PRIMARY KEY,
    property_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    price INTEGER NOT NULL,
    event_type TEXT,
    agent TEXT,
    FOREIGN KEY (property_id) REFERENCES properties(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_property_history_property ON property_history(property_id);

CREATE TABLE IF NOT EXISTS schools (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    type TEXT,
    suburb TEXT NOT NULL,
    postcode TEXT NOT NULL,
    rating REAL
);

CREATE TABLE IF NOT EXISTS market_insights (
    id INTEGER PRIMARY KEY,
    suburb TEXT NOT NULL,
    state TEXT NOT NULL,
    median_price INTEGER,
    price_growth REAL,
    rental_yield REAL,
    population INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
