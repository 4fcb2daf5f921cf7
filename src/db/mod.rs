pub mod queries;
pub mod schema;
pub mod seed;

use color_eyre::{eyre::eyre, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Portal database connection
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create the database at `path`
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    let db = Self { conn };
    db.run_migrations()?;

    Ok(db)
  }

  /// Open a private in-memory database with the schema applied
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;

    let db = Self { conn };
    db.run_migrations()?;

    Ok(db)
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    self
      .conn
      .execute_batch(schema::SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(())
  }

  /// Get a reference to the connection
  pub fn conn(&self) -> &Connection {
    &self.conn
  }
}

/// Shared connection handle for the server.
///
/// The file is opened on first use and the connection is then reused for
/// every later request. A failed open is reported to the caller and retried
/// on the next call.
pub struct DbHandle {
  path: Option<PathBuf>,
  db: Mutex<Option<Database>>,
}

impl DbHandle {
  /// Handle that opens `path` lazily.
  pub fn lazy(path: PathBuf) -> Self {
    Self {
      path: Some(path),
      db: Mutex::new(None),
    }
  }

  /// Handle around an already open database.
  pub fn from_database(db: Database) -> Self {
    Self {
      path: None,
      db: Mutex::new(Some(db)),
    }
  }

  /// Run `f` against the connection, opening it first if needed.
  pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    // A panic in another caller leaves the connection usable
    let mut guard = self.db.lock().unwrap_or_else(|e| e.into_inner());

    if guard.is_none() {
      let path = self
        .path
        .as_deref()
        .ok_or_else(|| eyre!("Database connection is not available"))?;
      tracing::info!(path = %path.display(), "Opening portal database");
      *guard = Some(Database::open(path)?);
    }

    match guard.as_ref() {
      Some(db) => f(db.conn()),
      None => Err(eyre!("Database connection is not available")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_open_creates_parent_directories() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("portal.db");

    let db = Database::open(&path).unwrap();
    let count: i64 = db
      .conn()
      .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))
      .unwrap();

    assert!(path.exists());
    assert_eq!(count, 0);
  }

  #[test]
  fn test_migrations_are_idempotent() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("portal.db");

    Database::open(&path).unwrap();
    assert!(Database::open(&path).is_ok());
  }

  #[test]
  fn test_lazy_handle_opens_on_first_use() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("lazy.db");
    let handle = DbHandle::lazy(path.clone());

    assert!(!path.exists());
    let one: i64 = handle
      .with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get(0))?))
      .unwrap();
    assert_eq!(one, 1);
    assert!(path.exists());
  }

  #[test]
  fn test_lazy_handle_reports_open_failure() {
    let dir = tempfile::TempDir::new().unwrap();
    // A directory cannot be opened as a database file
    let handle = DbHandle::lazy(dir.path().to_path_buf());

    let result = handle.with_conn(|_| Ok(()));
    assert!(result.is_err());
  }

  #[test]
  fn test_handle_survives_panic_in_caller() {
    let handle = std::sync::Arc::new(DbHandle::from_database(Database::open_in_memory().unwrap()));

    let worker = std::sync::Arc::clone(&handle);
    let joined = std::thread::spawn(move || {
      worker.with_conn(|_| -> Result<()> { panic!("handler panicked") })
    })
    .join();
    assert!(joined.is_err());

    let one: i64 = handle
      .with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get(0))?))
      .unwrap();
    assert_eq!(one, 1);
  }
}
