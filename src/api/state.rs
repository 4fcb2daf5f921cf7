use std::sync::Arc;

use color_eyre::Result;

use crate::config::{Config, Environment};
use crate::db::DbHandle;

/// Shared server state: the lazily opened database and routing settings.
#[derive(Clone)]
pub struct AppState {
  pub db: Arc<DbHandle>,
  pub environment: Environment,
  pub base_path: String,
}

impl AppState {
  pub fn new(db: DbHandle, environment: Environment, base_path: impl Into<String>) -> Self {
    Self {
      db: Arc::new(db),
      environment,
      base_path: base_path.into(),
    }
  }

  /// State for `config`; the database file is not opened until the first request.
  pub fn from_config(config: &Config) -> Result<Self> {
    let path = config.database_path()?;
    Ok(Self::new(
      DbHandle::lazy(path),
      config.server.environment,
      config.server.base_path.clone(),
    ))
  }
}
