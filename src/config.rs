use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub client: ClientConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  /// Decide per request from the Host header: local hosts are development
  #[default]
  Auto,
  Production,
  Development,
}

/// Hosts treated as development when the environment is `auto`.
const DEV_HOSTS: &[&str] = &[
  "localhost",
  "127.0.0.1",
  "::1",
  "localhost:3000",
  "localhost:8000",
];

impl Environment {
  /// Resolve to production or not for a request carrying `host`.
  pub fn is_production(self, host: Option<&str>) -> bool {
    match self {
      Environment::Production => true,
      Environment::Development => false,
      Environment::Auto => match host {
        Some(h) => !DEV_HOSTS.contains(&h),
        None => true,
      },
    }
  }

  fn parse(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "auto" => Some(Environment::Auto),
      "production" | "prod" => Some(Environment::Production),
      "development" | "dev" => Some(Environment::Development),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: String,
  #[serde(default)]
  pub environment: Environment,
  /// SQLite database file (default: $XDG_DATA_HOME/flint/portal.db)
  pub database: Option<PathBuf>,
  /// Prefix stripped from request paths before routing (e.g. "api")
  #[serde(default)]
  pub base_path: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: default_bind(),
      environment: Environment::default(),
      database: None,
      base_path: String::new(),
    }
  }
}

fn default_bind() -> String {
  "127.0.0.1:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_true")]
  pub cache_enabled: bool,
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs: u64,
  #[serde(default = "default_retry_attempts")]
  pub retry_attempts: u32,
  #[serde(default = "default_retry_delay_ms")]
  pub retry_delay_ms: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      cache_enabled: true,
      cache_ttl_secs: default_cache_ttl_secs(),
      retry_attempts: default_retry_attempts(),
      retry_delay_ms: default_retry_delay_ms(),
    }
  }
}

impl ClientConfig {
  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache_ttl_secs)
  }

  pub fn retry_delay(&self) -> Duration {
    Duration::from_millis(self.retry_delay_ms)
  }
}

fn default_base_url() -> String {
  "http://127.0.0.1:8080".to_string()
}

fn default_true() -> bool {
  true
}

fn default_cache_ttl_secs() -> u64 {
  300
}

fn default_retry_attempts() -> u32 {
  3
}

fn default_retry_delay_ms() -> u64 {
  1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_level")]
  pub level: String,
  /// When set, logs are also written as JSON to a daily file in this directory
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_level(),
      directory: None,
    }
  }
}

fn default_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file, falling back to defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./flint.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/flint/config.yaml
  ///
  /// Environment overrides are applied last.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.apply_env_overrides()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("flint.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("flint").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Apply FLINT_API_URL, FLINT_ENVIRONMENT and FLINT_DATABASE.
  fn apply_env_overrides(&mut self) -> Result<()> {
    if let Ok(url) = std::env::var("FLINT_API_URL") {
      self.client.base_url = url;
    }

    if let Ok(env) = std::env::var("FLINT_ENVIRONMENT") {
      self.server.environment = Environment::parse(&env)
        .ok_or_else(|| eyre!("Invalid FLINT_ENVIRONMENT value: {}", env))?;
    }

    if let Ok(db) = std::env::var("FLINT_DATABASE") {
      self.server.database = Some(PathBuf::from(db));
    }

    Ok(())
  }

  /// Database path from config, or the default data directory location.
  pub fn database_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.server.database {
      return Ok(path.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("flint").join("portal.db"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults_match_client_policy() {
    let config = Config::default();
    assert_eq!(config.client.cache_ttl(), Duration::from_secs(300));
    assert_eq!(config.client.retry_attempts, 3);
    assert_eq!(config.client.retry_delay(), Duration::from_millis(1000));
    assert!(config.client.cache_enabled);
    assert_eq!(config.server.environment, Environment::Auto);
  }

  #[test]
  fn test_load_from_path_fills_missing_sections() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "server:\n  bind: 0.0.0.0:9000\n  environment: production\nclient:\n  retry_attempts: 5"
    )
    .unwrap();

    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.server.bind, "0.0.0.0:9000");
    assert_eq!(config.server.environment, Environment::Production);
    assert_eq!(config.client.retry_attempts, 5);
    assert_eq!(config.client.cache_ttl_secs, 300);
    assert_eq!(config.logging.level, "info");
  }

  #[test]
  fn test_explicit_missing_path_is_an_error() {
    let result = Config::load(Some(Path::new("/definitely/not/here/flint.yaml")));
    assert!(result.is_err());
  }

  #[test]
  fn test_invalid_yaml_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "server: [not, a, map").unwrap();
    assert!(Config::load_from_path(file.path()).is_err());
  }

  #[test]
  fn test_auto_environment_uses_host() {
    let env = Environment::Auto;
    assert!(!env.is_production(Some("localhost")));
    assert!(!env.is_production(Some("localhost:8000")));
    assert!(env.is_production(Some("flint.example.com")));
    assert!(env.is_production(None));
    assert!(Environment::Production.is_production(Some("localhost")));
    assert!(!Environment::Development.is_production(Some("flint.example.com")));
  }

  #[test]
  fn test_environment_parse() {
    assert_eq!(Environment::parse("PROD"), Some(Environment::Production));
    assert_eq!(Environment::parse("development"), Some(Environment::Development));
    assert_eq!(Environment::parse("staging"), None);
  }

  #[test]
  fn test_configured_database_path_wins() {
    let mut config = Config::default();
    config.server.database = Some(PathBuf::from("/tmp/portal.db"));
    assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/portal.db"));
  }
}
