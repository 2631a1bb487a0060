//! Configuration for transport defaults, batching, and collection limits.

use std::{path::PathBuf, sync::OnceLock};

use directories::BaseDirs;
use figment::{
   Figment,
   providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

static CONFIG: OnceLock<Config> = OnceLock::new();

pub const MAX_FILE_SIZE_BYTES_CAP: u64 = 10_485_760;
pub const UPLOAD_BATCH_SIZE_CAP: usize = 100;
pub const MIN_POLL_INTERVAL_MS: u64 = 250;

/// Application configuration loaded from the config file and environment
/// variables (prefix `TETHER_`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
   pub backend_url: String,
   pub auth_token:  String,
   pub user_id:     String,

   pub upload_batch_size:    usize,
   pub poll_interval_ms:     u64,
   pub max_file_size_bytes:  u64,
   pub request_timeout_secs: u64,
}

impl Default for Config {
   fn default() -> Self {
      Self {
         backend_url: "http://localhost:3000".to_string(),
         auth_token: String::new(),
         user_id: "local".to_string(),
         upload_batch_size: 20,
         poll_interval_ms: 2000,
         max_file_size_bytes: 1_048_576,
         request_timeout_secs: 30,
      }
   }
}

impl Config {
   /// Batch size clamped to a sane range; the server sizes its own work
   /// queues around this.
   pub fn effective_upload_batch_size(&self) -> usize {
      self.upload_batch_size.clamp(1, UPLOAD_BATCH_SIZE_CAP)
   }

   pub fn effective_poll_interval_ms(&self) -> u64 {
      self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS)
   }

   pub fn effective_max_file_size_bytes(&self) -> u64 {
      self.max_file_size_bytes.min(MAX_FILE_SIZE_BYTES_CAP)
   }
}

/// Location of the user-level config file.
pub fn config_path() -> Result<PathBuf, ConfigError> {
   let dirs = BaseDirs::new().ok_or(ConfigError::GetUserDirectories)?;
   Ok(dirs.config_dir().join("tether").join("config.toml"))
}

/// Loads configuration: defaults, then the config file, then environment.
pub fn load() -> Result<Config, ConfigError> {
   let mut figment = Figment::from(Serialized::defaults(Config::default()));
   if let Ok(path) = config_path() {
      figment = figment.merge(Toml::file(path));
   }
   let config: Config = figment.merge(Env::prefixed("TETHER_")).extract()?;
   if config.backend_url.is_empty() {
      return Err(ConfigError::Invalid("backend_url must not be empty".to_string()));
   }
   Ok(config)
}

/// Installs an explicit configuration (CLI overrides, tests). A no-op if
/// configuration was already initialized.
pub fn init(config: Config) {
   let _ = CONFIG.set(config);
}

/// Returns the process-wide configuration, loading it on first use.
pub fn get() -> &'static Config {
   CONFIG.get_or_init(|| {
      load().unwrap_or_else(|e| {
         tracing::warn!("falling back to default config: {}", e);
         Config::default()
      })
   })
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn batch_size_is_clamped() {
      let config = Config { upload_batch_size: 0, ..Config::default() };
      assert_eq!(config.effective_upload_batch_size(), 1);

      let config = Config { upload_batch_size: 10_000, ..Config::default() };
      assert_eq!(config.effective_upload_batch_size(), UPLOAD_BATCH_SIZE_CAP);
   }

   #[test]
   fn file_size_cap_applies() {
      let config = Config { max_file_size_bytes: u64::MAX, ..Config::default() };
      assert_eq!(config.effective_max_file_size_bytes(), MAX_FILE_SIZE_BYTES_CAP);
   }

   #[test]
   fn defaults_match_protocol() {
      let config = Config::default();
      assert_eq!(config.upload_batch_size, 20);
      assert_eq!(config.poll_interval_ms, 2000);
      assert_eq!(config.max_file_size_bytes, 1_048_576);
   }
}
