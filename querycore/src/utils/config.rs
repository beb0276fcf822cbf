// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::utils::io::get_joined_path;

const DEFAULT_CONFIG_FILE_NAME: &str = "default.toml";
const DEFAULT_STATE_CHANNEL_CAPACITY: usize = 1;
const DEFAULT_STATE_SEND_TIMEOUT_MS: u64 = 30000;

#[derive(Debug, Clone, Deserialize)]
/// Settings for query execution.
pub struct QuerySettings {
  state_channel_capacity: usize,
  state_send_timeout_ms: u64,
  log_query_structures: bool,
}

impl QuerySettings {
  /// Create QuerySettings with the given values.
  pub fn new_with_params(
    state_channel_capacity: usize,
    state_send_timeout_ms: u64,
    log_query_structures: bool,
  ) -> Self {
    QuerySettings {
      state_channel_capacity,
      state_send_timeout_ms,
      log_query_structures,
    }
  }

  /// Get the capacity of the state channel handed to async query callers.
  /// A bounded channel needs a capacity of at least one.
  pub fn get_state_channel_capacity(&self) -> usize {
    self.state_channel_capacity.max(1)
  }

  /// Get how long a background query waits for its consumer to accept an event.
  pub fn get_state_send_timeout(&self) -> Duration {
    Duration::from_millis(self.state_send_timeout_ms)
  }

  /// Whether query structures are logged as JSON for diagnostics.
  pub fn get_log_query_structures(&self) -> bool {
    self.log_query_structures
  }
}

impl Default for QuerySettings {
  fn default() -> Self {
    Self::new_with_params(
      DEFAULT_STATE_CHANNEL_CAPACITY,
      DEFAULT_STATE_SEND_TIMEOUT_MS,
      false,
    )
  }
}

#[derive(Debug, Deserialize)]
/// Settings for querycore, read from config file.
pub struct Settings {
  query: QuerySettings,
}

impl Settings {
  /// Create Settings from given configuration directory path.
  pub fn new(config_dir_path: &str) -> Result<Self, ConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
    let config_default_file_name = get_joined_path(config_dir_path, DEFAULT_CONFIG_FILE_NAME);
    let config_environment_file_name =
      get_joined_path(config_dir_path, &format!("{}.toml", run_mode));

    let config = Config::builder()
      // Start off by merging in the "default" configuration file
      .add_source(File::with_name(&config_default_file_name))
      // Add in the current environment file, which is optional
      .add_source(File::with_name(&config_environment_file_name).required(false))
      // Add in settings from the environment (with a prefix of QUERYCORE)
      // Eg.. `QUERYCORE_QUERY__STATE_CHANNEL_CAPACITY=4` would set the capacity
      .add_source(
        Environment::with_prefix("querycore")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?;

    config.try_deserialize()
  }

  /// Get query settings.
  pub fn get_query_settings(&self) -> &QuerySettings {
    &self.query
  }
}
