//! Configuration module for the transactor.
//!
//! This module provides structures and utilities for managing transactor
//! configuration. It supports loading configuration from TOML files, resolving
//! `${VAR}` and `${VAR:-default}` environment references, and validates that
//! all values are usable before anything is submitted.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use transactor_types::{parse_gwei, SecretString, DEFAULT_PUSH_NETWORKS};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the transactor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Connection to the network transactions are sent to.
	pub network: NetworkConfig,
	/// Submission defaults.
	#[serde(default)]
	pub transactor: TransactorConfig,
	/// Confirmation watcher settings.
	#[serde(default)]
	pub watcher: WatcherConfig,
	/// Push notification settings.
	#[serde(default)]
	pub notify: NotifyConfig,
}

/// Connection settings for the target network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// HTTP(S) JSON-RPC endpoint.
	pub rpc_url: String,
	/// Key used to sign submitted transactions.
	/// Leave unset (or blank) for a watch-only setup.
	pub private_key: Option<SecretString>,
	/// Interval in milliseconds at which the RPC client polls for new blocks.
	#[serde(default = "default_rpc_poll_interval_ms")]
	pub rpc_poll_interval_ms: u64,
}

impl NetworkConfig {
	/// Returns the configured private key, treating a blank value as absent.
	pub fn signing_key(&self) -> Option<&SecretString> {
		self.private_key.as_ref().filter(|key| !key.is_empty())
	}
}

/// Submission defaults applied to outgoing transactions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactorConfig {
	/// Gas price used when a request doesn't set one, as a decimal gwei amount.
	/// Defaults to "4.1".
	#[serde(default = "default_gas_price_gwei")]
	pub default_gas_price_gwei: String,
	/// Gas limit used when a request doesn't set one.
	/// Defaults to 120000.
	#[serde(default = "default_gas_limit")]
	pub default_gas_limit: u64,
	/// Block explorer base URL overriding the one derived from the network.
	pub explorer_url: Option<String>,
	/// Whether `send` waits for the first confirmation before returning.
	#[serde(default = "default_true")]
	pub wait_for_finalization: bool,
	/// Upper bound on the finalization wait in seconds.
	#[serde(default = "default_finalization_timeout_seconds")]
	pub finalization_timeout_seconds: u64,
}

impl TransactorConfig {
	/// Returns the default gas price in wei.
	///
	/// Falls back to 4.1 gwei if the configured amount doesn't parse, which
	/// validation already rules out for loaded configurations.
	pub fn default_gas_price_wei(&self) -> u128 {
		parse_gwei(&self.default_gas_price_gwei).unwrap_or(4_100_000_000)
	}

	pub fn finalization_timeout(&self) -> Duration {
		Duration::from_secs(self.finalization_timeout_seconds)
	}
}

impl Default for TransactorConfig {
	fn default() -> Self {
		Self {
			default_gas_price_gwei: default_gas_price_gwei(),
			default_gas_limit: default_gas_limit(),
			explorer_url: None,
			wait_for_finalization: true,
			finalization_timeout_seconds: default_finalization_timeout_seconds(),
		}
	}
}

/// Upper bound for `watcher.poll_interval_ms` (one hour).
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;

/// Settings for the confirmation watcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherConfig {
	/// Interval between receipt queries in the poll loop.
	/// Defaults to 500 milliseconds.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Overall deadline for a single watch in seconds.
	/// Defaults to 3600 seconds (1 hour).
	#[serde(default = "default_watch_timeout_seconds")]
	pub timeout_seconds: u64,
	/// Maximum number of receipt queries before giving up.
	/// Unset means only the deadline applies.
	pub max_poll_attempts: Option<u64>,
}

impl WatcherConfig {
	/// Poll interval, capped at `MAX_POLL_INTERVAL_MS`.
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms.min(MAX_POLL_INTERVAL_MS))
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}
}

impl Default for WatcherConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: default_poll_interval_ms(),
			timeout_seconds: default_watch_timeout_seconds(),
			max_poll_attempts: None,
		}
	}
}

/// Settings for the push notification channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
	/// Whether the push channel is used at all.
	#[serde(default = "default_true")]
	pub enabled: bool,
	/// Chain IDs the push channel can track.
	#[serde(default = "default_supported_networks")]
	pub supported_networks: Vec<u64>,
}

impl NotifyConfig {
	/// Returns true if the push channel may be used for `chain_id`.
	pub fn supports(&self, chain_id: u64) -> bool {
		self.enabled && self.supported_networks.contains(&chain_id)
	}
}

impl Default for NotifyConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			supported_networks: default_supported_networks(),
		}
	}
}

fn default_gas_price_gwei() -> String {
	"4.1".to_string()
}

fn default_gas_limit() -> u64 {
	120_000
}

fn default_true() -> bool {
	true
}

fn default_finalization_timeout_seconds() -> u64 {
	120
}

fn default_rpc_poll_interval_ms() -> u64 {
	7_000
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_watch_timeout_seconds() -> u64 {
	3_600 // 1 hour
}

fn default_supported_networks() -> Vec<u64> {
	DEFAULT_PUSH_NETWORKS.to_vec()
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all values are usable.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.network.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation("network.rpc_url cannot be empty".into()));
		}
		if self.network.rpc_poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"network.rpc_poll_interval_ms must be greater than 0".into(),
			));
		}

		parse_gwei(&self.transactor.default_gas_price_gwei).map_err(|e| {
			ConfigError::Validation(format!("transactor.default_gas_price_gwei: {}", e))
		})?;
		if self.transactor.default_gas_limit == 0 {
			return Err(ConfigError::Validation(
				"transactor.default_gas_limit must be greater than 0".into(),
			));
		}
		if let Some(url) = &self.transactor.explorer_url {
			if !url.starts_with("http://") && !url.starts_with("https://") {
				return Err(ConfigError::Validation(format!(
					"transactor.explorer_url must be an http(s) URL, got '{}'",
					url
				)));
			}
		}
		if self.transactor.wait_for_finalization && self.transactor.finalization_timeout_seconds == 0
		{
			return Err(ConfigError::Validation(
				"transactor.finalization_timeout_seconds must be greater than 0".into(),
			));
		}

		if self.watcher.poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"watcher.poll_interval_ms must be greater than 0".into(),
			));
		}
		if self.watcher.poll_interval_ms > MAX_POLL_INTERVAL_MS {
			return Err(ConfigError::Validation(format!(
				"watcher.poll_interval_ms must be at most {}",
				MAX_POLL_INTERVAL_MS
			)));
		}
		if self.watcher.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"watcher.timeout_seconds must be greater than 0".into(),
			));
		}
		if self.watcher.max_poll_attempts == Some(0) {
			return Err(ConfigError::Validation(
				"watcher.max_poll_attempts must be greater than 0 when set".into(),
			));
		}

		let mut seen = HashSet::new();
		for chain_id in &self.notify.supported_networks {
			if !seen.insert(chain_id) {
				return Err(ConfigError::Validation(format!(
					"Duplicate chain id {} in notify.supported_networks",
					chain_id
				)));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
