// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use super::error::ConfigError;
use super::layer::AuthzConfigLayer;
use super::sections::{ClusterConfigLayer, LoggingConfigLayer, PolicyConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<AuthzConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<AuthzConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(AuthzConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/loom/authz.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<AuthzConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(AuthzConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: AuthzConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: LOOM_AUTHZ_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<AuthzConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(AuthzConfigLayer {
			policy: Some(load_policy_from_env()?),
			cluster: Some(load_cluster_from_env()),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| parse_bool(&v))
}

fn env_parsed<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	env_var(name).map(|v| parse_value(name, &v)).transpose()
}

fn parse_bool(value: &str) -> bool {
	value.eq_ignore_ascii_case("true") || value == "1"
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
	value.parse().map_err(|_| ConfigError::InvalidValue {
		key: name.to_string(),
		message: format!("invalid numeric value '{value}'"),
	})
}

fn load_policy_from_env() -> Result<PolicyConfigLayer, ConfigError> {
	Ok(PolicyConfigLayer {
		timeout_ms: env_parsed("LOOM_AUTHZ_POLICY_TIMEOUT_MS")?,
		cache_capacity: env_parsed("LOOM_AUTHZ_POLICY_CACHE_CAPACITY")?,
	})
}

fn load_cluster_from_env() -> ClusterConfigLayer {
	ClusterConfigLayer {
		local_name: env_var("LOOM_AUTHZ_LOCAL_CLUSTER"),
		multicluster_enabled: env_bool("LOOM_AUTHZ_MULTICLUSTER_ENABLED"),
	}
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("LOOM_AUTHZ_LOG_LEVEL"),
		json: env_bool("LOOM_AUTHZ_LOG_JSON"),
	}
}
