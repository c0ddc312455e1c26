// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the authorizer.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`LOOM_AUTHZ_*`)
//! 2. Config file (`/etc/loom/authz.toml`)
//! 3. Built-in defaults
//!
//! ```toml
//! [policy]
//! timeout_ms = 1000
//! cache_capacity = 256
//!
//! [cluster]
//! local_name = "cluster-home"
//! multicluster_enabled = true
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

use std::path::PathBuf;

use tracing::{debug, info};

pub use error::ConfigError;
pub use layer::AuthzConfigLayer;
pub use sections::{
	ClusterConfig, ClusterConfigLayer, LoggingConfig, LoggingConfigLayer, PolicyConfig,
	PolicyConfigLayer, DEFAULT_POLICY_TIMEOUT_MS,
};
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

/// Fully resolved authorizer configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthzSettings {
	pub policy: PolicyConfig,
	pub cluster: ClusterConfig,
	pub logging: LoggingConfig,
}

/// Load settings from all sources with standard precedence.
pub fn load_settings() -> Result<AuthzSettings, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load settings with a custom config file path.
pub fn load_settings_with_file(
	config_path: impl Into<PathBuf>,
) -> Result<AuthzSettings, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<AuthzSettings, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AuthzConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize a merged layer into validated settings.
pub fn finalize(layer: AuthzConfigLayer) -> Result<AuthzSettings, ConfigError> {
	if layer.policy.as_ref().and_then(|p| p.timeout_ms) == Some(0) {
		return Err(ConfigError::InvalidValue {
			key: "policy.timeout_ms".to_string(),
			message: "must be greater than zero".to_string(),
		});
	}
	if layer.policy.as_ref().and_then(|p| p.cache_capacity) == Some(0) {
		return Err(ConfigError::InvalidValue {
			key: "policy.cache_capacity".to_string(),
			message: "must be greater than zero".to_string(),
		});
	}

	let settings = AuthzSettings {
		policy: layer.policy.unwrap_or_default().finalize(),
		cluster: layer.cluster.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};
	validate(&settings)?;

	info!(
		policy_timeout_ms = settings.policy.timeout.as_millis() as u64,
		policy_cache_capacity = settings.policy.cache_capacity,
		local_cluster = settings.cluster.local_name.as_deref().unwrap_or(""),
		multicluster_enabled = settings.cluster.multicluster_enabled,
		"Authorizer configuration loaded"
	);

	Ok(settings)
}

/// Validate cross-field configuration rules.
fn validate(settings: &AuthzSettings) -> Result<(), ConfigError> {
	if settings.cluster.multicluster_enabled && settings.cluster.local_name.is_none() {
		return Err(ConfigError::Validation(
			"cluster.multicluster_enabled requires cluster.local_name (LOOM_AUTHZ_LOCAL_CLUSTER); \
			 without it every cluster id would be treated as remote"
				.to_string(),
		));
	}

	Ok(())
}
