// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections: override policies, cluster identity and logging.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::DEFAULT_CAPACITY;

pub const DEFAULT_POLICY_TIMEOUT_MS: u64 = 1000;

fn default_level() -> String {
	"info".to_string()
}

// =============================================================================
// Policy
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfigLayer {
	pub timeout_ms: Option<u64>,
	pub cache_capacity: Option<usize>,
}

impl PolicyConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.timeout_ms.is_some() {
			self.timeout_ms = other.timeout_ms;
		}
		if other.cache_capacity.is_some() {
			self.cache_capacity = other.cache_capacity;
		}
	}

	pub fn finalize(self) -> PolicyConfig {
		PolicyConfig {
			timeout: Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_POLICY_TIMEOUT_MS)),
			cache_capacity: self.cache_capacity.unwrap_or(DEFAULT_CAPACITY),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
	/// Deadline for a single override evaluation.
	pub timeout: Duration,
	/// Maximum number of compiled policies kept.
	pub cache_capacity: usize,
}

impl Default for PolicyConfig {
	fn default() -> Self {
		PolicyConfigLayer::default().finalize()
	}
}

// =============================================================================
// Cluster
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterConfigLayer {
	pub local_name: Option<String>,
	pub multicluster_enabled: Option<bool>,
}

impl ClusterConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.local_name.is_some() {
			self.local_name = other.local_name;
		}
		if other.multicluster_enabled.is_some() {
			self.multicluster_enabled = other.multicluster_enabled;
		}
	}

	pub fn finalize(self) -> ClusterConfig {
		ClusterConfig {
			local_name: self.local_name.filter(|name| !name.is_empty()),
			multicluster_enabled: self.multicluster_enabled.unwrap_or(false),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterConfig {
	/// Cluster id served by this process.
	pub local_name: Option<String>,
	pub multicluster_enabled: bool,
}

// =============================================================================
// Logging
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub level: Option<String>,
	pub json: Option<bool>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
		if other.json.is_some() {
			self.json = other.json;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(default_level),
			json: self.json.unwrap_or(false),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
	pub level: String,
	pub json: bool,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: default_level(),
			json: false,
		}
	}
}
