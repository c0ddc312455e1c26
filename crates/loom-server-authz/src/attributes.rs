// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request attributes and decisions.
//!
//! [`RequestAttributes`] is built by the attribute-extraction layer in front of
//! the authorizer. The resource scope in particular is trusted as supplied.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Principal;

/// Scope level a request targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceScope {
	Global,
	Workspace,
	Namespace,
	/// A project; resolved to its namespace and workspace through the repository.
	Project,
	#[default]
	Cluster,
}

impl fmt::Display for ResourceScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ResourceScope::Global => "global",
			ResourceScope::Workspace => "workspace",
			ResourceScope::Namespace => "namespace",
			ResourceScope::Project => "project",
			ResourceScope::Cluster => "cluster",
		};
		f.write_str(s)
	}
}

impl std::str::FromStr for ResourceScope {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.to_ascii_lowercase().as_str() {
			"global" => Ok(ResourceScope::Global),
			"workspace" => Ok(ResourceScope::Workspace),
			"namespace" => Ok(ResourceScope::Namespace),
			"project" => Ok(ResourceScope::Project),
			"cluster" => Ok(ResourceScope::Cluster),
			other => Err(format!("unknown resource scope: {other}")),
		}
	}
}

/// The action under evaluation. Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAttributes {
	pub principal: Option<Principal>,
	pub verb: String,
	pub api_group: String,
	pub api_version: String,
	pub resource: String,
	pub subresource: String,
	pub resource_name: String,
	pub namespace: String,
	pub workspace: String,
	pub cluster: String,
	pub project: String,
	pub resource_scope: ResourceScope,
	pub is_resource_request: bool,
	pub path: String,
}

impl RequestAttributes {
	/// A resource request by `principal`. Scope defaults to cluster.
	pub fn new(principal: Principal) -> Self {
		Self {
			principal: Some(principal),
			is_resource_request: true,
			..Default::default()
		}
	}

	pub fn verb(mut self, verb: impl Into<String>) -> Self {
		self.verb = verb.into();
		self
	}

	pub fn api_group(mut self, api_group: impl Into<String>) -> Self {
		self.api_group = api_group.into();
		self
	}

	pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
		self.api_version = api_version.into();
		self
	}

	pub fn resource(mut self, resource: impl Into<String>) -> Self {
		self.resource = resource.into();
		self
	}

	pub fn subresource(mut self, subresource: impl Into<String>) -> Self {
		self.subresource = subresource.into();
		self
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.resource_name = name.into();
		self
	}

	pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();
		self
	}

	pub fn workspace(mut self, workspace: impl Into<String>) -> Self {
		self.workspace = workspace.into();
		self
	}

	pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
		self.cluster = cluster.into();
		self
	}

	pub fn project(mut self, project: impl Into<String>) -> Self {
		self.project = project.into();
		self
	}

	pub fn scope(mut self, scope: ResourceScope) -> Self {
		self.resource_scope = scope;
		self
	}

	/// Turn this into a non-resource request for `path`.
	pub fn non_resource_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self.is_resource_request = false;
		self
	}

	/// Name of the principal, or empty when there is none.
	pub fn user_name(&self) -> &str {
		self.principal.as_ref().map(|p| p.name.as_str()).unwrap_or("")
	}

	/// `resource/subresource`, or just the resource when no subresource is set.
	pub fn combined_resource(&self) -> String {
		if self.subresource.is_empty() {
			self.resource.clone()
		} else {
			format!("{}/{}", self.resource, self.subresource)
		}
	}

	/// JSON document exposed to override policies as `input`.
	pub fn policy_input(&self) -> serde_json::Value {
		let input = PolicyInput {
			user: self.principal.as_ref().map(|p| PolicyUser {
				name: &p.name,
				groups: &p.groups,
				extra: &p.extra,
			}),
			verb: &self.verb,
			api_group: &self.api_group,
			api_version: &self.api_version,
			resource: &self.resource,
			subresource: &self.subresource,
			name: &self.resource_name,
			namespace: &self.namespace,
			workspace: &self.workspace,
			cluster: &self.cluster,
			project: &self.project,
			resource_scope: self.resource_scope,
			resource_request: self.is_resource_request,
			path: &self.path,
		};
		serde_json::to_value(input).unwrap_or(serde_json::Value::Null)
	}
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyInput<'a> {
	user: Option<PolicyUser<'a>>,
	verb: &'a str,
	#[serde(rename = "APIGroup")]
	api_group: &'a str,
	#[serde(rename = "APIVersion")]
	api_version: &'a str,
	resource: &'a str,
	subresource: &'a str,
	name: &'a str,
	namespace: &'a str,
	workspace: &'a str,
	cluster: &'a str,
	project: &'a str,
	resource_scope: ResourceScope,
	resource_request: bool,
	path: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyUser<'a> {
	name: &'a str,
	groups: &'a [String],
	extra: &'a BTreeMap<String, Vec<String>>,
}

/// Outcome of an authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
	Allow,
	/// Explicitly forbidden. Never produced by the RBAC authorizer.
	Deny,
	/// Nothing permitted or forbade the request.
	NoOpinion,
}

impl fmt::Display for Decision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Decision::Allow => write!(f, "allow"),
			Decision::Deny => write!(f, "deny"),
			Decision::NoOpinion => write!(f, "no_opinion"),
		}
	}
}

/// A decision together with the human-readable reason for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
	pub decision: Decision,
	pub reason: String,
}

impl AuthorizationDecision {
	pub fn allow(reason: impl Into<String>) -> Self {
		Self {
			decision: Decision::Allow,
			reason: reason.into(),
		}
	}

	pub fn deny(reason: impl Into<String>) -> Self {
		Self {
			decision: Decision::Deny,
			reason: reason.into(),
		}
	}

	pub fn no_opinion(reason: impl Into<String>) -> Self {
		Self {
			decision: Decision::NoOpinion,
			reason: reason.into(),
		}
	}

	pub fn is_allowed(&self) -> bool {
		self.decision == Decision::Allow
	}
}
