// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role, binding and subject definitions.
//!
//! The four role kinds (global, workspace, namespace, cluster) share one shape,
//! so a single [`Role`] and [`RoleBinding`] type is parameterised by [`Scope`]
//! rather than duplicated per level. All types deserialize from the camelCase
//! resource shapes the object store publishes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal that matches anything when it appears in a rule field.
pub const WILDCARD: &str = "*";

// =============================================================================
// Scopes
// =============================================================================

/// Level of the hierarchy an entity lives at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
	/// Platform-wide.
	Global,
	/// Multi-namespace tenant boundary.
	Workspace,
	/// A single namespace (project).
	Namespace,
	/// A member cluster.
	Cluster,
}

impl Scope {
	/// Kind name of bindings at this level.
	pub fn binding_kind(self) -> &'static str {
		match self {
			Scope::Global => "GlobalRoleBinding",
			Scope::Workspace => "WorkspaceRoleBinding",
			Scope::Namespace => "RoleBinding",
			Scope::Cluster => "ClusterRoleBinding",
		}
	}
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Scope::Global => write!(f, "global"),
			Scope::Workspace => write!(f, "workspace"),
			Scope::Namespace => write!(f, "namespace"),
			Scope::Cluster => write!(f, "cluster"),
		}
	}
}

/// Kind of role a binding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
	GlobalRole,
	WorkspaceRole,
	/// Namespaced role, resolved in the binding's namespace.
	Role,
	ClusterRole,
}

impl RoleKind {
	/// Scope at which roles of this kind are stored.
	pub fn scope(self) -> Scope {
		match self {
			RoleKind::GlobalRole => Scope::Global,
			RoleKind::WorkspaceRole => Scope::Workspace,
			RoleKind::Role => Scope::Namespace,
			RoleKind::ClusterRole => Scope::Cluster,
		}
	}

	/// Role kind stored at `scope`.
	pub fn for_scope(scope: Scope) -> Self {
		match scope {
			Scope::Global => RoleKind::GlobalRole,
			Scope::Workspace => RoleKind::WorkspaceRole,
			Scope::Namespace => RoleKind::Role,
			Scope::Cluster => RoleKind::ClusterRole,
		}
	}
}

impl fmt::Display for RoleKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RoleKind::GlobalRole => write!(f, "GlobalRole"),
			RoleKind::WorkspaceRole => write!(f, "WorkspaceRole"),
			RoleKind::Role => write!(f, "Role"),
			RoleKind::ClusterRole => write!(f, "ClusterRole"),
		}
	}
}

// =============================================================================
// Rules
// =============================================================================

/// A single grant: every listed field must match the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
	#[serde(default)]
	pub verbs: Vec<String>,
	#[serde(default)]
	pub api_groups: Vec<String>,
	#[serde(default)]
	pub resources: Vec<String>,
	#[serde(default)]
	pub resource_names: Vec<String>,
	#[serde(default, rename = "nonResourceURLs")]
	pub non_resource_urls: Vec<String>,
}

impl PolicyRule {
	/// Rule for resource requests.
	pub fn resource<V, G, R>(verbs: V, api_groups: G, resources: R) -> Self
	where
		V: IntoIterator,
		V::Item: Into<String>,
		G: IntoIterator,
		G::Item: Into<String>,
		R: IntoIterator,
		R::Item: Into<String>,
	{
		Self {
			verbs: verbs.into_iter().map(Into::into).collect(),
			api_groups: api_groups.into_iter().map(Into::into).collect(),
			resources: resources.into_iter().map(Into::into).collect(),
			..Default::default()
		}
	}

	/// Rule for non-resource URLs.
	pub fn non_resource<V, U>(verbs: V, urls: U) -> Self
	where
		V: IntoIterator,
		V::Item: Into<String>,
		U: IntoIterator,
		U::Item: Into<String>,
	{
		Self {
			verbs: verbs.into_iter().map(Into::into).collect(),
			non_resource_urls: urls.into_iter().map(Into::into).collect(),
			..Default::default()
		}
	}

	/// Restrict the rule to the given object names.
	pub fn with_resource_names<N>(mut self, names: N) -> Self
	where
		N: IntoIterator,
		N::Item: Into<String>,
	{
		self.resource_names = names.into_iter().map(Into::into).collect();
		self
	}
}

// =============================================================================
// Roles and bindings
// =============================================================================

/// A named set of rules, optionally replaced by an override policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
	pub scope: Scope,
	pub name: String,
	/// Set for namespace-scoped roles.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub namespace: Option<String>,
	/// Workspace label; workspace roles correlate with their bindings through it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub workspace: Option<String>,
	#[serde(default)]
	pub rules: Vec<PolicyRule>,
	/// Policy-language source that replaces rule matching when present.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub override_policy: Option<String>,
}

impl Role {
	pub fn new(scope: Scope, name: impl Into<String>) -> Self {
		Self {
			scope,
			name: name.into(),
			namespace: None,
			workspace: None,
			rules: Vec::new(),
			override_policy: None,
		}
	}

	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
		self.workspace = Some(workspace.into());
		self
	}

	pub fn with_rules(mut self, rules: Vec<PolicyRule>) -> Self {
		self.rules = rules;
		self
	}

	pub fn with_override_policy(mut self, policy: impl Into<String>) -> Self {
		self.override_policy = Some(policy.into());
		self
	}

	/// Namespace or workspace label that, with the name, identifies the role
	/// within its scope.
	pub fn qualifier(&self) -> Option<&str> {
		match self.scope {
			Scope::Namespace => self.namespace.as_deref(),
			Scope::Workspace => self.workspace.as_deref(),
			Scope::Global | Scope::Cluster => None,
		}
	}

	/// The override policy text, if it is present and not blank.
	pub fn override_policy(&self) -> Option<&str> {
		self
			.override_policy
			.as_deref()
			.filter(|text| !text.trim().is_empty())
	}

	pub fn kind(&self) -> RoleKind {
		RoleKind::for_scope(self.scope)
	}
}

/// Reference from a binding to the role it grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleRef {
	pub kind: RoleKind,
	pub name: String,
}

impl RoleRef {
	pub fn new(kind: RoleKind, name: impl Into<String>) -> Self {
		Self {
			kind,
			name: name.into(),
		}
	}
}

/// Assignment of a role to a set of subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
	pub scope: Scope,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub namespace: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub workspace: Option<String>,
	#[serde(default)]
	pub subjects: Vec<Subject>,
	pub role_ref: RoleRef,
}

impl RoleBinding {
	pub fn new(scope: Scope, name: impl Into<String>, role_ref: RoleRef) -> Self {
		Self {
			scope,
			name: name.into(),
			namespace: None,
			workspace: None,
			subjects: Vec::new(),
			role_ref,
		}
	}

	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
		self.workspace = Some(workspace.into());
		self
	}

	pub fn with_subject(mut self, subject: Subject) -> Self {
		self.subjects.push(subject);
		self
	}
}

// =============================================================================
// Subjects and principals
// =============================================================================

/// Kind of identity a binding subject names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
	User,
	Group,
	ServiceAccount,
	/// Any kind this engine does not understand; never matches.
	#[serde(other)]
	Unknown,
}

/// A binding subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
	pub kind: SubjectKind,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub namespace: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api_group: Option<String>,
}

impl Subject {
	pub fn user(name: impl Into<String>) -> Self {
		Self {
			kind: SubjectKind::User,
			name: name.into(),
			namespace: None,
			api_group: None,
		}
	}

	pub fn group(name: impl Into<String>) -> Self {
		Self {
			kind: SubjectKind::Group,
			..Self::user(name)
		}
	}

	/// A service account; `namespace` may be empty to inherit the binding's.
	pub fn service_account(namespace: impl Into<String>, name: impl Into<String>) -> Self {
		let namespace: String = namespace.into();
		Self {
			kind: SubjectKind::ServiceAccount,
			name: name.into(),
			namespace: Some(namespace).filter(|ns| !ns.is_empty()),
			api_group: None,
		}
	}

	pub fn with_api_group(mut self, api_group: impl Into<String>) -> Self {
		self.api_group = Some(api_group.into());
		self
	}
}

/// The authenticated identity a request is made by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
	pub name: String,
	/// Group memberships, including synthetic ones such as `system:authenticated`.
	#[serde(default)]
	pub groups: Vec<String>,
	#[serde(default)]
	pub extra: BTreeMap<String, Vec<String>>,
}

impl Principal {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			groups: Vec::new(),
			extra: BTreeMap::new(),
		}
	}

	pub fn with_group(mut self, group: impl Into<String>) -> Self {
		let group = group.into();
		if !self.groups.contains(&group) {
			self.groups.push(group);
		}
		self
	}

	pub fn with_extra(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
		self.extra.insert(key.into(), values);
		self
	}

	pub fn in_group(&self, group: &str) -> bool {
		self.groups.iter().any(|g| g == group)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn role_kind_scope_roundtrip() {
		for scope in [Scope::Global, Scope::Workspace, Scope::Namespace, Scope::Cluster] {
			assert_eq!(RoleKind::for_scope(scope).scope(), scope);
		}
	}

	#[test]
	fn blank_override_policy_is_ignored() {
		let role = Role::new(Scope::Global, "r").with_override_policy("   \n");
		assert_eq!(role.override_policy(), None);

		let role = Role::new(Scope::Global, "r").with_override_policy("package authz");
		assert_eq!(role.override_policy(), Some("package authz"));
	}

	#[test]
	fn principal_groups_are_a_set() {
		let principal = Principal::new("bob").with_group("dev").with_group("dev");
		assert_eq!(principal.groups, vec!["dev".to_string()]);
		assert!(principal.in_group("dev"));
		assert!(!principal.in_group("ops"));
	}

	#[test]
	fn service_account_with_empty_namespace_inherits() {
		let subject = Subject::service_account("", "builder");
		assert_eq!(subject.namespace, None);
	}

	#[test]
	fn binding_deserializes_from_resource_shape() {
		let json = r#"{
			"scope": "namespace",
			"name": "viewers",
			"namespace": "ns1",
			"subjects": [
				{"kind": "User", "name": "foobar"},
				{"kind": "Robot", "name": "r2"}
			],
			"roleRef": {"kind": "Role", "name": "pod-reader"}
		}"#;
		let binding: RoleBinding = serde_json::from_str(json).unwrap();
		assert_eq!(binding.scope, Scope::Namespace);
		assert_eq!(binding.role_ref, RoleRef::new(RoleKind::Role, "pod-reader"));
		assert_eq!(binding.subjects[1].kind, SubjectKind::Unknown);
	}

	#[test]
	fn rule_deserializes_non_resource_urls() {
		let rule: PolicyRule =
			serde_json::from_str(r#"{"verbs": ["get"], "nonResourceURLs": ["/healthz"]}"#).unwrap();
		assert_eq!(rule, PolicyRule::non_resource(["get"], ["/healthz"]));
	}
}
