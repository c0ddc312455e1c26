// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`AuthzRepository`] backed by a replaceable [`Snapshot`].
//!
//! The watcher that keeps a snapshot current lives outside this crate; it
//! calls [`MemoryRepository::replace`] with each newer view.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthzError, AuthzResult};
use crate::repository::AuthzRepository;
use crate::types::{Role, RoleBinding, RoleKind, Scope};

/// Placement of a namespace under a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespacePlacement {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub workspace: Option<String>,
}

/// Placement of a project: the namespace backing it and its workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPlacement {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub namespace: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub workspace: Option<String>,
}

/// Point-in-time view of all authorization entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
	#[serde(default)]
	pub roles: Vec<Role>,
	#[serde(default)]
	pub bindings: Vec<RoleBinding>,
	#[serde(default)]
	pub namespaces: Vec<NamespacePlacement>,
	#[serde(default)]
	pub projects: Vec<ProjectPlacement>,
}

impl Snapshot {
	pub fn from_json(content: &str) -> AuthzResult<Self> {
		let snapshot: Snapshot = serde_json::from_str(content).map_err(|e| AuthzError::Snapshot {
			message: e.to_string(),
		})?;
		snapshot.validate()?;
		Ok(snapshot)
	}

	pub fn from_toml(content: &str) -> AuthzResult<Self> {
		let snapshot: Snapshot = toml::from_str(content).map_err(|e| AuthzError::Snapshot {
			message: e.to_string(),
		})?;
		snapshot.validate()?;
		Ok(snapshot)
	}

	/// Load a snapshot file; `.toml` files are parsed as TOML, anything else as JSON.
	pub fn from_path(path: impl AsRef<Path>) -> AuthzResult<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| AuthzError::Snapshot {
			message: format!("failed to read {}: {e}", path.display()),
		})?;
		debug!(path = %path.display(), "loading authorization snapshot");
		match path.extension().and_then(|ext| ext.to_str()) {
			Some("toml") => Self::from_toml(&content),
			_ => Self::from_json(&content),
		}
	}

	/// Checks that every entity carries the placement its scope requires.
	pub fn validate(&self) -> AuthzResult<()> {
		let mut seen = HashSet::new();
		for role in &self.roles {
			match role.scope {
				Scope::Namespace if is_blank(&role.namespace) => {
					return Err(invalid(format!("Role \"{}\" has no namespace", role.name)));
				}
				Scope::Workspace if is_blank(&role.workspace) => {
					return Err(invalid(format!(
						"WorkspaceRole \"{}\" has no workspace label",
						role.name
					)));
				}
				_ => {}
			}
			if !seen.insert((role.scope, role.qualifier(), role.name.as_str())) {
				return Err(invalid(format!(
					"{} \"{}\" is defined more than once",
					RoleKind::for_scope(role.scope),
					role.name
				)));
			}
		}
		for binding in &self.bindings {
			match binding.scope {
				Scope::Namespace if is_blank(&binding.namespace) => {
					return Err(invalid(format!(
						"RoleBinding \"{}\" has no namespace",
						binding.name
					)));
				}
				Scope::Workspace if is_blank(&binding.workspace) => {
					return Err(invalid(format!(
						"WorkspaceRoleBinding \"{}\" has no workspace label",
						binding.name
					)));
				}
				_ => {}
			}
		}
		Ok(())
	}

	fn bindings_where(&self, predicate: impl Fn(&RoleBinding) -> bool) -> Vec<RoleBinding> {
		self
			.bindings
			.iter()
			.filter(|binding| predicate(binding))
			.cloned()
			.collect()
	}

	fn project(&self, id: &str) -> AuthzResult<&ProjectPlacement> {
		self
			.projects
			.iter()
			.find(|p| p.id == id)
			.ok_or_else(|| AuthzError::ProjectNotFound { id: id.to_string() })
	}
}

fn is_blank(value: &Option<String>) -> bool {
	value.as_deref().map_or(true, str::is_empty)
}

fn invalid(message: String) -> AuthzError {
	AuthzError::Snapshot { message }
}

/// Repository serving reads from an in-memory snapshot.
#[derive(Debug, Default)]
pub struct MemoryRepository {
	state: RwLock<Snapshot>,
}

impl MemoryRepository {
	pub fn new(snapshot: Snapshot) -> Self {
		Self {
			state: RwLock::new(snapshot),
		}
	}

	/// Swap in a newer view of the world.
	pub fn replace(&self, snapshot: Snapshot) -> AuthzResult<()> {
		let mut state = self
			.state
			.write()
			.map_err(|_| AuthzError::repository("snapshot lock poisoned"))?;
		*state = snapshot;
		Ok(())
	}

	/// A copy of the current snapshot.
	pub fn snapshot(&self) -> AuthzResult<Snapshot> {
		Ok(self.read()?.clone())
	}

	fn read(&self) -> AuthzResult<RwLockReadGuard<'_, Snapshot>> {
		self
			.state
			.read()
			.map_err(|_| AuthzError::repository("snapshot lock poisoned"))
	}
}

#[async_trait]
impl AuthzRepository for MemoryRepository {
	async fn list_global_bindings(&self) -> AuthzResult<Vec<RoleBinding>> {
		Ok(self.read()?.bindings_where(|b| b.scope == Scope::Global))
	}

	async fn list_workspace_bindings(&self, workspace: &str) -> AuthzResult<Vec<RoleBinding>> {
		Ok(self.read()?.bindings_where(|b| {
			b.scope == Scope::Workspace && b.workspace.as_deref() == Some(workspace)
		}))
	}

	async fn list_namespace_bindings(&self, namespace: &str) -> AuthzResult<Vec<RoleBinding>> {
		Ok(self.read()?.bindings_where(|b| {
			b.scope == Scope::Namespace && b.namespace.as_deref() == Some(namespace)
		}))
	}

	async fn list_cluster_bindings(&self) -> AuthzResult<Vec<RoleBinding>> {
		Ok(self.read()?.bindings_where(|b| b.scope == Scope::Cluster))
	}

	async fn get_role(
		&self,
		kind: RoleKind,
		qualifier: Option<&str>,
		name: &str,
	) -> AuthzResult<Role> {
		let scope = kind.scope();
		let qualified = matches!(scope, Scope::Namespace | Scope::Workspace);
		let state = self.read()?;
		state
			.roles
			.iter()
			.find(|role| {
				role.scope == scope
					&& role.name == name
					&& (!qualified || role.qualifier() == qualifier)
			})
			.cloned()
			.ok_or_else(|| {
				AuthzError::role_not_found(kind, qualifier.filter(|_| qualified), name)
			})
	}

	async fn resolve_namespace_workspace(&self, namespace: &str) -> AuthzResult<Option<String>> {
		let state = self.read()?;
		state
			.namespaces
			.iter()
			.find(|ns| ns.name == namespace)
			.map(|ns| ns.workspace.clone())
			.ok_or_else(|| AuthzError::NamespaceNotFound {
				name: namespace.to_string(),
			})
	}

	async fn resolve_project_workspace(&self, project: &str) -> AuthzResult<Option<String>> {
		Ok(self.read()?.project(project)?.workspace.clone())
	}

	async fn resolve_project_namespace(&self, project: &str) -> AuthzResult<Option<String>> {
		Ok(self.read()?.project(project)?.namespace.clone())
	}
}
