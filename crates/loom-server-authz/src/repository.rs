// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read access to roles, bindings and scope placement.
//!
//! Implementations are expected to serve from a watch-fed cache of state owned
//! elsewhere. The authorizer never writes through this trait and tolerates a
//! stale view.

use async_trait::async_trait;

use crate::error::{AuthzError, AuthzResult};
use crate::subject::applies_to;
use crate::types::{Principal, Role, RoleBinding, RoleKind, RoleRef, Scope};

/// Repository trait for authorization data.
#[async_trait]
pub trait AuthzRepository: Send + Sync {
	// Binding listings (snapshots)
	async fn list_global_bindings(&self) -> AuthzResult<Vec<RoleBinding>>;
	/// Workspace bindings labelled with `workspace`.
	async fn list_workspace_bindings(&self, workspace: &str) -> AuthzResult<Vec<RoleBinding>>;
	async fn list_namespace_bindings(&self, namespace: &str) -> AuthzResult<Vec<RoleBinding>>;
	async fn list_cluster_bindings(&self) -> AuthzResult<Vec<RoleBinding>>;

	/// Look up a role.
	///
	/// `qualifier` is the namespace for [`RoleKind::Role`] and the workspace
	/// label for [`RoleKind::WorkspaceRole`]; other kinds ignore it. Returns
	/// [`AuthzError::RoleNotFound`] when the role does not exist.
	async fn get_role(&self, kind: RoleKind, qualifier: Option<&str>, name: &str)
		-> AuthzResult<Role>;

	// Placement lookups; `Ok(None)` means "not controlled by any workspace".
	async fn resolve_namespace_workspace(&self, namespace: &str) -> AuthzResult<Option<String>>;
	async fn resolve_project_workspace(&self, project: &str) -> AuthzResult<Option<String>>;
	async fn resolve_project_namespace(&self, project: &str) -> AuthzResult<Option<String>>;
}

/// Lists the role references bound to `principal` at one scope level.
///
/// `target` is the workspace for [`Scope::Workspace`] and the namespace for
/// [`Scope::Namespace`]; it is ignored otherwise. Returns
/// [`AuthzError::NoRoleBinding`] when no binding applies.
pub async fn roles_of_user(
	repository: &dyn AuthzRepository,
	scope: Scope,
	principal: &Principal,
	target: &str,
) -> AuthzResult<Vec<RoleRef>> {
	let bindings = match scope {
		Scope::Global => repository.list_global_bindings().await?,
		Scope::Workspace => repository.list_workspace_bindings(target).await?,
		Scope::Namespace => repository.list_namespace_bindings(target).await?,
		Scope::Cluster => repository.list_cluster_bindings().await?,
	};
	let context_namespace = if scope == Scope::Namespace { target } else { "" };

	let mut refs: Vec<RoleRef> = Vec::new();
	for binding in bindings {
		if applies_to(principal, &binding.subjects, context_namespace).is_some()
			&& !refs.contains(&binding.role_ref)
		{
			refs.push(binding.role_ref);
		}
	}

	if refs.is_empty() {
		return Err(AuthzError::NoRoleBinding {
			scope,
			user: principal.name.clone(),
		});
	}
	Ok(refs)
}
