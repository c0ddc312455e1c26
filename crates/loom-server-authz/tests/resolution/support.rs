// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures: a call-counting repository wrapper and request helpers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use loom_server_authz::{
	AuthzError, AuthzRepository, AuthzResult, MemoryRepository, Principal, RbacAuthorizer,
	RegoEvaluator, RequestAttributes, ResourceScope, Role, RoleBinding, RoleKind, Snapshot,
};

/// Per-method call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
	pub global: AtomicUsize,
	pub workspace: AtomicUsize,
	pub namespace: AtomicUsize,
	pub cluster: AtomicUsize,
	pub roles: AtomicUsize,
}

pub fn count(counter: &AtomicUsize) -> usize {
	counter.load(Ordering::SeqCst)
}

/// Wraps a [`MemoryRepository`], counting calls and optionally failing listings.
pub struct CountingRepository {
	inner: MemoryRepository,
	pub calls: CallCounts,
	fail_namespace_listing: bool,
}

impl CountingRepository {
	pub fn new(snapshot: Snapshot) -> Self {
		Self {
			inner: MemoryRepository::new(snapshot),
			calls: CallCounts::default(),
			fail_namespace_listing: false,
		}
	}

	pub fn failing_namespace_listing(mut self) -> Self {
		self.fail_namespace_listing = true;
		self
	}
}

#[async_trait]
impl AuthzRepository for CountingRepository {
	async fn list_global_bindings(&self) -> AuthzResult<Vec<RoleBinding>> {
		self.calls.global.fetch_add(1, Ordering::SeqCst);
		self.inner.list_global_bindings().await
	}

	async fn list_workspace_bindings(&self, workspace: &str) -> AuthzResult<Vec<RoleBinding>> {
		self.calls.workspace.fetch_add(1, Ordering::SeqCst);
		self.inner.list_workspace_bindings(workspace).await
	}

	async fn list_namespace_bindings(&self, namespace: &str) -> AuthzResult<Vec<RoleBinding>> {
		self.calls.namespace.fetch_add(1, Ordering::SeqCst);
		if self.fail_namespace_listing {
			return Err(AuthzError::repository("namespace cache unavailable"));
		}
		self.inner.list_namespace_bindings(namespace).await
	}

	async fn list_cluster_bindings(&self) -> AuthzResult<Vec<RoleBinding>> {
		self.calls.cluster.fetch_add(1, Ordering::SeqCst);
		self.inner.list_cluster_bindings().await
	}

	async fn get_role(
		&self,
		kind: RoleKind,
		qualifier: Option<&str>,
		name: &str,
	) -> AuthzResult<Role> {
		self.calls.roles.fetch_add(1, Ordering::SeqCst);
		self.inner.get_role(kind, qualifier, name).await
	}

	async fn resolve_namespace_workspace(&self, namespace: &str) -> AuthzResult<Option<String>> {
		self.inner.resolve_namespace_workspace(namespace).await
	}

	async fn resolve_project_workspace(&self, project: &str) -> AuthzResult<Option<String>> {
		self.inner.resolve_project_workspace(project).await
	}

	async fn resolve_project_namespace(&self, project: &str) -> AuthzResult<Option<String>> {
		self.inner.resolve_project_namespace(project).await
	}
}

pub fn authorizer(repository: Arc<CountingRepository>) -> RbacAuthorizer {
	RbacAuthorizer::new(repository, Arc::new(RegoEvaluator::new()))
}

pub fn request(principal: Principal, verb: &str, resource: &str) -> RequestAttributes {
	RequestAttributes::new(principal).verb(verb).resource(resource)
}

pub fn in_namespace(attrs: RequestAttributes, namespace: &str) -> RequestAttributes {
	attrs.namespace(namespace).scope(ResourceScope::Namespace)
}
