// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Binding resolution across the scope hierarchy.
//!
//! [`BindingResolver::visit_rules_for`] walks bindings in a fixed priority
//! order and streams every candidate to a [`RuleVisitor`]:
//!
//! ```text
//! global bindings ──(scope == global: stop)──┐
//!        │                                   │
//!        ▼                                   │
//! workspace bindings   (workspace / namespace / project scope)
//!        │
//!        ▼
//! namespace bindings   (namespace / project scope)
//!        │
//!        ▼
//! cluster bindings     (always)
//! ```
//!
//! For each binding whose subjects cover the principal, the referenced role is
//! resolved and its override policy (if any) is visited once, followed by each
//! of its rules. Lookup failures are visited as errors and the walk carries on
//! with the next candidate. A visitor returning [`ControlFlow::Break`] ends the
//! whole walk immediately.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::attributes::{RequestAttributes, ResourceScope};
use crate::error::{AuthzError, AuthzResult};
use crate::repository::AuthzRepository;
use crate::subject::{applies_to, describe_subject};
use crate::types::{PolicyRule, Principal, RoleBinding, RoleKind, RoleRef, Scope, Subject};

/// Where a visited rule came from: the binding, its role and the subject that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSource {
	pub binding_scope: Scope,
	pub binding_name: String,
	pub binding_namespace: Option<String>,
	pub role_ref: RoleRef,
	pub subject: Subject,
	context_namespace: String,
}

impl RuleSource {
	fn new(binding: &RoleBinding, subject: &Subject, context_namespace: &str) -> Self {
		Self {
			binding_scope: binding.scope,
			binding_name: binding.name.clone(),
			binding_namespace: binding.namespace.clone(),
			role_ref: binding.role_ref.clone(),
			subject: subject.clone(),
			context_namespace: context_namespace.to_string(),
		}
	}
}

impl fmt::Display for RuleSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let binding = match self.binding_namespace.as_deref() {
			Some(ns) if self.binding_scope == Scope::Namespace => {
				format!("{ns}/{}", self.binding_name)
			}
			_ => self.binding_name.clone(),
		};
		write!(
			f,
			"{} {binding:?} of {} {:?} to {}",
			self.binding_scope.binding_kind(),
			self.role_ref.kind,
			self.role_ref.name,
			describe_subject(&self.subject, &self.context_namespace)
		)
	}
}

/// One item streamed by the resolver.
#[derive(Debug)]
pub enum Visit<'a> {
	/// Override policy of a role; replaces that role's rule list.
	Override {
		source: &'a RuleSource,
		policy: &'a str,
	},
	/// A concrete rule of a role.
	Rule {
		source: &'a RuleSource,
		rule: &'a PolicyRule,
	},
	/// A non-fatal lookup failure.
	Error(AuthzError),
}

/// Consumer of resolver output.
#[async_trait]
pub trait RuleVisitor: Send {
	/// Handle one item; return [`ControlFlow::Break`] to stop the walk.
	async fn visit(&mut self, item: Visit<'_>) -> ControlFlow<()>;
}

/// Walks role bindings for a request.
#[derive(Clone)]
pub struct BindingResolver {
	repository: Arc<dyn AuthzRepository>,
}

impl BindingResolver {
	pub fn new(repository: Arc<dyn AuthzRepository>) -> Self {
		Self { repository }
	}

	pub fn repository(&self) -> &Arc<dyn AuthzRepository> {
		&self.repository
	}

	/// Stream every candidate rule for `principal` making the request `attrs`.
	pub async fn visit_rules_for<V>(
		&self,
		attrs: &RequestAttributes,
		principal: &Principal,
		visitor: &mut V,
	) where
		V: RuleVisitor + ?Sized,
	{
		let _ = self.walk(attrs, principal, visitor).await;
	}

	async fn walk<V>(
		&self,
		attrs: &RequestAttributes,
		principal: &Principal,
		visitor: &mut V,
	) -> ControlFlow<()>
	where
		V: RuleVisitor + ?Sized,
	{
		let bindings = self.repository.list_global_bindings().await;
		if self.visit_bindings(bindings, principal, "", visitor).await.is_break() {
			return ControlFlow::Break(());
		}
		if attrs.resource_scope == ResourceScope::Global {
			return ControlFlow::Continue(());
		}

		if matches!(
			attrs.resource_scope,
			ResourceScope::Workspace | ResourceScope::Namespace | ResourceScope::Project
		) {
			match self.target_workspace(attrs).await {
				Ok(Some(workspace)) => {
					let bindings = self.repository.list_workspace_bindings(&workspace).await;
					if self.visit_bindings(bindings, principal, "", visitor).await.is_break() {
						return ControlFlow::Break(());
					}
				}
				Ok(None) => trace!(scope = %attrs.resource_scope, "no controlling workspace"),
				Err(err) => {
					if visitor.visit(Visit::Error(err)).await.is_break() {
						return ControlFlow::Break(());
					}
				}
			}
		}

		if matches!(
			attrs.resource_scope,
			ResourceScope::Namespace | ResourceScope::Project
		) {
			match self.target_namespace(attrs).await {
				Ok(Some(namespace)) => {
					let bindings = self.repository.list_namespace_bindings(&namespace).await;
					if self
						.visit_bindings(bindings, principal, &namespace, visitor)
						.await
						.is_break()
					{
						return ControlFlow::Break(());
					}
				}
				Ok(None) => trace!(scope = %attrs.resource_scope, "no target namespace"),
				Err(err) => {
					if visitor.visit(Visit::Error(err)).await.is_break() {
						return ControlFlow::Break(());
					}
				}
			}
		}

		let bindings = self.repository.list_cluster_bindings().await;
		self.visit_bindings(bindings, principal, "", visitor).await
	}

	async fn target_workspace(&self, attrs: &RequestAttributes) -> AuthzResult<Option<String>> {
		match attrs.resource_scope {
			ResourceScope::Workspace => Ok(non_empty(&attrs.workspace)),
			ResourceScope::Namespace if attrs.namespace.is_empty() => Ok(None),
			ResourceScope::Namespace => {
				self
					.repository
					.resolve_namespace_workspace(&attrs.namespace)
					.await
			}
			ResourceScope::Project if attrs.project.is_empty() => Ok(None),
			ResourceScope::Project => self.repository.resolve_project_workspace(&attrs.project).await,
			ResourceScope::Global | ResourceScope::Cluster => Ok(None),
		}
	}

	async fn target_namespace(&self, attrs: &RequestAttributes) -> AuthzResult<Option<String>> {
		match attrs.resource_scope {
			ResourceScope::Namespace => Ok(non_empty(&attrs.namespace)),
			ResourceScope::Project if attrs.project.is_empty() => Ok(None),
			ResourceScope::Project => self.repository.resolve_project_namespace(&attrs.project).await,
			_ => Ok(None),
		}
	}

	async fn visit_bindings<V>(
		&self,
		bindings: AuthzResult<Vec<RoleBinding>>,
		principal: &Principal,
		context_namespace: &str,
		visitor: &mut V,
	) -> ControlFlow<()>
	where
		V: RuleVisitor + ?Sized,
	{
		let bindings = match bindings {
			Ok(bindings) => bindings,
			Err(err) => return visitor.visit(Visit::Error(err)).await,
		};

		for binding in &bindings {
			let Some(index) = applies_to(principal, &binding.subjects, context_namespace) else {
				continue;
			};

			let qualifier = match binding.role_ref.kind {
				RoleKind::Role => binding.namespace.as_deref().or(Some(context_namespace)),
				RoleKind::WorkspaceRole => binding.workspace.as_deref(),
				_ => None,
			};
			let role = match self
				.repository
				.get_role(binding.role_ref.kind, qualifier, &binding.role_ref.name)
				.await
			{
				Ok(role) => role,
				Err(err) => {
					if visitor.visit(Visit::Error(err)).await.is_break() {
						return ControlFlow::Break(());
					}
					continue;
				}
			};

			let source = RuleSource::new(binding, &binding.subjects[index], context_namespace);
			if let Some(policy) = role.override_policy() {
				let item = Visit::Override {
					source: &source,
					policy,
				};
				if visitor.visit(item).await.is_break() {
					return ControlFlow::Break(());
				}
			}
			for rule in &role.rules {
				let item = Visit::Rule {
					source: &source,
					rule,
				};
				if visitor.visit(item).await.is_break() {
					return ControlFlow::Break(());
				}
			}
		}

		ControlFlow::Continue(())
	}
}

fn non_empty(value: &str) -> Option<String> {
	if value.is_empty() {
		None
	} else {
		Some(value.to_string())
	}
}
