// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Walk order, short-circuiting and error accumulation.

use std::sync::Arc;

use loom_server_authz::{
	Authorizer, AuthorizationDecision, Decision, NamespacePlacement, PolicyRule, Principal,
	ProjectPlacement, ResourceScope, Role, RoleBinding, RoleKind, RoleRef, Scope, Snapshot,
	Subject,
};

use super::support::{authorizer, count, in_namespace, request, CountingRepository};

fn rule(resource: &str) -> PolicyRule {
	PolicyRule::resource(["get"], [""], [resource])
}

/// alice is bound at every level, each role granting a differently named resource.
fn layered_snapshot() -> Snapshot {
	Snapshot {
		roles: vec![
			Role::new(Scope::Global, "global-reader").with_rules(vec![rule("globals")]),
			Role::new(Scope::Workspace, "ws-reader")
				.with_workspace("ws1")
				.with_rules(vec![rule("workspaces")]),
			Role::new(Scope::Namespace, "ns-reader")
				.with_namespace("ns1")
				.with_rules(vec![rule("pods")]),
			Role::new(Scope::Cluster, "cluster-reader").with_rules(vec![rule("nodes")]),
			Role::new(Scope::Cluster, "pod-reader").with_rules(vec![rule("pods")]),
		],
		bindings: vec![
			RoleBinding::new(
				Scope::Global,
				"alice-global",
				RoleRef::new(RoleKind::GlobalRole, "global-reader"),
			)
			.with_subject(Subject::user("alice")),
			RoleBinding::new(
				Scope::Workspace,
				"alice-ws1",
				RoleRef::new(RoleKind::WorkspaceRole, "ws-reader"),
			)
			.with_workspace("ws1")
			.with_subject(Subject::user("alice")),
			RoleBinding::new(
				Scope::Namespace,
				"alice-ns1",
				RoleRef::new(RoleKind::Role, "ns-reader"),
			)
			.with_namespace("ns1")
			.with_subject(Subject::user("alice")),
			RoleBinding::new(
				Scope::Namespace,
				"alice-ns1-cluster-pods",
				RoleRef::new(RoleKind::ClusterRole, "pod-reader"),
			)
			.with_namespace("ns1")
			.with_subject(Subject::user("alice")),
			RoleBinding::new(
				Scope::Cluster,
				"alice-cluster",
				RoleRef::new(RoleKind::ClusterRole, "cluster-reader"),
			)
			.with_subject(Subject::user("alice")),
		],
		namespaces: vec![NamespacePlacement {
			name: "ns1".to_string(),
			workspace: Some("ws1".to_string()),
		}],
		projects: vec![ProjectPlacement {
			id: "p-1".to_string(),
			namespace: Some("ns1".to_string()),
			workspace: Some("ws1".to_string()),
		}],
	}
}

fn alice() -> Principal {
	Principal::new("alice")
}

#[tokio::test]
async fn global_scope_consults_only_global_bindings() {
	let repo = Arc::new(CountingRepository::new(layered_snapshot()));
	let attrs = request(alice(), "get", "nodes")
		.namespace("ns1")
		.workspace("ws1")
		.scope(ResourceScope::Global);

	let decision = authorizer(repo.clone()).authorize(&attrs).await.unwrap();
	assert_eq!(decision, AuthorizationDecision::no_opinion(""));
	assert_eq!(count(&repo.calls.global), 1);
	assert_eq!(count(&repo.calls.workspace), 0);
	assert_eq!(count(&repo.calls.namespace), 0);
	assert_eq!(count(&repo.calls.cluster), 0);
}

#[tokio::test]
async fn first_granting_binding_wins() {
	let repo = Arc::new(CountingRepository::new(layered_snapshot()));
	let attrs = in_namespace(request(alice(), "get", "pods"), "ns1");

	let decision = authorizer(repo.clone()).authorize(&attrs).await.unwrap();
	assert_eq!(
		decision.reason,
		"RBAC: allowed by RoleBinding \"ns1/alice-ns1\" of Role \"ns-reader\" to User \"alice\""
	);
	// Stopped inside the namespace stage: the second namespace binding's role
	// and the cluster stage were never looked at.
	assert_eq!(count(&repo.calls.cluster), 0);
	assert_eq!(count(&repo.calls.roles), 3);
}

#[tokio::test]
async fn rules_for_collects_every_level() {
	let repo = Arc::new(CountingRepository::new(layered_snapshot()));
	let attrs = in_namespace(request(alice(), "get", "pods"), "ns1");

	let resolved = authorizer(repo.clone()).rules_for(&attrs).await.unwrap();
	assert_eq!(
		resolved.rules,
		vec![
			rule("globals"),
			rule("workspaces"),
			rule("pods"),
			rule("pods"),
			rule("nodes"),
		]
	);
	assert!(resolved.errors.is_none());
	assert_eq!(count(&repo.calls.cluster), 1);
}

#[tokio::test]
async fn project_scope_reaches_workspace_and_namespace() {
	let repo = Arc::new(CountingRepository::new(layered_snapshot()));
	let attrs = request(alice(), "get", "workspaces")
		.project("p-1")
		.scope(ResourceScope::Project);

	let decision = authorizer(repo.clone()).authorize(&attrs).await.unwrap();
	assert_eq!(
		decision.reason,
		"RBAC: allowed by WorkspaceRoleBinding \"alice-ws1\" of WorkspaceRole \"ws-reader\" to User \"alice\""
	);

	let resolved = authorizer(repo).rules_for(&attrs).await.unwrap();
	assert_eq!(resolved.rules.len(), 5);
}

#[tokio::test]
async fn decisions_are_idempotent() {
	let repo = Arc::new(CountingRepository::new(layered_snapshot()));
	let authorizer = authorizer(repo);
	let attrs = in_namespace(request(alice(), "delete", "pods"), "ns1");

	let first = authorizer.authorize(&attrs).await.unwrap();
	let second = authorizer.authorize(&attrs).await.unwrap();
	assert_eq!(first, second);
	assert_eq!(
		authorizer.rules_for(&attrs).await.unwrap(),
		authorizer.rules_for(&attrs).await.unwrap()
	);
}

#[tokio::test]
async fn lookup_failures_accumulate_into_reason() {
	let mut snapshot = layered_snapshot();
	snapshot.bindings.push(
		RoleBinding::new(
			Scope::Cluster,
			"alice-ghost",
			RoleRef::new(RoleKind::ClusterRole, "ghost"),
		)
		.with_subject(Subject::user("alice")),
	);
	let repo = Arc::new(CountingRepository::new(snapshot).failing_namespace_listing());
	let attrs = in_namespace(request(alice(), "delete", "pods"), "ns1");

	let decision = authorizer(repo.clone()).authorize(&attrs).await.unwrap();
	assert_eq!(decision.decision, Decision::NoOpinion);
	assert_eq!(
		decision.reason,
		"RBAC: [repository error: namespace cache unavailable, ClusterRole \"ghost\" not found]"
	);

	let resolved = authorizer(repo).rules_for(&attrs).await.unwrap();
	assert_eq!(resolved.errors.map(|e| e.len()), Some(2));
	assert_eq!(resolved.rules.len(), 3);
}

#[tokio::test]
async fn unknown_namespace_still_reaches_cluster_bindings() {
	let repo = Arc::new(CountingRepository::new(layered_snapshot()));
	let attrs = in_namespace(request(alice(), "get", "nodes"), "elsewhere");

	let decision = authorizer(repo.clone()).authorize(&attrs).await.unwrap();
	assert!(decision.is_allowed());
	assert_eq!(count(&repo.calls.workspace), 0);
	assert_eq!(count(&repo.calls.namespace), 1);
}
