// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end decisions over small, realistic snapshots.

use std::sync::Arc;

use loom_server_authz::{
	Authorizer, Decision, NamespacePlacement, PolicyRule, Principal, ResourceScope, Role,
	RoleBinding, RoleKind, RoleRef, Scope, Snapshot, Subject,
};

use super::support::{authorizer, in_namespace, request, CountingRepository};

const CLUSTER1_ONLY: &str =
	r#"package authz; default allow=false; allow { input.Cluster == "cluster1" }"#;

fn read_pods() -> PolicyRule {
	PolicyRule::resource(["get", "list", "watch"], [""], ["pods"])
}

fn read_services() -> PolicyRule {
	PolicyRule::resource(["get", "list", "watch"], [""], ["services"])
}

#[tokio::test]
async fn cluster_admin_can_list_nodes() {
	let repo = Arc::new(CountingRepository::new(Snapshot {
		roles: vec![Role::new(Scope::Cluster, "cluster-admin")
			.with_rules(vec![PolicyRule::resource(["*"], ["*"], ["*"])])],
		bindings: vec![RoleBinding::new(
			Scope::Cluster,
			"admin-binding",
			RoleRef::new(RoleKind::ClusterRole, "cluster-admin"),
		)
		.with_subject(Subject::user("admin"))],
		..Default::default()
	}));

	let attrs = request(Principal::new("admin"), "list", "nodes").scope(ResourceScope::Cluster);
	let decision = authorizer(repo).authorize(&attrs).await.unwrap();
	assert_eq!(decision.decision, Decision::Allow);
	assert!(decision.reason.starts_with("RBAC: allowed by ClusterRoleBinding"));
}

#[tokio::test]
async fn global_override_policy_gates_on_cluster() {
	let repo = Arc::new(CountingRepository::new(Snapshot {
		roles: vec![Role::new(Scope::Global, "cluster1-operator")
			.with_rules(vec![PolicyRule::resource(["*"], ["*"], ["*"])])
			.with_override_policy(CLUSTER1_ONLY)],
		bindings: vec![RoleBinding::new(
			Scope::Global,
			"tom-operator",
			RoleRef::new(RoleKind::GlobalRole, "cluster1-operator"),
		)
		.with_subject(Subject::user("tom"))],
		..Default::default()
	}));
	let authorizer = authorizer(repo);

	let attrs = request(Principal::new("tom"), "get", "pods")
		.cluster("cluster1")
		.scope(ResourceScope::Global);
	let decision = authorizer.authorize(&attrs).await.unwrap();
	assert_eq!(decision.decision, Decision::Allow);
	assert_eq!(
		decision.reason,
		"RBAC: allowed by GlobalRoleBinding \"tom-operator\" of GlobalRole \"cluster1-operator\" to User \"tom\""
	);

	// The rule list grants everything, but the override replaces it.
	let attrs = request(Principal::new("tom"), "get", "pods")
		.cluster("cluster2")
		.scope(ResourceScope::Global);
	let decision = authorizer.authorize(&attrs).await.unwrap();
	assert_eq!(decision.decision, Decision::NoOpinion);
	assert_eq!(decision.reason, "");
}

#[tokio::test]
async fn namespace_binding_contributes_rules_only_in_its_namespace() {
	let repo = Arc::new(CountingRepository::new(Snapshot {
		roles: vec![Role::new(Scope::Namespace, "reader")
			.with_namespace("ns1")
			.with_rules(vec![read_pods(), read_services()])],
		bindings: vec![RoleBinding::new(
			Scope::Namespace,
			"readers",
			RoleRef::new(RoleKind::Role, "reader"),
		)
		.with_namespace("ns1")
		.with_subject(Subject::user("foobar"))
		.with_subject(Subject::group("group1"))],
		namespaces: vec![
			NamespacePlacement {
				name: "ns1".to_string(),
				workspace: None,
			},
			NamespacePlacement {
				name: "ns2".to_string(),
				workspace: None,
			},
		],
		..Default::default()
	}));
	let authorizer = authorizer(repo);

	let resolved = authorizer
		.rules_for(&in_namespace(request(Principal::new("foobar"), "get", "pods"), "ns1"))
		.await
		.unwrap();
	assert_eq!(resolved.rules, vec![read_pods(), read_services()]);
	assert!(resolved.errors.is_none());

	let resolved = authorizer
		.rules_for(&in_namespace(request(Principal::new("foobar"), "get", "pods"), "ns2"))
		.await
		.unwrap();
	assert!(resolved.rules.is_empty());
	assert!(resolved.errors.is_none());

	let member = Principal::new("someone").with_group("group1");
	let decision = authorizer
		.authorize(&in_namespace(request(member, "watch", "services"), "ns1"))
		.await
		.unwrap();
	assert!(decision.is_allowed());
}

#[tokio::test]
async fn service_account_subject_inherits_binding_namespace() {
	let repo = Arc::new(CountingRepository::new(Snapshot {
		roles: vec![
			Role::new(Scope::Namespace, "pod-reader")
				.with_namespace("default")
				.with_rules(vec![read_pods()]),
			Role::new(Scope::Cluster, "node-reader")
				.with_rules(vec![PolicyRule::resource(["get"], [""], ["nodes"])]),
		],
		bindings: vec![
			RoleBinding::new(
				Scope::Namespace,
				"mysa-reads-pods",
				RoleRef::new(RoleKind::Role, "pod-reader"),
			)
			.with_namespace("default")
			.with_subject(Subject::service_account("", "mysa")),
			RoleBinding::new(
				Scope::Cluster,
				"mysa-reads-nodes",
				RoleRef::new(RoleKind::ClusterRole, "node-reader"),
			)
			.with_subject(Subject::service_account("", "mysa")),
		],
		namespaces: vec![NamespacePlacement {
			name: "default".to_string(),
			workspace: None,
		}],
		..Default::default()
	}));
	let authorizer = authorizer(repo);
	let sa = Principal::new("system:serviceaccount:default:mysa");

	let decision = authorizer
		.authorize(&in_namespace(request(sa.clone(), "get", "pods"), "default"))
		.await
		.unwrap();
	assert_eq!(decision.decision, Decision::Allow);
	assert!(decision
		.reason
		.ends_with("to ServiceAccount \"default/mysa\""));

	// A cluster binding has no namespace to lend the subject.
	let decision = authorizer
		.authorize(&request(sa, "get", "nodes").scope(ResourceScope::Cluster))
		.await
		.unwrap();
	assert_eq!(decision.decision, Decision::NoOpinion);
}

#[tokio::test]
async fn workspace_roles_do_not_leak_across_workspaces() {
	let repo = Arc::new(CountingRepository::new(Snapshot {
		roles: vec![
			Role::new(Scope::Workspace, "admin")
				.with_workspace("ws1")
				.with_rules(vec![PolicyRule::resource(["*"], ["*"], ["*"])]),
			Role::new(Scope::Workspace, "admin").with_workspace("ws2"),
		],
		bindings: vec![RoleBinding::new(
			Scope::Workspace,
			"eve-ws2",
			RoleRef::new(RoleKind::WorkspaceRole, "admin"),
		)
		.with_workspace("ws2")
		.with_subject(Subject::user("eve"))],
		..Default::default()
	}));
	let authorizer = authorizer(repo);

	let attrs = request(Principal::new("eve"), "delete", "pods")
		.workspace("ws2")
		.scope(ResourceScope::Workspace);
	let decision = authorizer.authorize(&attrs).await.unwrap();
	assert_eq!(decision.decision, Decision::NoOpinion);
	assert_eq!(decision.reason, "");
	assert!(authorizer.rules_for(&attrs).await.unwrap().rules.is_empty());
}
