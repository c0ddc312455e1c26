// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Multi-scope RBAC authorization for Loom.
//!
//! Roles and role bindings live at four levels: global, workspace, namespace
//! and cluster. For each request the authorizer walks the bindings that cover
//! the request's scope, from the broadest level down to the cluster, and
//! allows as soon as any bound role grants it. A role may carry a Rego
//! override policy that replaces its rule list.
//!
//! # Architecture
//!
//! - `rule` - Pure matching of one policy rule against a request
//! - `subject` - Matching binding subjects (users, groups, service accounts)
//! - `repository` - Read-only access to roles, bindings and scope placement
//! - `resolver` - The ordered binding walk, streamed to a visitor
//! - `visitor` - Stop-on-first-grant and collect-everything visitors
//! - `authorizer` - The `Authorizer` trait and `RbacAuthorizer`
//! - `policy` - Override policy evaluation with a compiled-policy cache
//! - `config` - Layered settings (defaults, TOML, `LOOM_AUTHZ_*` env)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use loom_server_authz::{
//!     Authorizer, MemoryRepository, Principal, RbacAuthorizer, RequestAttributes,
//!     ResourceScope, Snapshot,
//! };
//!
//! let repo = Arc::new(MemoryRepository::new(Snapshot::from_path("snapshot.json")?));
//! let settings = loom_server_authz::config::load_settings()?;
//! let authorizer = RbacAuthorizer::from_settings(repo, &settings);
//!
//! let attrs = RequestAttributes::new(Principal::new("alice").with_group("dev"))
//!     .verb("get")
//!     .resource("pods")
//!     .namespace("ns1")
//!     .scope(ResourceScope::Namespace);
//! let decision = authorizer.authorize(&attrs).await?;
//! ```

pub mod attributes;
pub mod authorizer;
pub mod authorizers;
pub mod config;
pub mod error;
pub mod memory;
pub mod policy;
pub mod repository;
pub mod resolver;
pub mod rule;
pub mod subject;
pub mod types;
pub mod visitor;

pub use attributes::{AuthorizationDecision, Decision, RequestAttributes, ResourceScope};
pub use authorizer::{Authorizer, RbacAuthorizer, ResolvedRules, DEFAULT_POLICY_TIMEOUT};
pub use authorizers::{
	AlwaysAllowAuthorizer, AlwaysDenyAuthorizer, MultiClusterAuthorizer, PathAuthorizer,
};
pub use config::{AuthzSettings, ConfigError};
pub use error::{AggregateError, AuthzError, AuthzResult};
pub use memory::{MemoryRepository, NamespacePlacement, ProjectPlacement, Snapshot};
pub use policy::{PolicyError, PolicyEvaluator, RegoEvaluator};
pub use repository::{roles_of_user, AuthzRepository};
pub use resolver::{BindingResolver, RuleSource, RuleVisitor, Visit};
pub use rule::{rule_allows, rules_allow};
pub use subject::{applies_to, ServiceAccountScheme};
pub use types::{
	PolicyRule, Principal, Role, RoleBinding, RoleKind, RoleRef, Scope, Subject, SubjectKind,
};
pub use visitor::{AuthorizingVisitor, RuleAccumulator};
