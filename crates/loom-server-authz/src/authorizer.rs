// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The RBAC authorizer.
//!
//! [`RbacAuthorizer`] walks the binding hierarchy for each request and allows
//! it as soon as one override policy or rule grants it. It never denies: when
//! nothing grants the request the decision is NoOpinion so that later
//! authorizers in a chain get their turn.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::attributes::{AuthorizationDecision, RequestAttributes};
use crate::config::{AuthzSettings, DEFAULT_POLICY_TIMEOUT_MS};
use crate::error::{AggregateError, AuthzError, AuthzResult};
use crate::policy::{PolicyEvaluator, RegoEvaluator};
use crate::repository::AuthzRepository;
use crate::resolver::BindingResolver;
use crate::types::PolicyRule;
use crate::visitor::{AuthorizingVisitor, RuleAccumulator};

/// Default deadline for a single override evaluation.
pub const DEFAULT_POLICY_TIMEOUT: Duration = Duration::from_millis(DEFAULT_POLICY_TIMEOUT_MS);

/// Something that can decide on a request.
///
/// Implementations are combined into a fixed-priority chain by the caller.
#[async_trait]
pub trait Authorizer: Send + Sync {
	async fn authorize(&self, attrs: &RequestAttributes) -> AuthzResult<AuthorizationDecision>;
}

/// Every concrete rule that applies to a request, plus what went wrong finding them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedRules {
	pub rules: Vec<PolicyRule>,
	#[serde(skip)]
	pub errors: Option<AggregateError>,
}

/// Role-based authorizer over the global, workspace, namespace and cluster scopes.
#[derive(Clone)]
pub struct RbacAuthorizer {
	resolver: BindingResolver,
	evaluator: Arc<dyn PolicyEvaluator>,
	policy_timeout: Duration,
}

impl RbacAuthorizer {
	pub fn new(repository: Arc<dyn AuthzRepository>, evaluator: Arc<dyn PolicyEvaluator>) -> Self {
		Self {
			resolver: BindingResolver::new(repository),
			evaluator,
			policy_timeout: DEFAULT_POLICY_TIMEOUT,
		}
	}

	/// Build an authorizer with a Rego evaluator sized from `settings`.
	pub fn from_settings(repository: Arc<dyn AuthzRepository>, settings: &AuthzSettings) -> Self {
		let evaluator = RegoEvaluator::with_capacity(settings.policy.cache_capacity);
		Self::new(repository, Arc::new(evaluator)).with_policy_timeout(settings.policy.timeout)
	}

	pub fn with_policy_timeout(mut self, timeout: Duration) -> Self {
		self.policy_timeout = timeout;
		self
	}

	pub fn policy_timeout(&self) -> Duration {
		self.policy_timeout
	}

	/// Collects every rule bound to the requesting principal.
	///
	/// Override policies are not evaluated and do not contribute rules.
	#[instrument(
		level = "debug",
		skip(self, attrs),
		fields(
			user = %attrs.user_name(),
			scope = %attrs.resource_scope,
		)
	)]
	pub async fn rules_for(&self, attrs: &RequestAttributes) -> AuthzResult<ResolvedRules> {
		let principal = attrs.principal.as_ref().ok_or(AuthzError::MissingPrincipal)?;

		let mut accumulator = RuleAccumulator::new();
		self
			.resolver
			.visit_rules_for(attrs, principal, &mut accumulator)
			.await;
		let (rules, errors) = accumulator.into_parts();

		debug!(
			rules = rules.len(),
			errors = errors.as_ref().map(AggregateError::len).unwrap_or(0),
			"resolved rules"
		);
		Ok(ResolvedRules { rules, errors })
	}
}

#[async_trait]
impl Authorizer for RbacAuthorizer {
	#[instrument(
		level = "debug",
		skip(self, attrs),
		fields(
			user = %attrs.user_name(),
			verb = %attrs.verb,
			resource = %attrs.combined_resource(),
			scope = %attrs.resource_scope,
		)
	)]
	async fn authorize(&self, attrs: &RequestAttributes) -> AuthzResult<AuthorizationDecision> {
		let principal = attrs.principal.as_ref().ok_or(AuthzError::MissingPrincipal)?;

		let mut visitor = AuthorizingVisitor::new(attrs, self.evaluator.as_ref(), self.policy_timeout);
		self
			.resolver
			.visit_rules_for(attrs, principal, &mut visitor)
			.await;

		let decision = visitor.into_decision();
		if decision.is_allowed() {
			debug!(reason = %decision.reason, "request allowed");
		} else {
			debug!(reason = %decision.reason, "no rule grants request");
		}
		Ok(decision)
	}
}
