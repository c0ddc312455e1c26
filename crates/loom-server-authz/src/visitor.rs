// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visitors consuming [`BindingResolver`](crate::resolver::BindingResolver) output.

use std::ops::ControlFlow;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::attributes::{AuthorizationDecision, RequestAttributes};
use crate::error::{AggregateError, AuthzError};
use crate::policy::{PolicyError, PolicyEvaluator};
use crate::resolver::{RuleSource, RuleVisitor, Visit};
use crate::rule::rule_allows;
use crate::types::PolicyRule;

/// Stops at the first override or rule that grants the request.
pub struct AuthorizingVisitor<'a> {
	attrs: &'a RequestAttributes,
	evaluator: &'a dyn PolicyEvaluator,
	timeout: Duration,
	input: Option<serde_json::Value>,
	allowed: bool,
	reason: String,
	errors: Vec<AuthzError>,
	// Source whose override policy was evaluated and did not grant.
	overridden: Option<RuleSource>,
}

impl<'a> AuthorizingVisitor<'a> {
	pub fn new(
		attrs: &'a RequestAttributes,
		evaluator: &'a dyn PolicyEvaluator,
		timeout: Duration,
	) -> Self {
		Self {
			attrs,
			evaluator,
			timeout,
			input: None,
			allowed: false,
			reason: String::new(),
			errors: Vec::new(),
			overridden: None,
		}
	}

	pub fn allowed(&self) -> bool {
		self.allowed
	}

	pub fn errors(&self) -> &[AuthzError] {
		&self.errors
	}

	pub fn into_decision(self) -> AuthorizationDecision {
		if self.allowed {
			return AuthorizationDecision::allow(self.reason);
		}
		match AggregateError::new(self.errors) {
			Some(aggregate) => AuthorizationDecision::no_opinion(format!("RBAC: {aggregate}")),
			None => AuthorizationDecision::no_opinion(""),
		}
	}

	fn grant(&mut self, source: &RuleSource) -> ControlFlow<()> {
		self.allowed = true;
		self.reason = format!("RBAC: allowed by {source}");
		ControlFlow::Break(())
	}

	async fn override_allows(&mut self, source: &RuleSource, policy: &str) -> bool {
		let attrs = self.attrs;
		let input = self
			.input
			.get_or_insert_with(|| attrs.policy_input())
			.clone();

		let outcome = match tokio::time::timeout(self.timeout, self.evaluator.evaluate(policy, &input))
			.await
		{
			Ok(result) => result,
			Err(_) => Err(PolicyError::Timeout(self.timeout)),
		};

		match outcome {
			Ok(allowed) => allowed,
			Err(err) => {
				warn!(
					role = %source.role_ref.name,
					binding = %source.binding_name,
					error = %err,
					"override policy failed, treating as no match"
				);
				false
			}
		}
	}
}

#[async_trait]
impl<'a> RuleVisitor for AuthorizingVisitor<'a> {
	async fn visit(&mut self, item: Visit<'_>) -> ControlFlow<()> {
		match item {
			Visit::Override { source, policy } => {
				if self.override_allows(source, policy).await {
					return self.grant(source);
				}
				self.overridden = Some(source.clone());
				ControlFlow::Continue(())
			}
			Visit::Rule { source, rule } => {
				if self.overridden.as_ref() == Some(source) {
					return ControlFlow::Continue(());
				}
				if rule_allows(self.attrs, rule) {
					return self.grant(source);
				}
				ControlFlow::Continue(())
			}
			Visit::Error(err) => {
				self.errors.push(err);
				ControlFlow::Continue(())
			}
		}
	}
}

/// Collects every concrete rule and every error; never stops the walk.
#[derive(Debug, Default)]
pub struct RuleAccumulator {
	rules: Vec<PolicyRule>,
	errors: Vec<AuthzError>,
}

impl RuleAccumulator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn into_parts(self) -> (Vec<PolicyRule>, Option<AggregateError>) {
		(self.rules, AggregateError::new(self.errors))
	}
}

#[async_trait]
impl RuleVisitor for RuleAccumulator {
	async fn visit(&mut self, item: Visit<'_>) -> ControlFlow<()> {
		match item {
			Visit::Override { .. } => {}
			Visit::Rule { rule, .. } => self.rules.push(rule.clone()),
			Visit::Error(err) => self.errors.push(err),
		}
		ControlFlow::Continue(())
	}
}
