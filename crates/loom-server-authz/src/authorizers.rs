// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Simple authorizers composed alongside [`RbacAuthorizer`](crate::RbacAuthorizer).

use async_trait::async_trait;
use tracing::debug;

use crate::attributes::{AuthorizationDecision, RequestAttributes};
use crate::authorizer::Authorizer;
use crate::config::ClusterConfig;
use crate::error::{AuthzError, AuthzResult};

/// Allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllowAuthorizer;

#[async_trait]
impl Authorizer for AlwaysAllowAuthorizer {
	async fn authorize(&self, _attrs: &RequestAttributes) -> AuthzResult<AuthorizationDecision> {
		Ok(AuthorizationDecision::allow(""))
	}
}

/// Denies everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDenyAuthorizer;

#[async_trait]
impl Authorizer for AlwaysDenyAuthorizer {
	async fn authorize(&self, _attrs: &RequestAttributes) -> AuthzResult<AuthorizationDecision> {
		Ok(AuthorizationDecision::deny("Everything is forbidden."))
	}
}

/// Allows requests aimed at a remote cluster; those are authorized again by
/// the cluster that serves them.
#[derive(Debug, Clone, Default)]
pub struct MultiClusterAuthorizer {
	local_cluster: Option<String>,
}

impl MultiClusterAuthorizer {
	pub fn new(local_cluster: Option<String>) -> Self {
		Self {
			local_cluster: local_cluster.filter(|name| !name.is_empty()),
		}
	}

	pub fn from_config(config: &ClusterConfig) -> Self {
		Self::new(config.local_name.clone())
	}

	fn is_remote(&self, cluster: &str) -> bool {
		!cluster.is_empty() && self.local_cluster.as_deref() != Some(cluster)
	}
}

#[async_trait]
impl Authorizer for MultiClusterAuthorizer {
	async fn authorize(&self, attrs: &RequestAttributes) -> AuthzResult<AuthorizationDecision> {
		if self.is_remote(&attrs.cluster) {
			debug!(cluster = %attrs.cluster, "deferring to remote cluster");
			return Ok(AuthorizationDecision::allow(format!(
				"request targets remote cluster {:?}",
				attrs.cluster
			)));
		}
		Ok(AuthorizationDecision::no_opinion(""))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
	Exact(String),
	Prefix(String),
}

impl PathPattern {
	fn parse(pattern: &str) -> AuthzResult<Self> {
		let (body, prefix) = match pattern.strip_suffix('*') {
			Some(body) => (body, true),
			None => (pattern, false),
		};
		if body.contains('*') {
			return Err(AuthzError::InvalidPathPattern {
				pattern: pattern.to_string(),
			});
		}
		Ok(if prefix {
			PathPattern::Prefix(body.to_string())
		} else {
			PathPattern::Exact(body.to_string())
		})
	}

	fn matches(&self, path: &str) -> bool {
		match self {
			PathPattern::Exact(exact) => path == exact,
			PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
		}
	}
}

/// Allows non-resource requests whose path matches a configured pattern.
///
/// Patterns are exact paths or prefixes ending in `*`.
#[derive(Debug, Clone)]
pub struct PathAuthorizer {
	patterns: Vec<PathPattern>,
}

impl PathAuthorizer {
	pub fn new<I, S>(patterns: I) -> AuthzResult<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let patterns = patterns
			.into_iter()
			.map(|p| PathPattern::parse(p.as_ref()))
			.collect::<AuthzResult<Vec<_>>>()?;
		Ok(Self { patterns })
	}
}

#[async_trait]
impl Authorizer for PathAuthorizer {
	async fn authorize(&self, attrs: &RequestAttributes) -> AuthzResult<AuthorizationDecision> {
		if !attrs.is_resource_request && self.patterns.iter().any(|p| p.matches(&attrs.path)) {
			return Ok(AuthorizationDecision::allow(""));
		}
		Ok(AuthorizationDecision::no_opinion(""))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::attributes::Decision;
	use crate::types::Principal;

	fn request() -> RequestAttributes {
		RequestAttributes::new(Principal::new("bob"))
			.verb("get")
			.resource("pods")
	}

	#[tokio::test]
	async fn constant_authorizers() {
		let allow = AlwaysAllowAuthorizer.authorize(&request()).await.unwrap();
		assert_eq!(allow, AuthorizationDecision::allow(""));

		let deny = AlwaysDenyAuthorizer.authorize(&request()).await.unwrap();
		assert_eq!(deny.decision, Decision::Deny);
		assert_eq!(deny.reason, "Everything is forbidden.");
	}

	mod multi_cluster {
		use super::*;

		#[tokio::test]
		async fn remote_cluster_is_allowed() {
			let authorizer = MultiClusterAuthorizer::new(Some("home".to_string()));
			let decision = authorizer
				.authorize(&request().cluster("edge-1"))
				.await
				.unwrap();
			assert!(decision.is_allowed());
		}

		#[tokio::test]
		async fn local_or_empty_cluster_has_no_opinion() {
			let authorizer = MultiClusterAuthorizer::new(Some("home".to_string()));
			for cluster in ["", "home"] {
				let decision = authorizer
					.authorize(&request().cluster(cluster))
					.await
					.unwrap();
				assert_eq!(decision.decision, Decision::NoOpinion);
			}
		}

		#[tokio::test]
		async fn without_local_name_any_named_cluster_is_remote() {
			let authorizer = MultiClusterAuthorizer::from_config(&ClusterConfig::default());
			let decision = authorizer
				.authorize(&request().cluster("home"))
				.await
				.unwrap();
			assert!(decision.is_allowed());
		}
	}

	mod paths {
		use super::*;

		fn path_request(path: &str) -> RequestAttributes {
			RequestAttributes::new(Principal::new("bob"))
				.verb("get")
				.non_resource_path(path)
		}

		#[tokio::test]
		async fn exact_and_prefix_patterns() {
			let authorizer = PathAuthorizer::new(["/healthz", "/apis/*"]).unwrap();
			for path in ["/healthz", "/apis/", "/apis/apps/v1"] {
				let decision = authorizer.authorize(&path_request(path)).await.unwrap();
				assert!(decision.is_allowed(), "{path} should be allowed");
			}
			for path in ["/healthz/ready", "/api/v1"] {
				let decision = authorizer.authorize(&path_request(path)).await.unwrap();
				assert_eq!(decision.decision, Decision::NoOpinion, "{path}");
			}
		}

		#[tokio::test]
		async fn resource_requests_are_ignored() {
			let authorizer = PathAuthorizer::new(["*"]).unwrap();
			let decision = authorizer.authorize(&request()).await.unwrap();
			assert_eq!(decision.decision, Decision::NoOpinion);
		}

		#[test]
		fn inner_star_is_rejected() {
			let err = PathAuthorizer::new(["/apis/*/status"]).unwrap_err();
			assert_eq!(
				err,
				AuthzError::InvalidPathPattern {
					pattern: "/apis/*/status".to_string()
				}
			);
		}
	}
}
