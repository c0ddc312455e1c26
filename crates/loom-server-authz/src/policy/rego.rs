// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use regorus::{Engine, Value};
use tracing::trace;

use super::cache::{policy_digest, PolicyCache, DEFAULT_CAPACITY};
use super::{PolicyError, PolicyEvaluator, PolicyResult};

/// Rule queried in every override policy.
pub const ALLOW_QUERY: &str = "data.authz.allow";

const POLICY_PATH: &str = "override.rego";

/// Rego evaluator backed by `regorus`, with compiled policies cached by digest.
///
/// Evaluation runs on the blocking pool; callers are expected to bound it with
/// a deadline.
#[derive(Clone)]
pub struct RegoEvaluator {
	cache: Arc<Mutex<PolicyCache<Engine>>>,
}

impl Default for RegoEvaluator {
	fn default() -> Self {
		Self::new()
	}
}

impl RegoEvaluator {
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			cache: Arc::new(Mutex::new(PolicyCache::new(capacity))),
		}
	}

	/// Number of compiled policies currently cached.
	pub fn cached_policies(&self) -> usize {
		lock(&self.cache).len()
	}
}

#[async_trait]
impl PolicyEvaluator for RegoEvaluator {
	async fn evaluate(&self, policy: &str, input: &serde_json::Value) -> PolicyResult<bool> {
		let cache = Arc::clone(&self.cache);
		let policy = policy.to_string();
		let input = serde_json::to_string(input)?;

		tokio::task::spawn_blocking(move || evaluate_blocking(&cache, &policy, &input))
			.await
			.map_err(|e| PolicyError::Evaluation {
				message: format!("evaluation task failed: {e}"),
			})?
	}
}

fn evaluate_blocking(
	cache: &Mutex<PolicyCache<Engine>>,
	policy: &str,
	input: &str,
) -> PolicyResult<bool> {
	let mut engine = compiled(cache, policy)?;
	let input = Value::from_json_str(input).map_err(|e| PolicyError::Evaluation {
		message: e.to_string(),
	})?;
	engine.set_input(input);

	let result = engine
		.eval_rule(ALLOW_QUERY.to_string())
		.map_err(|e| PolicyError::Evaluation {
			message: e.to_string(),
		})?;
	Ok(matches!(result, Value::Bool(true)))
}

fn compiled(cache: &Mutex<PolicyCache<Engine>>, policy: &str) -> PolicyResult<Engine> {
	let digest = policy_digest(policy);
	if let Some(engine) = lock(cache).get(&digest) {
		trace!(digest = %digest, "policy cache hit");
		return Ok(engine);
	}

	let mut engine = Engine::new();
	engine.set_rego_v0(true);
	engine
		.add_policy(POLICY_PATH.to_string(), split_statements(policy).into_owned())
		.map_err(|e| PolicyError::Compile {
			message: e.to_string(),
		})?;

	lock(cache).insert(digest, engine.clone());
	Ok(engine)
}

/// Rewrites `;` statement separators to newlines.
///
/// Policies are often stored as one line (`package authz; default allow = false; ...`),
/// which the parser rejects at the top level. Inside rule bodies a newline is
/// an equivalent separator. String literals and comments are left untouched.
fn split_statements(policy: &str) -> Cow<'_, str> {
	if !policy.contains(';') {
		return Cow::Borrowed(policy);
	}

	let mut out = String::with_capacity(policy.len());
	let mut chars = policy.chars();
	while let Some(c) = chars.next() {
		match c {
			';' => out.push('\n'),
			'"' => {
				out.push(c);
				while let Some(c) = chars.next() {
					out.push(c);
					match c {
						'\\' => {
							if let Some(escaped) = chars.next() {
								out.push(escaped);
							}
						}
						'"' => break,
						_ => {}
					}
				}
			}
			'`' => {
				out.push(c);
				for c in chars.by_ref() {
					out.push(c);
					if c == '`' {
						break;
					}
				}
			}
			'#' => {
				out.push(c);
				for c in chars.by_ref() {
					out.push(c);
					if c == '\n' {
						break;
					}
				}
			}
			_ => out.push(c),
		}
	}
	Cow::Owned(out)
}

// A poisoned cache only means another evaluation panicked mid-update; the
// entries themselves are still valid compiled policies.
fn lock(cache: &Mutex<PolicyCache<Engine>>) -> MutexGuard<'_, PolicyCache<Engine>> {
	cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
