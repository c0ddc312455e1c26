// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Override policy evaluation.
//!
//! A role may carry a Rego policy that replaces its rule list. The policy sees
//! the request as `input` (see [`RequestAttributes::policy_input`]) and grants
//! access only when `data.authz.allow` evaluates to exactly `true`.
//!
//! [`RequestAttributes::policy_input`]: crate::attributes::RequestAttributes::policy_input

mod cache;
mod rego;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use cache::{policy_digest, PolicyCache, DEFAULT_CAPACITY};
pub use rego::{RegoEvaluator, ALLOW_QUERY};

pub type PolicyResult<T> = Result<T, PolicyError>;

#[derive(Error, Debug)]
pub enum PolicyError {
	#[error("policy compile error: {message}")]
	Compile { message: String },

	#[error("policy evaluation error: {message}")]
	Evaluation { message: String },

	#[error("policy evaluation timed out after {0:?}")]
	Timeout(Duration),

	#[error("policy input error: {0}")]
	Input(#[from] serde_json::Error),
}

/// Evaluates override policies against a request input document.
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
	/// Returns true only if the policy's allow rule is literally `true`.
	async fn evaluate(&self, policy: &str, input: &serde_json::Value) -> PolicyResult<bool>;
}
