// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use thiserror::Error;

use crate::types::{RoleKind, Scope};

/// Result type alias for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Errors raised while resolving roles and bindings.
///
/// Everything except [`AuthzError::MissingPrincipal`] is recovered by the
/// resolver and surfaces only as part of a NoOpinion reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
	/// `qualifier` is the namespace of a Role or the workspace of a WorkspaceRole.
	#[error("{kind} \"{}\" not found", qualified(.qualifier.as_deref(), .name))]
	RoleNotFound {
		kind: RoleKind,
		qualifier: Option<String>,
		name: String,
	},

	#[error("namespace \"{name}\" not found")]
	NamespaceNotFound { name: String },

	#[error("project \"{id}\" not found")]
	ProjectNotFound { id: String },

	#[error("no {scope} role binding found for user \"{user}\"")]
	NoRoleBinding { scope: Scope, user: String },

	#[error("repository error: {message}")]
	Repository { message: String },

	#[error("request attributes carry no principal")]
	MissingPrincipal,

	#[error("invalid snapshot: {message}")]
	Snapshot { message: String },

	#[error("invalid path pattern \"{pattern}\": only a single trailing '*' is supported")]
	InvalidPathPattern { pattern: String },
}

impl AuthzError {
	pub fn role_not_found(kind: RoleKind, qualifier: Option<&str>, name: &str) -> Self {
		AuthzError::RoleNotFound {
			kind,
			qualifier: qualifier.filter(|q| !q.is_empty()).map(str::to_string),
			name: name.to_string(),
		}
	}

	pub fn repository(message: impl Into<String>) -> Self {
		AuthzError::Repository {
			message: message.into(),
		}
	}

	/// Returns true for lookups of entities that do not (yet) exist.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			AuthzError::RoleNotFound { .. }
				| AuthzError::NamespaceNotFound { .. }
				| AuthzError::ProjectNotFound { .. }
				| AuthzError::NoRoleBinding { .. }
		)
	}
}

fn qualified(namespace: Option<&str>, name: &str) -> String {
	match namespace {
		Some(ns) => format!("{ns}/{name}"),
		None => name.to_string(),
	}
}

/// Non-fatal errors collected over one resolver walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError(Vec<AuthzError>);

impl AggregateError {
	/// Wraps the errors, or returns `None` when there are none.
	pub fn new(errors: Vec<AuthzError>) -> Option<Self> {
		if errors.is_empty() {
			None
		} else {
			Some(Self(errors))
		}
	}

	pub fn errors(&self) -> &[AuthzError] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for AggregateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let [only] = self.0.as_slice() {
			return write!(f, "{only}");
		}
		f.write_str("[")?;
		for (i, err) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{err}")?;
		}
		f.write_str("]")
	}
}

impl std::error::Error for AggregateError {}
