// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Matching binding subjects against the requesting principal.

use crate::types::{Principal, Subject, SubjectKind};

/// API group of platform-issued service accounts.
pub const PLATFORM_API_GROUP: &str = "iam.loom.dev";

/// Identity scheme used to turn a service account into a username.
///
/// Selected by the subject's API group; new identity back-ends are added here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAccountScheme {
	/// `system:serviceaccount:<namespace>:<name>`
	Core,
	/// `loom:serviceaccount:<namespace>:<name>`
	Platform,
}

impl ServiceAccountScheme {
	/// Scheme for a subject API group; `None` if the group is not recognised.
	pub fn for_api_group(api_group: Option<&str>) -> Option<Self> {
		match api_group.unwrap_or("") {
			"" => Some(ServiceAccountScheme::Core),
			PLATFORM_API_GROUP => Some(ServiceAccountScheme::Platform),
			_ => None,
		}
	}

	fn prefix(self) -> &'static str {
		match self {
			ServiceAccountScheme::Core => "system:serviceaccount:",
			ServiceAccountScheme::Platform => "loom:serviceaccount:",
		}
	}

	/// Fully-qualified username of the service account `name` in `namespace`.
	pub fn username(self, namespace: &str, name: &str) -> String {
		format!("{}{namespace}:{name}", self.prefix())
	}
}

/// Returns the index of the first subject that covers `principal`.
///
/// `context_namespace` is used for service account subjects that do not name a
/// namespace themselves.
pub fn applies_to(
	principal: &Principal,
	subjects: &[Subject],
	context_namespace: &str,
) -> Option<usize> {
	subjects
		.iter()
		.position(|subject| applies_to_subject(principal, subject, context_namespace))
}

/// Returns true if a single subject covers `principal`.
pub fn applies_to_subject(principal: &Principal, subject: &Subject, context_namespace: &str) -> bool {
	match subject.kind {
		// "*" is a literal username here, not "all users".
		SubjectKind::User => principal.name == subject.name,
		SubjectKind::Group => principal.in_group(&subject.name),
		SubjectKind::ServiceAccount => {
			let Some(namespace) = effective_namespace(subject, context_namespace) else {
				return false;
			};
			let Some(scheme) = ServiceAccountScheme::for_api_group(subject.api_group.as_deref())
			else {
				return false;
			};
			principal.name == scheme.username(namespace, &subject.name)
		}
		SubjectKind::Unknown => false,
	}
}

/// Namespace a service account subject lives in, falling back to the context.
pub fn effective_namespace<'a>(subject: &'a Subject, context_namespace: &'a str) -> Option<&'a str> {
	subject
		.namespace
		.as_deref()
		.filter(|ns| !ns.is_empty())
		.or(Some(context_namespace))
		.filter(|ns| !ns.is_empty())
}

/// Short description of a subject for decision reasons.
pub fn describe_subject(subject: &Subject, context_namespace: &str) -> String {
	match subject.kind {
		SubjectKind::User => format!("User {:?}", subject.name),
		SubjectKind::Group => format!("Group {:?}", subject.name),
		SubjectKind::ServiceAccount => match effective_namespace(subject, context_namespace) {
			Some(ns) => format!("ServiceAccount \"{ns}/{}\"", subject.name),
			None => format!("ServiceAccount {:?}", subject.name),
		},
		SubjectKind::Unknown => format!("unknown subject {:?}", subject.name),
	}
}
