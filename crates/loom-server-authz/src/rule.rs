// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Matching of a single [`PolicyRule`] against a request.
//!
//! All functions here are pure. A field list containing [`WILDCARD`] matches
//! every value of that field.

use crate::attributes::RequestAttributes;
use crate::types::{PolicyRule, WILDCARD};

/// Returns true if `rule` grants the request described by `attrs`.
pub fn rule_allows(attrs: &RequestAttributes, rule: &PolicyRule) -> bool {
	if attrs.is_resource_request {
		let combined = attrs.combined_resource();
		return verb_matches(rule, &attrs.verb)
			&& api_group_matches(rule, &attrs.api_group)
			&& resource_matches(rule, &combined, &attrs.subresource)
			&& resource_name_matches(rule, &attrs.resource_name);
	}

	verb_matches(rule, &attrs.verb) && non_resource_url_matches(rule, &attrs.path)
}

/// Returns true if any rule in `rules` grants the request.
pub fn rules_allow(attrs: &RequestAttributes, rules: &[PolicyRule]) -> bool {
	rules.iter().any(|rule| rule_allows(attrs, rule))
}

pub fn verb_matches(rule: &PolicyRule, verb: &str) -> bool {
	rule.verbs.iter().any(|v| v == WILDCARD || v == verb)
}

pub fn api_group_matches(rule: &PolicyRule, api_group: &str) -> bool {
	rule.api_groups.iter().any(|g| g == WILDCARD || g == api_group)
}

/// Matches `resource` or `resource/subresource` against the rule's resources.
///
/// A bare entry covers the resource together with all of its subresources, an
/// explicit `resource/subresource` entry covers only that pair and
/// `*/subresource` covers that subresource of every resource.
pub fn resource_matches(rule: &PolicyRule, combined: &str, subresource: &str) -> bool {
	let base = match combined.split_once('/') {
		Some((base, _)) => base,
		None => combined,
	};

	rule.resources.iter().any(|entry| {
		if entry == WILDCARD || entry == combined || entry == base {
			return true;
		}
		if subresource.is_empty() {
			return false;
		}
		entry
			.strip_prefix("*/")
			.is_some_and(|sub| sub == subresource)
	})
}

/// An empty name list, or one containing [`WILDCARD`], matches any name.
pub fn resource_name_matches(rule: &PolicyRule, name: &str) -> bool {
	rule.resource_names.is_empty()
		|| rule.resource_names.iter().any(|n| n == WILDCARD || n == name)
}

/// Matches a request path against the rule's non-resource URLs.
///
/// An entry ending in `*` matches by prefix; a lone `*` matches every path.
pub fn non_resource_url_matches(rule: &PolicyRule, path: &str) -> bool {
	rule.non_resource_urls.iter().any(|url| {
		if url == WILDCARD || url == path {
			return true;
		}
		url
			.strip_suffix('*')
			.is_some_and(|prefix| path.starts_with(prefix))
	})
}
