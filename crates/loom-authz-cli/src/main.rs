// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator CLI for evaluating authorization decisions against a snapshot.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use loom_server_authz::config::{load_settings, load_settings_with_file, AuthzSettings};
use loom_server_authz::{
	AuthorizationDecision, Authorizer, Decision, MemoryRepository, MultiClusterAuthorizer,
	Principal, RbacAuthorizer, RequestAttributes, ResourceScope, Snapshot,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Evaluate Loom RBAC decisions offline.
#[derive(Parser, Debug)]
#[command(name = "loom-authz", about = "Evaluate Loom authorization decisions", version)]
struct Cli {
	/// Config file (defaults to /etc/loom/authz.toml)
	#[arg(long, global = true, env = "LOOM_AUTHZ_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Decide a single request
	Check(CheckArgs),
	/// List every rule bound to a principal for a request's scope
	Rules(RequestArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
	#[command(flatten)]
	request: RequestArgs,

	/// Verb being performed (get, list, create, ...)
	#[arg(long)]
	verb: String,
}

#[derive(Args, Debug)]
struct RequestArgs {
	/// Snapshot of roles and bindings (.json or .toml)
	#[arg(long)]
	snapshot: PathBuf,

	#[arg(long)]
	user: String,

	/// Group membership; may be repeated
	#[arg(long = "group")]
	groups: Vec<String>,

	#[arg(long, default_value = "")]
	resource: String,

	#[arg(long, default_value = "")]
	subresource: String,

	/// Name of the resource instance
	#[arg(long, default_value = "")]
	name: String,

	#[arg(long, default_value = "")]
	api_group: String,

	#[arg(long, default_value = "")]
	namespace: String,

	#[arg(long, default_value = "")]
	workspace: String,

	#[arg(long, default_value = "")]
	project: String,

	#[arg(long, default_value = "")]
	cluster: String,

	/// Non-resource URL path; makes this a non-resource request
	#[arg(long)]
	path: Option<String>,

	/// global, workspace, namespace, project or cluster
	#[arg(long, default_value = "cluster")]
	scope: ResourceScope,
}

impl RequestArgs {
	fn attributes(&self, verb: &str) -> RequestAttributes {
		let principal = self
			.groups
			.iter()
			.fold(Principal::new(self.user.clone()), |p, g| p.with_group(g.clone()));

		let attrs = RequestAttributes::new(principal)
			.verb(verb)
			.api_group(self.api_group.clone())
			.resource(self.resource.clone())
			.subresource(self.subresource.clone())
			.name(self.name.clone())
			.namespace(self.namespace.clone())
			.workspace(self.workspace.clone())
			.project(self.project.clone())
			.cluster(self.cluster.clone())
			.scope(self.scope);

		match &self.path {
			Some(path) => attrs.non_resource_path(path.clone()),
			None => attrs,
		}
	}

	fn repository(&self) -> anyhow::Result<Arc<MemoryRepository>> {
		let snapshot = Snapshot::from_path(&self.snapshot)
			.with_context(|| format!("loading snapshot {}", self.snapshot.display()))?;
		tracing::debug!(
			roles = snapshot.roles.len(),
			bindings = snapshot.bindings.len(),
			"snapshot loaded"
		);
		Ok(Arc::new(MemoryRepository::new(snapshot)))
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();

	let settings = match &cli.config {
		Some(path) => load_settings_with_file(path.clone()),
		None => load_settings(),
	}
	.context("loading authorizer configuration")?;

	init_tracing(&settings);

	match cli.command {
		Command::Check(args) => check(&settings, &args).await,
		Command::Rules(args) => rules(&settings, &args).await,
	}
}

fn init_tracing(settings: &AuthzSettings) {
	let json = settings.logging.json;
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| settings.logging.level.clone().into()),
		)
		.with(json.then(|| {
			tracing_subscriber::fmt::layer()
				.json()
				.with_writer(std::io::stderr)
		}))
		.with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
		.init();
}

async fn check(settings: &AuthzSettings, args: &CheckArgs) -> anyhow::Result<ExitCode> {
	let repository = args.request.repository()?;
	let attrs = args.request.attributes(&args.verb);

	let mut chain: Vec<Box<dyn Authorizer>> = Vec::new();
	if settings.cluster.multicluster_enabled {
		chain.push(Box::new(MultiClusterAuthorizer::from_config(&settings.cluster)));
	}
	chain.push(Box::new(RbacAuthorizer::from_settings(repository, settings)));

	let decision = first_opinion(&chain, &attrs).await?;
	println!("{}", serde_json::to_string_pretty(&decision)?);

	Ok(if decision.is_allowed() {
		ExitCode::SUCCESS
	} else {
		ExitCode::from(1)
	})
}

/// Runs authorizers in order; the first Allow or Deny wins.
async fn first_opinion(
	chain: &[Box<dyn Authorizer>],
	attrs: &RequestAttributes,
) -> anyhow::Result<AuthorizationDecision> {
	let mut reasons = Vec::new();
	for authorizer in chain {
		let decision = authorizer.authorize(attrs).await?;
		if decision.decision != Decision::NoOpinion {
			return Ok(decision);
		}
		if !decision.reason.is_empty() {
			reasons.push(decision.reason);
		}
	}
	Ok(AuthorizationDecision::no_opinion(reasons.join("; ")))
}

async fn rules(settings: &AuthzSettings, args: &RequestArgs) -> anyhow::Result<ExitCode> {
	let authorizer = RbacAuthorizer::from_settings(args.repository()?, settings);
	let resolved = authorizer.rules_for(&args.attributes("")).await?;

	println!("{}", serde_json::to_string_pretty(&resolved.rules)?);
	if let Some(errors) = resolved.errors {
		eprintln!("errors: {errors}");
	}
	Ok(ExitCode::SUCCESS)
}
