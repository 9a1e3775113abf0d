// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommand implementations. Each returns the text to print.

use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use attrguard_config::GuardConfig;
use attrguard_core::{wrap_keys, Catalog, Params, Role, RuleMode};
use serde_json::{json, Value};
use tracing::{debug, instrument};

fn join(names: impl IntoIterator<Item = String>) -> String {
	let names: Vec<String> = names.into_iter().collect();
	if names.is_empty() {
		"(none)".to_string()
	} else {
		names.join(", ")
	}
}

/// Summary of the loaded configuration and every declared model.
pub fn check(config: &GuardConfig, catalog: &Catalog) -> Result<String> {
	let mut out = String::new();
	writeln!(
		out,
		"policy: {}, whitelist_attributes: {}",
		config.sanitizer.policy, config.sanitizer.whitelist_attributes
	)?;
	for id in catalog.model_ids() {
		let name = id.as_str();
		let mode = catalog.mode(name)?;
		match catalog.parent(name)? {
			Some(parent) => writeln!(out, "{name} < {parent} ({mode})")?,
			None => writeln!(out, "{name} ({mode})")?,
		}
	}
	writeln!(out, "{} model(s) ok", catalog.model_ids().count())?;
	Ok(out)
}

/// Effective rules for one model and role.
pub fn rules(catalog: &Catalog, model: &str, role: &Role) -> Result<String> {
	let mode = catalog
		.mode(model)
		.with_context(|| format!("cannot show rules for {model}"))?;
	let mut out = String::new();
	writeln!(out, "model: {model}")?;
	writeln!(out, "root: {}", catalog.root_of(model)?)?;
	writeln!(out, "role: {role}")?;
	writeln!(out, "mode: {mode}")?;
	writeln!(out, "policy: {}", catalog.policy_for(model)?)?;
	writeln!(out, "primary key: {}", catalog.primary_key(model)?)?;
	writeln!(out, "inheritance column: {}", catalog.inheritance_column(model)?)?;
	match mode {
		RuleMode::Whitelist => {
			writeln!(out, "accessible: {}", join(catalog.accessible_attributes(model, role)?))?;
		}
		RuleMode::Blacklist => {
			writeln!(out, "protected: {}", join(catalog.protected_attributes(model, role)?))?;
		}
		RuleMode::Unset => {
			writeln!(out, "no rules declared; unpermitted mappings are forbidden")?;
		}
	}
	writeln!(
		out,
		"protected by default: {}",
		join(catalog.protected_by_default(model)?.iter().cloned())
	)?;
	Ok(out)
}

/// Options for a dry-run sanitization.
#[derive(Debug, Clone, Default)]
pub struct SanitizeArgs {
	pub role: Role,
	pub without_protection: bool,
	pub permit: bool,
}

/// Filters a JSON object through the model's rules and reports what was kept.
#[instrument(level = "debug", skip(catalog, model, input, args), fields(model = %model, role = %args.role))]
pub fn sanitize(catalog: &Catalog, model: &str, input: &str, args: &SanitizeArgs) -> Result<String> {
	let value: Value = serde_json::from_str(input).context("input is not valid JSON")?;
	let Value::Object(map) = value else {
		bail!("input must be a JSON object");
	};

	let mut params = Params::from_map(map);
	if args.permit {
		params = params.permit();
	}
	debug!(keys = params.len(), "sanitizing input");

	let outcome = catalog
		.filter_detailed(model, params, &args.role, args.without_protection)
		.with_context(|| format!("sanitization of {model} failed"))?;

	let report = json!({
		"model": model,
		"role": args.role,
		"params": outcome.params,
		"removed": outcome.removed,
		"silently_removed": outcome.silently_removed,
		"fallback": outcome.fallback,
	});
	Ok(serde_json::to_string_pretty(&report)?)
}

/// Keys a request wrapper should nest under the model, as a JSON array.
pub fn wrap(catalog: &Catalog, model: &str, role: &Role) -> Result<String> {
	let keys = wrap_keys(catalog, model, role)?;
	Ok(serde_json::to_string(&keys)?)
}
