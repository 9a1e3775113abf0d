// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute sanitization and removal policies.
//!
//! Sanitizing a candidate mapping runs three steps:
//!
//! 1. With `without_protection` the mapping passes through untouched.
//! 2. A model with no declared rules defers to the strong-parameters
//!    fallback, which only accepts explicitly permitted mappings.
//! 3. Otherwise denied keys are removed. Removed keys that are not
//!    default-protected are handed to the model's removal policy.
//!
//! Default-protected keys (primary key, type column, and `id`) are stripped
//! separately by [`Catalog::remove_protected_defaults`] and are never
//! reported.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::catalog::{Catalog, ModelId};
use crate::error::{GuardError, Result};
use crate::fallback;
use crate::params::{base_name, Params};
use crate::role::Role;

/// Receives the keys a sanitizer removed from a candidate mapping.
pub trait RemovalPolicy: Send + Sync {
	/// Called once per sanitization with a non-empty list of removed keys.
	/// Returning an error aborts the assignment.
	fn process_removed(&self, model: &ModelId, role: &Role, removed: &[String]) -> Result<()>;
}

/// Emits one warning per removed key and lets the assignment proceed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerPolicy;

impl RemovalPolicy for LoggerPolicy {
	fn process_removed(&self, model: &ModelId, role: &Role, removed: &[String]) -> Result<()> {
		for attribute in removed {
			warn!(
				model = %model,
				role = %role,
				attribute = %attribute,
				"can't mass-assign protected attribute"
			);
		}
		Ok(())
	}
}

/// Fails on the first removed key.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictPolicy;

impl RemovalPolicy for StrictPolicy {
	fn process_removed(&self, model: &ModelId, role: &Role, removed: &[String]) -> Result<()> {
		match removed.first() {
			Some(attribute) => Err(GuardError::MassAssignment {
				model: model.clone(),
				role: role.clone(),
				attribute: attribute.clone(),
				removed: removed.to_vec(),
			}),
			None => Ok(()),
		}
	}
}

/// Removal policy selected for a model or for the whole catalog.
#[derive(Clone, Default)]
pub enum SanitizerPolicy {
	#[default]
	Log,
	Strict,
	Custom(Arc<dyn RemovalPolicy>),
}

impl SanitizerPolicy {
	pub fn custom(policy: impl RemovalPolicy + 'static) -> Self {
		Self::Custom(Arc::new(policy))
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Log => "log",
			Self::Strict => "strict",
			Self::Custom(_) => "custom",
		}
	}

	pub fn process_removed(&self, model: &ModelId, role: &Role, removed: &[String]) -> Result<()> {
		match self {
			Self::Log => LoggerPolicy.process_removed(model, role, removed),
			Self::Strict => StrictPolicy.process_removed(model, role, removed),
			Self::Custom(policy) => policy.process_removed(model, role, removed),
		}
	}
}

impl fmt::Debug for SanitizerPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl fmt::Display for SanitizerPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sanitizer policy: {0} (expected \"log\" or \"strict\")")]
pub struct UnknownPolicy(pub String);

impl FromStr for SanitizerPolicy {
	type Err = UnknownPolicy;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"log" | "logger" => Ok(Self::Log),
			"strict" => Ok(Self::Strict),
			other => Err(UnknownPolicy(other.to_string())),
		}
	}
}

/// Outcome of a sanitization, with the keys that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sanitization {
	/// The mapping that may be applied.
	pub params: Params,
	/// Keys removed by the rules and reported to the removal policy.
	pub removed: Vec<String>,
	/// Default-protected keys removed without being reported.
	pub silently_removed: Vec<String>,
	/// True when the strong-parameters fallback decided the outcome.
	pub fallback: bool,
}

impl Catalog {
	/// Filters `params` against the rules for `role` and applies the model's
	/// removal policy to whatever was dropped.
	pub fn sanitize(&self, model: &str, params: Params, role: &Role, without_protection: bool) -> Result<Params> {
		Ok(self
			.sanitize_detailed(model, params, role, without_protection)?
			.params)
	}

	#[instrument(
		level = "debug",
		skip(self, model, params, role),
		fields(model = %model, role = %role, keys = params.len())
	)]
	pub fn sanitize_detailed(
		&self,
		model: &str,
		params: Params,
		role: &Role,
		without_protection: bool,
	) -> Result<Sanitization> {
		let id = self.model_id(model)?;

		if without_protection {
			return Ok(Sanitization {
				params,
				..Default::default()
			});
		}

		if !self.has_any_rules(model)? {
			return Ok(Sanitization {
				params: fallback::enforce(id, params)?,
				fallback: true,
				..Default::default()
			});
		}

		let rules = self.effective_entries(model, role)?;
		let defaults = self.protected_by_default(model)?;

		let mut outcome = Sanitization::default();
		let mut kept = Params::new();
		if params.is_permitted() {
			kept = kept.permit();
		}
		for (key, value) in params {
			if rules.denies(&key) {
				if is_protected_default(defaults, &key) {
					outcome.silently_removed.push(key);
				} else {
					outcome.removed.push(key);
				}
			} else {
				kept.insert(key, value);
			}
		}

		if !outcome.removed.is_empty() {
			self.policy_for(model)?
				.process_removed(id, role, &outcome.removed)?;
		}

		outcome.params = kept;
		Ok(outcome)
	}

	/// Strips the primary key, type column, and `id` regardless of rules,
	/// including their multi-parameter parts (`id(1i)`).
	pub fn remove_protected_defaults(&self, model: &str, mut params: Params) -> Result<Params> {
		let defaults = self.protected_by_default(model)?;
		params.retain(|key, _| !is_protected_default(defaults, key));
		Ok(params)
	}

	/// Full assignment filter: sanitization followed by removal of the
	/// default-protected keys.
	pub fn filter_detailed(
		&self,
		model: &str,
		params: Params,
		role: &Role,
		without_protection: bool,
	) -> Result<Sanitization> {
		let mut outcome = self.sanitize_detailed(model, params, role, without_protection)?;
		let defaults = self.protected_by_default(model)?;
		let mut dropped = Vec::new();
		outcome.params.retain(|key, _| {
			if is_protected_default(defaults, key) {
				dropped.push(key.to_string());
				return false;
			}
			true
		});
		outcome.silently_removed.extend(dropped);
		Ok(outcome)
	}

	pub fn filter(&self, model: &str, params: Params, role: &Role, without_protection: bool) -> Result<Params> {
		Ok(self
			.filter_detailed(model, params, role, without_protection)?
			.params)
	}
}

fn is_protected_default(defaults: &[String], key: &str) -> bool {
	let base = base_name(key);
	defaults.iter().any(|d| d == base)
}
