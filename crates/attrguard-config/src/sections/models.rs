// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Declarative model rules.
//!
//! Each `[[models]]` table registers one model with the catalog and lists
//! its accessible or protected attributes per role:
//!
//! ```toml
//! [[models]]
//! name = "Person"
//! columns = ["name", "email", "admin"]
//! accessible = { default = ["name", "email"], admin = ["name", "email", "admin"] }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use attrguard_core::{Catalog, CatalogBuilder, ModelSpec, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sanitizer::{PolicyName, SanitizerConfig};
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelDeclaration {
	pub name: String,
	pub parent: Option<String>,
	pub primary_key: Option<String>,
	pub inheritance_column: Option<String>,
	#[serde(default)]
	pub columns: Vec<String>,
	/// Role name to whitelisted attribute names.
	#[serde(default)]
	pub accessible: BTreeMap<String, Vec<String>>,
	/// Role name to blacklisted attribute names.
	#[serde(default)]
	pub protected: BTreeMap<String, Vec<String>>,
	#[serde(default)]
	pub accessible_none: bool,
	pub policy: Option<PolicyName>,
}

impl ModelDeclaration {
	fn spec(&self) -> ModelSpec {
		let mut spec = ModelSpec::new(self.name.as_str()).columns(self.columns.iter().cloned());
		if let Some(parent) = &self.parent {
			spec = spec.parent(parent.as_str());
		}
		if let Some(pk) = &self.primary_key {
			spec = spec.primary_key(pk.as_str());
		}
		if let Some(column) = &self.inheritance_column {
			spec = spec.inheritance_column(column.as_str());
		}
		spec
	}

	fn declare(&self, builder: &mut CatalogBuilder) -> Result<(), ConfigError> {
		if self.accessible_none {
			builder.declare_accessible_none(&self.name)?;
		}
		for (role, names) in &self.accessible {
			builder.declare_accessible(&self.name, Role::new(role.as_str()), names.iter().cloned())?;
		}
		for (role, names) in &self.protected {
			builder.declare_protected(&self.name, Role::new(role.as_str()), names.iter().cloned())?;
		}
		if let Some(policy) = self.policy {
			builder.set_sanitizer_policy(&self.name, policy.to_policy())?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelsConfig {
	pub models: Vec<ModelDeclaration>,
}

impl ModelsConfig {
	pub fn is_empty(&self) -> bool {
		self.models.is_empty()
	}

	pub fn get(&self, name: &str) -> Option<&ModelDeclaration> {
		self.models.iter().find(|m| m.name == name)
	}

	/// Declarations ordered so every parent precedes its children.
	pub fn definition_order(&self) -> Result<Vec<&ModelDeclaration>, ConfigError> {
		let mut seen = BTreeSet::new();
		for model in &self.models {
			if !seen.insert(model.name.as_str()) {
				return Err(ConfigError::validation(format!(
					"model {} is declared more than once",
					model.name
				)));
			}
		}

		let mut defined: BTreeSet<&str> = BTreeSet::new();
		let mut ordered = Vec::with_capacity(self.models.len());
		let mut pending: Vec<&ModelDeclaration> = self.models.iter().collect();
		while !pending.is_empty() {
			let before = pending.len();
			pending.retain(|model| {
				let model = *model;
				let ready = model
					.parent
					.as_deref()
					.map_or(true, |parent| defined.contains(parent));
				if ready {
					defined.insert(model.name.as_str());
					ordered.push(model);
				}
				!ready
			});
			if pending.len() == before {
				let names: Vec<&str> = pending.iter().map(|m| m.name.as_str()).collect();
				return Err(ConfigError::validation(format!(
					"models with unknown or cyclic parents: {}",
					names.join(", ")
				)));
			}
		}
		Ok(ordered)
	}

	/// Registers every declaration and returns the resulting catalog.
	pub fn build_catalog(&self, sanitizer: &SanitizerConfig) -> Result<Catalog, ConfigError> {
		Ok(self.catalog_builder(sanitizer)?.build())
	}

	/// Like [`build_catalog`](Self::build_catalog), but leaves the builder
	/// open for declarations made in code.
	pub fn catalog_builder(&self, sanitizer: &SanitizerConfig) -> Result<CatalogBuilder, ConfigError> {
		let mut builder = Catalog::builder();
		for model in self.definition_order()? {
			builder.define(model.spec())?;
		}
		builder
			.whitelist_attributes(sanitizer.whitelist_attributes)?
			.set_default_policy(sanitizer.policy.to_policy());
		for model in &self.models {
			model.declare(&mut builder)?;
		}
		debug!(models = self.models.len(), "model declarations applied");
		Ok(builder)
	}
}
