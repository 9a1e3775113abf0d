// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-model authorizer registry.
//!
//! A [`Catalog`] owns every model's rule declarations, keyed by an explicit
//! [`ModelId`]. Declarations are collected through a [`CatalogBuilder`] at
//! definition time; the built catalog is read-only apart from a cache of
//! effective rule-set snapshots computed on first use per (model, role).
//!
//! Effective rules for a role are the union of the model's own entries with
//! every ancestor's entries for that role. A role that no model in the chain
//! ever declared falls back to the default role. A hierarchy is either
//! entirely whitelist or entirely blacklist; mixing is rejected when the
//! offending declaration is made.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{GuardError, Result};
use crate::role::Role;
use crate::rules::{RuleMode, RuleSet};
use crate::sanitizer::SanitizerPolicy;

/// Primary key column used when a model does not name one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";
/// Type-discriminator column used when a model does not name one.
pub const DEFAULT_INHERITANCE_COLUMN: &str = "type";

/// Identifier of a model class registered with a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ModelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for ModelId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ModelId {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for ModelId {
	fn from(name: String) -> Self {
		Self(name)
	}
}

/// Schema facts about a model, supplied by the host mapping layer.
///
/// Unset keys inherit from the parent model, then fall back to `id` and
/// `type`. Columns accumulate down the hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
	pub name: ModelId,
	pub parent: Option<ModelId>,
	pub primary_key: Option<String>,
	pub inheritance_column: Option<String>,
	#[serde(default)]
	pub columns: Vec<String>,
}

impl ModelSpec {
	pub fn new(name: impl Into<ModelId>) -> Self {
		Self {
			name: name.into(),
			..Default::default()
		}
	}

	pub fn parent(mut self, parent: impl Into<ModelId>) -> Self {
		self.parent = Some(parent.into());
		self
	}

	pub fn primary_key(mut self, column: impl Into<String>) -> Self {
		self.primary_key = Some(column.into());
		self
	}

	pub fn inheritance_column(mut self, column: impl Into<String>) -> Self {
		self.inheritance_column = Some(column.into());
		self
	}

	pub fn columns<I, S>(mut self, columns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.columns.extend(columns.into_iter().map(Into::into));
		self
	}
}

#[derive(Debug, Clone)]
struct ModelEntry {
	id: ModelId,
	parent: Option<ModelId>,
	primary_key: String,
	inheritance_column: String,
	columns: BTreeSet<String>,
	protected_by_default: Vec<String>,
	mode: Option<RuleMode>,
	roles: BTreeMap<Role, BTreeSet<String>>,
	declared: bool,
	policy: Option<SanitizerPolicy>,
}

impl ModelEntry {
	fn resolve(spec: ModelSpec, parent: Option<&ModelEntry>) -> Self {
		let primary_key = spec
			.primary_key
			.or_else(|| parent.map(|p| p.primary_key.clone()))
			.unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string());
		let inheritance_column = spec
			.inheritance_column
			.or_else(|| parent.map(|p| p.inheritance_column.clone()))
			.unwrap_or_else(|| DEFAULT_INHERITANCE_COLUMN.to_string());

		let mut columns: BTreeSet<String> = parent.map(|p| p.columns.clone()).unwrap_or_default();
		columns.extend(spec.columns);

		let mut protected_by_default = vec![primary_key.clone(), inheritance_column.clone()];
		if primary_key != DEFAULT_PRIMARY_KEY {
			protected_by_default.push(DEFAULT_PRIMARY_KEY.to_string());
		}

		Self {
			id: spec.name,
			parent: spec.parent,
			primary_key,
			inheritance_column,
			columns,
			protected_by_default,
			mode: None,
			roles: BTreeMap::new(),
			declared: false,
			policy: None,
		}
	}
}

/// Collects model definitions and rule declarations.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
	models: BTreeMap<ModelId, ModelEntry>,
	whitelist_by_default: bool,
	default_policy: SanitizerPolicy,
}

impl CatalogBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a model. Its parent must already be registered.
	pub fn define(&mut self, spec: ModelSpec) -> Result<&mut Self> {
		if self.models.contains_key(&spec.name) {
			return Err(GuardError::configuration(&spec.name, "model defined twice"));
		}
		let parent = match &spec.parent {
			Some(parent) => Some(self.models.get(parent).ok_or_else(|| {
				GuardError::configuration(&spec.name, format!("unknown parent model {parent}"))
			})?),
			None => None,
		};
		let entry = ModelEntry::resolve(spec, parent);
		debug!(model = %entry.id, primary_key = %entry.primary_key, "model defined");
		self.models.insert(entry.id.clone(), entry);
		Ok(self)
	}

	/// Treats every root model as if it declared an empty whitelist.
	pub fn whitelist_attributes(&mut self, enabled: bool) -> Result<&mut Self> {
		if enabled {
			if let Some(entry) = self
				.models
				.values()
				.find(|e| e.mode == Some(RuleMode::Blacklist))
			{
				return Err(GuardError::configuration(
					&entry.id,
					"whitelist_attributes conflicts with declared protected attributes",
				));
			}
		}
		self.whitelist_by_default = enabled;
		Ok(self)
	}

	/// Whitelists `names` for `role`. Repeated declarations accumulate.
	pub fn declare_accessible<I, S>(&mut self, model: &str, role: Role, names: I) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.declare(model, role, RuleMode::Whitelist, names)?;
		Ok(self)
	}

	/// Blacklists `names` for `role`. Repeated declarations accumulate.
	pub fn declare_protected<I, S>(&mut self, model: &str, role: Role, names: I) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.declare(model, role, RuleMode::Blacklist, names)?;
		Ok(self)
	}

	/// Declares that the model accepts no mass-assigned attributes in any
	/// role, unless a role (or a subclass) later whitelists names explicitly.
	pub fn declare_accessible_none(&mut self, model: &str) -> Result<&mut Self> {
		self.declare(model, Role::DEFAULT, RuleMode::Whitelist, Vec::<String>::new())?;
		Ok(self)
	}

	/// Policy applied to removed keys for models with no policy of their own.
	pub fn set_default_policy(&mut self, policy: SanitizerPolicy) -> &mut Self {
		self.default_policy = policy;
		self
	}

	/// Overrides the removal policy for a model and its descendants.
	pub fn set_sanitizer_policy(&mut self, model: &str, policy: SanitizerPolicy) -> Result<&mut Self> {
		let entry = self
			.models
			.get_mut(model)
			.ok_or_else(|| GuardError::UnknownModel(ModelId::from(model)))?;
		entry.policy = Some(policy);
		Ok(self)
	}

	pub fn build(self) -> Catalog {
		debug!(models = self.models.len(), "catalog built");
		Catalog {
			models: self.models,
			whitelist_by_default: self.whitelist_by_default,
			default_policy: self.default_policy,
			snapshots: RwLock::new(HashMap::new()),
		}
	}

	fn declare<I, S>(&mut self, model: &str, role: Role, mode: RuleMode, names: I) -> Result<()>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let id = self
			.models
			.get(model)
			.map(|e| e.id.clone())
			.ok_or_else(|| GuardError::UnknownModel(ModelId::from(model)))?;

		if let Some(existing) = self.hierarchy_mode(&id) {
			if existing != mode {
				return Err(GuardError::configuration(
					&id,
					format!("cannot declare {mode} rules in a hierarchy that already uses {existing} rules"),
				));
			}
		}

		let names: Vec<String> = names.into_iter().map(Into::into).collect();
		trace!(model = %id, role = %role, %mode, names = ?names, "declaring rules");

		if let Some(entry) = self.models.get_mut(model) {
			entry.mode = Some(mode);
			entry.declared = true;
			entry.roles.entry(role).or_default().extend(names);
		}
		Ok(())
	}

	/// Mode already established by the model, its ancestors, or its descendants.
	fn hierarchy_mode(&self, id: &ModelId) -> Option<RuleMode> {
		if self.whitelist_by_default {
			return Some(RuleMode::Whitelist);
		}
		self
			.models
			.values()
			.filter(|entry| entry.mode.is_some())
			.find(|entry| self.is_related(&entry.id, id))
			.and_then(|entry| entry.mode)
	}

	fn is_related(&self, a: &ModelId, b: &ModelId) -> bool {
		is_ancestor_or_self(&self.models, a, b) || is_ancestor_or_self(&self.models, b, a)
	}
}

fn is_ancestor_or_self(models: &BTreeMap<ModelId, ModelEntry>, ancestor: &ModelId, model: &ModelId) -> bool {
	let mut current = Some(model);
	while let Some(id) = current {
		if id == ancestor {
			return true;
		}
		current = models.get(id).and_then(|e| e.parent.as_ref());
	}
	false
}

/// Read-only authorizer registry with a lazily filled snapshot cache.
pub struct Catalog {
	models: BTreeMap<ModelId, ModelEntry>,
	whitelist_by_default: bool,
	default_policy: SanitizerPolicy,
	snapshots: RwLock<HashMap<(ModelId, Role), Arc<RuleSet>>>,
}

impl fmt::Debug for Catalog {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Catalog")
			.field("models", &self.models.keys().collect::<Vec<_>>())
			.field("whitelist_by_default", &self.whitelist_by_default)
			.field("default_policy", &self.default_policy)
			.finish()
	}
}

impl Catalog {
	pub fn builder() -> CatalogBuilder {
		CatalogBuilder::new()
	}

	pub fn contains(&self, model: &str) -> bool {
		self.models.contains_key(model)
	}

	pub fn model_ids(&self) -> impl Iterator<Item = &ModelId> {
		self.models.keys()
	}

	pub fn model_id(&self, model: &str) -> Result<&ModelId> {
		Ok(&self.entry(model)?.id)
	}

	pub fn parent(&self, model: &str) -> Result<Option<&ModelId>> {
		Ok(self.entry(model)?.parent.as_ref())
	}

	pub fn primary_key(&self, model: &str) -> Result<&str> {
		Ok(&self.entry(model)?.primary_key)
	}

	pub fn inheritance_column(&self, model: &str) -> Result<&str> {
		Ok(&self.entry(model)?.inheritance_column)
	}

	pub fn columns(&self, model: &str) -> Result<&BTreeSet<String>> {
		Ok(&self.entry(model)?.columns)
	}

	/// Topmost ancestor of the model (the model itself for roots).
	pub fn root_of(&self, model: &str) -> Result<&ModelId> {
		let chain = self.chain(model)?;
		Ok(&chain[chain.len() - 1].id)
	}

	/// Returns true when `model` is `ancestor` or inherits from it.
	pub fn is_descendant_of(&self, model: &str, ancestor: &str) -> Result<bool> {
		Ok(self.chain(model)?.iter().any(|e| e.id.as_str() == ancestor))
	}

	/// Primary key, type column, and `id` when the primary key is named otherwise.
	pub fn protected_by_default(&self, model: &str) -> Result<&[String]> {
		Ok(&self.entry(model)?.protected_by_default)
	}

	/// True when the model or any ancestor declared a rule in any role.
	pub fn has_any_rules(&self, model: &str) -> Result<bool> {
		if self.whitelist_by_default {
			self.entry(model)?;
			return Ok(true);
		}
		Ok(self.chain(model)?.iter().any(|e| e.declared))
	}

	/// Rule mode shared by the model's hierarchy.
	pub fn mode(&self, model: &str) -> Result<RuleMode> {
		let chain = self.chain(model)?;
		let declared = chain.iter().find_map(|e| e.mode);
		Ok(match declared {
			Some(mode) => mode,
			None if self.whitelist_by_default => RuleMode::Whitelist,
			None => RuleMode::Unset,
		})
	}

	/// Effective rule set for `role`, merged across the ancestor chain.
	pub fn effective_entries(&self, model: &str, role: &Role) -> Result<Arc<RuleSet>> {
		let id = self.model_id(model)?.clone();
		let key = (id, role.clone());
		if let Some(snapshot) = self.snapshots.read().get(&key) {
			return Ok(Arc::clone(snapshot));
		}

		let snapshot = Arc::new(self.compute_entries(model, role)?);
		trace!(model = %key.0, role = %role, mode = %snapshot.mode(), "cached rule snapshot");
		let mut snapshots = self.snapshots.write();
		Ok(Arc::clone(snapshots.entry(key).or_insert(snapshot)))
	}

	/// Whitelisted names for the role; empty unless the hierarchy whitelists.
	pub fn accessible_attributes(&self, model: &str, role: &Role) -> Result<BTreeSet<String>> {
		let rules = self.effective_entries(model, role)?;
		Ok(match rules.mode() {
			RuleMode::Whitelist => rules.entries().clone(),
			_ => BTreeSet::new(),
		})
	}

	/// Blacklisted names for the role plus the default-protected names.
	pub fn protected_attributes(&self, model: &str, role: &Role) -> Result<BTreeSet<String>> {
		let rules = self.effective_entries(model, role)?;
		let mut names: BTreeSet<String> = self.protected_by_default(model)?.iter().cloned().collect();
		if rules.mode() == RuleMode::Blacklist {
			names.extend(rules.entries().iter().cloned());
		}
		Ok(names)
	}

	/// Removal policy for the model: its own, the nearest ancestor's, or the
	/// catalog default.
	pub fn policy_for(&self, model: &str) -> Result<&SanitizerPolicy> {
		let chain = self.chain(model)?;
		Ok(chain
			.iter()
			.find_map(|e| e.policy.as_ref())
			.unwrap_or(&self.default_policy))
	}

	fn compute_entries(&self, model: &str, role: &Role) -> Result<RuleSet> {
		let mode = self.mode(model)?;
		let chain = self.chain(model)?;

		let role_declared = chain.iter().any(|e| e.roles.contains_key(role));
		let effective_role = if role.is_default() || role_declared {
			role
		} else {
			&Role::DEFAULT
		};

		let mut set = RuleSet::new(mode);
		for entry in &chain {
			if let Some(names) = entry.roles.get(effective_role) {
				set.extend(names.iter().cloned());
			}
		}
		Ok(set)
	}

	fn entry(&self, model: &str) -> Result<&ModelEntry> {
		self
			.models
			.get(model)
			.ok_or_else(|| GuardError::UnknownModel(ModelId::from(model)))
	}

	fn chain(&self, model: &str) -> Result<Vec<&ModelEntry>> {
		let mut chain = vec![self.entry(model)?];
		while let Some(parent) = chain[chain.len() - 1].parent.as_ref() {
			chain.push(self.entry(parent.as_str())?);
		}
		Ok(chain)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn role(name: &str) -> Role {
		Role::from(name)
	}

	fn loose_hierarchy() -> Catalog {
		let mut builder = Catalog::builder();
		builder
			.define(ModelSpec::new("LoosePerson").columns(["first_name", "gender", "comments"]))
			.unwrap()
			.define(ModelSpec::new("SpecialLoosePerson").parent("LoosePerson"))
			.unwrap()
			.define(ModelSpec::new("LooseDescendant").parent("SpecialLoosePerson"))
			.unwrap()
			.define(ModelSpec::new("LooseDescendantSecond").parent("LooseDescendant"))
			.unwrap();
		builder
			.declare_protected("SpecialLoosePerson", Role::DEFAULT, ["credit_rating", "administrator"])
			.unwrap()
			.declare_protected("SpecialLoosePerson", role("admin"), ["credit_rating"])
			.unwrap()
			.declare_protected("LooseDescendant", Role::DEFAULT, ["phone_number"])
			.unwrap()
			.declare_protected("LooseDescendantSecond", Role::DEFAULT, ["phone_number"])
			.unwrap()
			.declare_protected("LooseDescendantSecond", Role::DEFAULT, ["name"])
			.unwrap();
		builder.build()
	}

	fn set(names: &[&str]) -> BTreeSet<String> {
		names.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn blacklist_inheritance_unions_ancestors() {
		let catalog = loose_hierarchy();
		let rules = catalog.effective_entries("LooseDescendant", &Role::DEFAULT).unwrap();
		assert_eq!(rules.mode(), RuleMode::Blacklist);
		assert_eq!(
			rules.entries(),
			&set(&["credit_rating", "administrator", "phone_number"])
		);
	}

	#[test]
	fn repeated_declarations_merge() {
		let catalog = loose_hierarchy();
		let rules = catalog
			.effective_entries("LooseDescendantSecond", &Role::DEFAULT)
			.unwrap();
		assert_eq!(
			rules.entries(),
			&set(&["credit_rating", "administrator", "phone_number", "name"])
		);
	}

	#[test]
	fn declared_role_does_not_fall_back() {
		let catalog = loose_hierarchy();
		let rules = catalog.effective_entries("SpecialLoosePerson", &role("admin")).unwrap();
		assert_eq!(rules.entries(), &set(&["credit_rating"]));
	}

	#[test]
	fn undeclared_role_falls_back_to_default() {
		let catalog = loose_hierarchy();
		let rules = catalog
			.effective_entries("SpecialLoosePerson", &role("moderator"))
			.unwrap();
		assert_eq!(rules.entries(), &set(&["credit_rating", "administrator"]));
	}

	#[test]
	fn protected_attributes_include_defaults() {
		let catalog = loose_hierarchy();
		let names = catalog
			.protected_attributes("SpecialLoosePerson", &Role::DEFAULT)
			.unwrap();
		assert!(names.contains("id"));
		assert!(names.contains("type"));
		assert!(names.contains("credit_rating"));
		assert!(catalog
			.accessible_attributes("SpecialLoosePerson", &Role::DEFAULT)
			.unwrap()
			.is_empty());
	}

	#[test]
	fn whitelist_inheritance_per_role() {
		let mut builder = Catalog::builder();
		builder
			.define(ModelSpec::new("SpecialTightPerson"))
			.unwrap()
			.define(ModelSpec::new("TightDescendant").parent("SpecialTightPerson"))
			.unwrap();
		builder
			.declare_accessible("SpecialTightPerson", Role::DEFAULT, ["name", "address"])
			.unwrap()
			.declare_accessible("SpecialTightPerson", role("admin"), ["name", "address", "admin"])
			.unwrap()
			.declare_accessible("TightDescendant", Role::DEFAULT, ["phone_number"])
			.unwrap()
			.declare_accessible("TightDescendant", role("admin"), ["super_powers"])
			.unwrap();
		let catalog = builder.build();

		assert_eq!(
			catalog
				.accessible_attributes("TightDescendant", &Role::DEFAULT)
				.unwrap(),
			set(&["name", "address", "phone_number"])
		);
		assert_eq!(
			catalog
				.accessible_attributes("TightDescendant", &role("admin"))
				.unwrap(),
			set(&["name", "address", "admin", "super_powers"])
		);
		let protected = catalog
			.protected_attributes("TightDescendant", &Role::DEFAULT)
			.unwrap();
		assert_eq!(protected, set(&["id", "type"]));
	}

	#[test]
	fn mixing_modes_in_one_class_is_rejected() {
		let mut builder = Catalog::builder();
		builder.define(ModelSpec::new("Person")).unwrap();
		builder
			.declare_accessible("Person", Role::DEFAULT, ["name"])
			.unwrap();
		let err = builder
			.declare_protected("Person", role("admin"), ["admin"])
			.unwrap_err();
		assert!(matches!(err, GuardError::Configuration { .. }));
	}

	#[test]
	fn mixing_modes_across_hierarchy_is_rejected() {
		let mut builder = Catalog::builder();
		builder
			.define(ModelSpec::new("Base"))
			.unwrap()
			.define(ModelSpec::new("Child").parent("Base"))
			.unwrap();
		builder
			.declare_protected("Child", Role::DEFAULT, ["secret"])
			.unwrap();
		assert!(builder
			.declare_accessible("Base", Role::DEFAULT, ["name"])
			.is_err());
	}

	#[test]
	fn sibling_hierarchies_are_independent() {
		let mut builder = Catalog::builder();
		builder
			.define(ModelSpec::new("A"))
			.unwrap()
			.define(ModelSpec::new("B"))
			.unwrap();
		builder.declare_protected("A", Role::DEFAULT, ["x"]).unwrap();
		builder.declare_accessible("B", Role::DEFAULT, ["y"]).unwrap();
		let catalog = builder.build();
		assert_eq!(catalog.mode("A").unwrap(), RuleMode::Blacklist);
		assert_eq!(catalog.mode("B").unwrap(), RuleMode::Whitelist);
	}

	#[test]
	fn accessible_none_denies_every_role() {
		let mut builder = Catalog::builder();
		builder.define(ModelSpec::new("Battle")).unwrap();
		builder.declare_accessible_none("Battle").unwrap();
		let catalog = builder.build();

		assert!(catalog.has_any_rules("Battle").unwrap());
		for name in ["default", "admin"] {
			let rules = catalog.effective_entries("Battle", &role(name)).unwrap();
			assert_eq!(rules.mode(), RuleMode::Whitelist);
			assert!(rules.denies("team_id"));
		}
	}

	#[test]
	fn no_declarations_means_no_rules() {
		let mut builder = Catalog::builder();
		builder.define(ModelSpec::new("Book")).unwrap();
		let catalog = builder.build();
		assert!(!catalog.has_any_rules("Book").unwrap());
		assert_eq!(catalog.mode("Book").unwrap(), RuleMode::Unset);
	}

	#[test]
	fn whitelist_by_default_applies_to_every_model() {
		let mut builder = Catalog::builder();
		builder.whitelist_attributes(true).unwrap();
		builder.define(ModelSpec::new("Book")).unwrap();
		assert!(builder
			.declare_protected("Book", Role::DEFAULT, ["title"])
			.is_err());
		let catalog = builder.build();
		assert!(catalog.has_any_rules("Book").unwrap());
		assert!(catalog
			.effective_entries("Book", &Role::DEFAULT)
			.unwrap()
			.denies("title"));
	}

	#[test]
	fn whitelist_by_default_rejects_existing_blacklist() {
		let mut builder = Catalog::builder();
		builder.define(ModelSpec::new("Book")).unwrap();
		builder
			.declare_protected("Book", Role::DEFAULT, ["title"])
			.unwrap();
		assert!(builder.whitelist_attributes(true).is_err());
	}

	#[test]
	fn custom_primary_key_protects_id_too() {
		let mut builder = Catalog::builder();
		builder
			.define(ModelSpec::new("Keyboard").primary_key("key_number"))
			.unwrap()
			.define(ModelSpec::new("Subscriber").primary_key("nick"))
			.unwrap()
			.define(ModelSpec::new("Task"))
			.unwrap();
		let catalog = builder.build();
		assert_eq!(
			catalog.protected_by_default("Keyboard").unwrap(),
			&["key_number", "type", "id"]
		);
		assert_eq!(catalog.protected_by_default("Task").unwrap(), &["id", "type"]);
	}

	#[test]
	fn subclass_inherits_schema_facts() {
		let mut builder = Catalog::builder();
		builder
			.define(
				ModelSpec::new("Company")
					.primary_key("company_id")
					.columns(["name", "rating"]),
			)
			.unwrap()
			.define(ModelSpec::new("Firm").parent("Company").columns(["firm_name"]))
			.unwrap();
		let catalog = builder.build();
		assert_eq!(catalog.primary_key("Firm").unwrap(), "company_id");
		assert!(catalog.columns("Firm").unwrap().contains("rating"));
		assert_eq!(catalog.root_of("Firm").unwrap().as_str(), "Company");
		assert!(catalog.is_descendant_of("Firm", "Company").unwrap());
		assert!(!catalog.is_descendant_of("Company", "Firm").unwrap());
	}

	#[test]
	fn unknown_parent_is_rejected() {
		let mut builder = Catalog::builder();
		assert!(builder.define(ModelSpec::new("Orphan").parent("Nobody")).is_err());
	}

	#[test]
	fn snapshots_are_shared() {
		let catalog = loose_hierarchy();
		let a = catalog.effective_entries("LooseDescendant", &Role::DEFAULT).unwrap();
		let b = catalog.effective_entries("LooseDescendant", &Role::DEFAULT).unwrap();
		assert!(Arc::ptr_eq(&a, &b));
	}
}
