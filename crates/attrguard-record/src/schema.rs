// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Model schema table.
//!
//! A [`Schema`] pairs the authorizer [`Catalog`] with everything else the
//! record layer needs to know about a model: associations, nested-attribute
//! handlers, virtual setters, and presence validations. Lookups walk the
//! model's ancestor chain, so subclasses inherit all of them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use attrguard_core::{Catalog, CatalogBuilder, ModelId, ModelSpec, Role, SanitizerPolicy};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{RecordError, Result};
use crate::model::Model;
use crate::record::Record;
use crate::store::{is_blank, Store};

/// Suffix of the key that routes a mapping to a nested-attribute handler.
pub const NESTED_SUFFIX: &str = "_attributes";

/// Pseudo-key requesting destruction of a nested record.
pub const DESTROY_KEY: &str = "_destroy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
	HasOne,
	BelongsTo,
	HasMany,
}

impl AssociationKind {
	pub fn is_collection(self) -> bool {
		self == Self::HasMany
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
	pub name: String,
	pub kind: AssociationKind,
	pub target: ModelId,
	pub foreign_key: String,
}

/// Setter invoked by name instead of writing a column.
pub type VirtualSetter = Arc<dyn Fn(&mut Record, Value) -> Result<()> + Send + Sync>;

type RejectPredicate = Arc<dyn Fn(&Map<String, Value>) -> bool + Send + Sync>;
type LimitFn = Arc<dyn Fn(&Record) -> Option<usize> + Send + Sync>;

/// Predicate that silently skips a nested entry.
#[derive(Clone)]
pub enum RejectIf {
	/// Every value other than `_destroy` is blank.
	AllBlank,
	Predicate(RejectPredicate),
}

impl RejectIf {
	pub fn predicate(f: impl Fn(&Map<String, Value>) -> bool + Send + Sync + 'static) -> Self {
		Self::Predicate(Arc::new(f))
	}

	pub fn rejects(&self, attributes: &Map<String, Value>) -> bool {
		match self {
			Self::AllBlank => attributes
				.iter()
				.all(|(key, value)| key == DESTROY_KEY || is_blank(value)),
			Self::Predicate(f) => f(attributes),
		}
	}
}

impl fmt::Debug for RejectIf {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::AllBlank => f.write_str("AllBlank"),
			Self::Predicate(_) => f.write_str("Predicate(..)"),
		}
	}
}

/// Maximum number of entries accepted by a collection handler.
#[derive(Clone)]
pub enum NestedLimit {
	Fixed(usize),
	/// Computed from the owner record at assignment time.
	Computed(LimitFn),
}

impl NestedLimit {
	pub fn computed(f: impl Fn(&Record) -> Option<usize> + Send + Sync + 'static) -> Self {
		Self::Computed(Arc::new(f))
	}

	pub fn resolve(&self, owner: &Record) -> Option<usize> {
		match self {
			Self::Fixed(n) => Some(*n),
			Self::Computed(f) => f(owner),
		}
	}
}

impl fmt::Debug for NestedLimit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Fixed(n) => write!(f, "Fixed({n})"),
			Self::Computed(_) => f.write_str("Computed(..)"),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct NestedOptions {
	pub allow_destroy: bool,
	pub update_only: bool,
	pub reject_if: Option<RejectIf>,
	pub limit: Option<NestedLimit>,
}

impl NestedOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn allow_destroy(mut self) -> Self {
		self.allow_destroy = true;
		self
	}

	pub fn update_only(mut self) -> Self {
		self.update_only = true;
		self
	}

	pub fn reject_if(mut self, reject_if: RejectIf) -> Self {
		self.reject_if = Some(reject_if);
		self
	}

	pub fn limit(mut self, limit: NestedLimit) -> Self {
		self.limit = Some(limit);
		self
	}
}

/// Entry in the nested handler table, keyed by `<association>_attributes`.
#[derive(Debug, Clone)]
pub struct NestedHandler {
	pub association: Association,
	pub options: NestedOptions,
}

type PerModel<T> = BTreeMap<ModelId, BTreeMap<String, T>>;

/// Immutable model table shared by every record.
pub struct Schema {
	catalog: Catalog,
	associations: PerModel<Association>,
	nested: PerModel<NestedHandler>,
	setters: PerModel<VirtualSetter>,
	validations: BTreeMap<ModelId, Vec<String>>,
	store: Arc<dyn Store>,
}

impl fmt::Debug for Schema {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Schema")
			.field("catalog", &self.catalog)
			.field("associations", &self.associations)
			.field("nested", &self.nested)
			.field("setters", &self.setters.values().flat_map(|m| m.keys()).collect::<Vec<_>>())
			.field("validations", &self.validations)
			.finish()
	}
}

impl Schema {
	pub fn builder() -> SchemaBuilder {
		SchemaBuilder::new()
	}

	pub fn catalog(&self) -> &Catalog {
		&self.catalog
	}

	pub fn store(&self) -> &dyn Store {
		self.store.as_ref()
	}

	/// Handle for class-level entry points on `name`.
	pub fn model(self: &Arc<Self>, name: &str) -> Result<Model> {
		let id = self.catalog.model_id(name)?.clone();
		Ok(Model::new(Arc::clone(self), id))
	}

	/// Table that stores rows for the model (the hierarchy root).
	pub fn table(&self, model: &str) -> Result<&str> {
		Ok(self.catalog.root_of(model)?.as_str())
	}

	pub fn association(&self, model: &ModelId, name: &str) -> Result<&Association> {
		self.lookup(&self.associations, model, name)?
			.ok_or_else(|| RecordError::UnknownAssociation {
				model: model.clone(),
				association: name.to_string(),
			})
	}

	/// Nested handler registered under `key` (`<association>_attributes`).
	pub fn nested_handler(&self, model: &ModelId, key: &str) -> Result<Option<&NestedHandler>> {
		self.lookup(&self.nested, model, key)
	}

	pub fn virtual_setter(&self, model: &ModelId, name: &str) -> Result<Option<&VirtualSetter>> {
		self.lookup(&self.setters, model, name)
	}

	/// Attributes that must be present, including inherited ones.
	pub fn presence_validations(&self, model: &ModelId) -> Result<Vec<&str>> {
		let mut names = Vec::new();
		for id in self.chain(model)? {
			if let Some(own) = self.validations.get(&id) {
				names.extend(own.iter().map(String::as_str));
			}
		}
		Ok(names)
	}

	/// True when `name` is a column, the primary key, a virtual setter, or a
	/// nested handler key.
	pub fn has_attribute(&self, model: &ModelId, name: &str) -> Result<bool> {
		if self.catalog.primary_key(model.as_str())? == name
			|| self.catalog.columns(model.as_str())?.contains(name)
		{
			return Ok(true);
		}
		Ok(self.virtual_setter(model, name)?.is_some() || self.nested_handler(model, name)?.is_some())
	}

	/// Chooses the model to instantiate from the type column of `attributes`.
	///
	/// The column is only honoured when the default role's whitelist lists
	/// it. Models without rules always build themselves.
	pub fn subclass_from_attributes(
		&self,
		model: &ModelId,
		attributes: &attrguard_core::Params,
	) -> Result<ModelId> {
		let column = self.catalog.inheritance_column(model.as_str())?;
		let Some(Value::String(name)) = attributes.get(column) else {
			return Ok(model.clone());
		};
		if name.is_empty() || !self.type_column_assignable(model)? {
			return Ok(model.clone());
		}
		if !self.catalog.contains(name) || !self.catalog.is_descendant_of(name, model.as_str())? {
			return Err(RecordError::SubclassNotFound {
				model: model.clone(),
				subclass: name.clone(),
			});
		}
		Ok(self.catalog.model_id(name)?.clone())
	}

	fn type_column_assignable(&self, model: &ModelId) -> Result<bool> {
		if !self.catalog.has_any_rules(model.as_str())? {
			return Ok(false);
		}
		let column = self.catalog.inheritance_column(model.as_str())?;
		let rules = self.catalog.effective_entries(model.as_str(), &Role::DEFAULT)?;
		Ok(rules.mode() == attrguard_core::RuleMode::Whitelist && rules.includes(column))
	}

	fn chain(&self, model: &ModelId) -> Result<Vec<ModelId>> {
		let mut chain = vec![model.clone()];
		while let Some(parent) = self.catalog.parent(chain[chain.len() - 1].as_str())? {
			chain.push(parent.clone());
		}
		Ok(chain)
	}

	fn lookup<'a, T>(&'a self, table: &'a PerModel<T>, model: &ModelId, name: &str) -> Result<Option<&'a T>> {
		for id in self.chain(model)? {
			if let Some(found) = table.get(&id).and_then(|m| m.get(name)) {
				return Ok(Some(found));
			}
		}
		Ok(None)
	}
}

/// Collects model definitions, rule declarations, associations, nested
/// handlers, setters, and validations.
#[derive(Default)]
pub struct SchemaBuilder {
	catalog: CatalogBuilder,
	associations: PerModel<Association>,
	nested: PerModel<NestedHandler>,
	setters: PerModel<VirtualSetter>,
	validations: BTreeMap<ModelId, Vec<String>>,
}

impl SchemaBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts from rule declarations collected elsewhere, e.g. a config file.
	pub fn with_catalog(catalog: CatalogBuilder) -> Self {
		Self {
			catalog,
			..Default::default()
		}
	}

	pub fn define(&mut self, spec: ModelSpec) -> Result<&mut Self> {
		self.catalog.define(spec)?;
		Ok(self)
	}

	pub fn declare_accessible<I, S>(&mut self, model: &str, role: impl Into<Role>, names: I) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.catalog.declare_accessible(model, role.into(), names)?;
		Ok(self)
	}

	pub fn declare_protected<I, S>(&mut self, model: &str, role: impl Into<Role>, names: I) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.catalog.declare_protected(model, role.into(), names)?;
		Ok(self)
	}

	pub fn declare_accessible_none(&mut self, model: &str) -> Result<&mut Self> {
		self.catalog.declare_accessible_none(model)?;
		Ok(self)
	}

	pub fn whitelist_attributes(&mut self, enabled: bool) -> Result<&mut Self> {
		self.catalog.whitelist_attributes(enabled)?;
		Ok(self)
	}

	pub fn set_default_policy(&mut self, policy: SanitizerPolicy) -> &mut Self {
		self.catalog.set_default_policy(policy);
		self
	}

	pub fn set_sanitizer_policy(&mut self, model: &str, policy: SanitizerPolicy) -> Result<&mut Self> {
		self.catalog.set_sanitizer_policy(model, policy)?;
		Ok(self)
	}

	pub fn has_one(&mut self, model: &str, name: &str, target: &str, foreign_key: &str) -> Result<&mut Self> {
		self.associate(model, name, AssociationKind::HasOne, target, foreign_key)
	}

	pub fn belongs_to(&mut self, model: &str, name: &str, target: &str, foreign_key: &str) -> Result<&mut Self> {
		self.associate(model, name, AssociationKind::BelongsTo, target, foreign_key)
	}

	pub fn has_many(&mut self, model: &str, name: &str, target: &str, foreign_key: &str) -> Result<&mut Self> {
		self.associate(model, name, AssociationKind::HasMany, target, foreign_key)
	}

	/// Registers the `<association>_attributes` handler for an association
	/// already declared on the model.
	pub fn accepts_nested_attributes_for(
		&mut self,
		model: &str,
		association: &str,
		options: NestedOptions,
	) -> Result<&mut Self> {
		let id = ModelId::from(model);
		let found = self
			.associations
			.get(&id)
			.and_then(|m| m.get(association))
			.cloned()
			.ok_or_else(|| RecordError::UnknownAssociation {
				model: id.clone(),
				association: association.to_string(),
			})?;
		debug!(model, association, ?options, "nested attributes enabled");
		self.nested.entry(id).or_default().insert(
			format!("{association}{NESTED_SUFFIX}"),
			NestedHandler {
				association: found,
				options,
			},
		);
		Ok(self)
	}

	pub fn virtual_setter(
		&mut self,
		model: &str,
		name: &str,
		setter: impl Fn(&mut Record, Value) -> Result<()> + Send + Sync + 'static,
	) -> &mut Self {
		self.setters
			.entry(ModelId::from(model))
			.or_default()
			.insert(name.to_string(), Arc::new(setter));
		self
	}

	pub fn validates_presence_of<I, S>(&mut self, model: &str, names: I) -> &mut Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.validations
			.entry(ModelId::from(model))
			.or_default()
			.extend(names.into_iter().map(Into::into));
		self
	}

	pub fn build(self, store: Arc<dyn Store>) -> Arc<Schema> {
		Arc::new(Schema {
			catalog: self.catalog.build(),
			associations: self.associations,
			nested: self.nested,
			setters: self.setters,
			validations: self.validations,
			store,
		})
	}

	fn associate(
		&mut self,
		model: &str,
		name: &str,
		kind: AssociationKind,
		target: &str,
		foreign_key: &str,
	) -> Result<&mut Self> {
		let association = Association {
			name: name.to_string(),
			kind,
			target: ModelId::from(target),
			foreign_key: foreign_key.to_string(),
		};
		self.associations
			.entry(ModelId::from(model))
			.or_default()
			.insert(name.to_string(), association);
		Ok(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn map(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(m) => m,
			_ => Map::new(),
		}
	}

	#[test]
	fn all_blank_ignores_destroy_flag() {
		let reject = RejectIf::AllBlank;
		assert!(reject.rejects(&map(json!({"name": "", "_destroy": "1"}))));
		assert!(!reject.rejects(&map(json!({"name": "x"}))));
	}

	#[test]
	fn nested_handler_requires_association() {
		let mut builder = Schema::builder();
		builder.define(ModelSpec::new("Team")).unwrap();
		let err = builder
			.accepts_nested_attributes_for("Team", "battles", NestedOptions::new())
			.err();
		assert!(matches!(err, Some(RecordError::UnknownAssociation { .. })));
	}
}
