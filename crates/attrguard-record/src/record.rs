// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Records and the assignment pipeline.
//!
//! Every mass assignment goes through [`Record::assign_attributes`]:
//!
//! 1. The call's options are pushed onto the record's scope stack.
//! 2. The mapping is sanitized for the model and role, then the
//!    default-protected keys are removed.
//! 3. Simple keys are applied through [`Record::set_attribute`], then
//!    multi-parameter groups, then nested mappings.
//! 4. The scope is popped, whether or not step 3 failed.
//!
//! Setters invoked outside an assignment (virtual setters, nested
//! `<association>_attributes` keys) run under the innermost active scope, or
//! the default options when none is active.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use attrguard_core::{is_multiparameter, ModelId, Params};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{RecordError, Result};
use crate::multiparameter;
use crate::options::AssignOptions;
use crate::schema::{AssociationKind, Schema};
use crate::store::{is_blank, key_string, Row};

static NULL: Value = Value::Null;

/// Options and permission marker of one in-flight assignment.
#[derive(Debug, Clone, Default)]
pub(crate) struct AssignScope {
	pub(crate) options: AssignOptions,
	pub(crate) permitted: bool,
}

/// Targets of a one-to-many association held by the owner.
#[derive(Debug, Clone, Default)]
pub(crate) struct Collection {
	pub(crate) loaded: bool,
	pub(crate) records: Vec<Record>,
}

/// A model instance: attribute values plus loaded association targets.
#[derive(Clone)]
pub struct Record {
	pub(crate) schema: Arc<Schema>,
	pub(crate) model: ModelId,
	pub(crate) attributes: Map<String, Value>,
	pub(crate) persisted: bool,
	pub(crate) destroyed: bool,
	pub(crate) marked_for_destruction: bool,
	pub(crate) singulars: BTreeMap<String, Box<Record>>,
	pub(crate) collections: BTreeMap<String, Collection>,
	pub(crate) errors: Vec<String>,
	scopes: Vec<AssignScope>,
}

impl fmt::Debug for Record {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Record")
			.field("model", &self.model)
			.field("attributes", &self.attributes)
			.field("persisted", &self.persisted)
			.field("marked_for_destruction", &self.marked_for_destruction)
			.field("singulars", &self.singulars)
			.field("collections", &self.collections)
			.finish()
	}
}

impl Record {
	/// New, unsaved instance with every column set to null.
	pub(crate) fn blank(schema: Arc<Schema>, model: ModelId) -> Result<Self> {
		let catalog = schema.catalog();
		let mut attributes = Map::new();
		attributes.insert(catalog.primary_key(model.as_str())?.to_string(), Value::Null);
		for column in catalog.columns(model.as_str())? {
			attributes.insert(column.clone(), Value::Null);
		}

		let type_column = catalog.inheritance_column(model.as_str())?;
		if catalog.parent(model.as_str())?.is_some() && attributes.contains_key(type_column) {
			attributes.insert(type_column.to_string(), Value::String(model.to_string()));
		}

		Ok(Self {
			schema,
			model,
			attributes,
			persisted: false,
			destroyed: false,
			marked_for_destruction: false,
			singulars: BTreeMap::new(),
			collections: BTreeMap::new(),
			errors: Vec::new(),
			scopes: Vec::new(),
		})
	}

	/// Instance loaded from a stored row. The type column picks the subclass.
	pub(crate) fn from_row(schema: Arc<Schema>, model: ModelId, row: Row) -> Result<Self> {
		let model = {
			let catalog = schema.catalog();
			let column = catalog.inheritance_column(model.as_str())?;
			match row.get(column) {
				Some(Value::String(name))
					if catalog.contains(name) && catalog.is_descendant_of(name, model.as_str())? =>
				{
					catalog.model_id(name)?.clone()
				}
				_ => model,
			}
		};
		let mut record = Self::blank(schema, model)?;
		record.attributes.extend(row);
		record.persisted = true;
		Ok(record)
	}

	pub fn model(&self) -> &ModelId {
		&self.model
	}

	pub fn schema(&self) -> &Arc<Schema> {
		&self.schema
	}

	/// Value of an attribute, null when unset or unknown.
	pub fn get(&self, name: &str) -> &Value {
		self.attributes.get(name).unwrap_or(&NULL)
	}

	/// Primary key value.
	pub fn id(&self) -> &Value {
		match self.schema.catalog().primary_key(self.model.as_str()) {
			Ok(pk) => self.get(pk),
			Err(_) => &NULL,
		}
	}

	pub fn attributes(&self) -> &Map<String, Value> {
		&self.attributes
	}

	pub fn is_persisted(&self) -> bool {
		self.persisted
	}

	pub fn is_new_record(&self) -> bool {
		!self.persisted && !self.destroyed
	}

	pub fn is_destroyed(&self) -> bool {
		self.destroyed
	}

	pub fn is_marked_for_destruction(&self) -> bool {
		self.marked_for_destruction
	}

	pub fn mark_for_destruction(&mut self) {
		self.marked_for_destruction = true;
	}

	/// Validation messages from the last save or [`Record::validate`].
	pub fn errors(&self) -> &[String] {
		&self.errors
	}

	/// Options of the innermost active assignment, or the defaults.
	pub fn current_options(&self) -> AssignOptions {
		self.current_scope().options
	}

	pub(crate) fn current_scope(&self) -> AssignScope {
		self.scopes.last().cloned().unwrap_or_default()
	}

	/// Mass-assigns `params` under `options`.
	pub fn assign_attributes(&mut self, params: Params, options: &AssignOptions) -> Result<()> {
		if params.is_empty() {
			return Ok(());
		}

		self.scopes.push(AssignScope {
			options: options.clone(),
			permitted: params.is_permitted(),
		});
		let result = self.assign_in_scope(params, options);
		self.scopes.pop();
		result
	}

	/// Mass-assigns `params` under the default role.
	pub fn set_attributes(&mut self, params: Params) -> Result<()> {
		self.assign_attributes(params, &AssignOptions::default())
	}

	fn assign_in_scope(&mut self, params: Params, options: &AssignOptions) -> Result<()> {
		debug!(
			model = %self.model,
			role = %options.role,
			without_protection = options.without_protection,
			keys = params.len(),
			"assigning attributes"
		);

		let schema = Arc::clone(&self.schema);
		let filtered = schema.catalog().filter(
			self.model.as_str(),
			params,
			&options.role,
			options.without_protection,
		)?;

		let mut multiparameter = Vec::new();
		let mut nested = Vec::new();
		for (key, value) in filtered {
			if is_multiparameter(&key) {
				multiparameter.push((key, value));
			} else if schema.nested_handler(&self.model, &key)?.is_some() {
				nested.push((key, value));
			} else {
				self.set_attribute(&key, value)?;
			}
		}

		if !multiparameter.is_empty() {
			for (name, value) in multiparameter::assemble(multiparameter)? {
				self.set_attribute(&name, value)?;
			}
		}

		for (key, value) in nested {
			self.set_attribute(&key, value)?;
		}
		Ok(())
	}

	/// Single-attribute setter: a virtual setter, a nested handler, or a column.
	pub fn set_attribute(&mut self, name: &str, value: Value) -> Result<()> {
		let schema = Arc::clone(&self.schema);
		if let Some(setter) = schema.virtual_setter(&self.model, name)? {
			return setter(self, value);
		}
		if let Some(handler) = schema.nested_handler(&self.model, name)? {
			let scope = self.current_scope();
			return self.assign_nested(handler, value, &scope);
		}
		self.write_attribute(name, value)
	}

	/// Writes a column directly, bypassing mass-assignment rules.
	pub fn write_attribute(&mut self, name: &str, value: Value) -> Result<()> {
		if !self.has_column(name)? {
			return Err(RecordError::unknown_attribute(&self.model, name));
		}
		trace!(model = %self.model, attribute = name, "write attribute");
		self.attributes.insert(name.to_string(), value);
		Ok(())
	}

	pub(crate) fn write_primary_key(&mut self, value: Value) -> Result<()> {
		let schema = Arc::clone(&self.schema);
		let pk = schema.catalog().primary_key(self.model.as_str())?;
		self.write_attribute(pk, value)
	}

	fn has_column(&self, name: &str) -> Result<bool> {
		let catalog = self.schema.catalog();
		Ok(catalog.primary_key(self.model.as_str())? == name
			|| catalog.columns(self.model.as_str())?.contains(name))
	}

	/// Runs presence validations on the record and its pending associated
	/// records.
	pub fn validate(&mut self) -> Result<bool> {
		let schema = Arc::clone(&self.schema);
		let mut errors = Vec::new();
		for name in schema.presence_validations(&self.model)? {
			if is_blank(self.get(name)) {
				errors.push(format!("{name} can't be blank"));
			}
		}
		for (name, target) in self.singulars.iter_mut() {
			if !target.marked_for_destruction && !target.validate()? {
				errors.push(format!("{name} is invalid"));
			}
		}
		for (name, collection) in self.collections.iter_mut() {
			for target in collection.records.iter_mut() {
				if !target.marked_for_destruction && !target.validate()? {
					errors.push(format!("{name} is invalid"));
					break;
				}
			}
		}
		self.errors = errors;
		Ok(self.errors.is_empty())
	}

	/// Persists the record and its associated records in one transaction.
	/// Returns false when validation fails.
	pub fn save(&mut self) -> Result<bool> {
		if self.destroyed {
			return Err(RecordError::RecordNotSaved {
				model: self.model.clone(),
				message: "record has been destroyed".to_string(),
			});
		}
		if !self.validate()? {
			debug!(model = %self.model, errors = ?self.errors, "save failed validation");
			return Ok(false);
		}

		let schema = Arc::clone(&self.schema);
		let store = schema.store();
		store.begin()?;
		match self.save_graph() {
			Ok(()) => {
				store.commit()?;
				Ok(true)
			}
			Err(err) => {
				store.rollback()?;
				Err(err)
			}
		}
	}

	/// Like [`Record::save`] but fails with `RecordInvalid`.
	pub fn save_bang(&mut self) -> Result<()> {
		if self.save()? {
			Ok(())
		} else {
			Err(self.invalid())
		}
	}

	pub(crate) fn invalid(&self) -> RecordError {
		RecordError::RecordInvalid {
			model: self.model.clone(),
			errors: self.errors.clone(),
		}
	}

	/// Belongs-to targets first, then the record, then has-one and has-many
	/// targets. Targets marked for destruction are deleted.
	fn save_graph(&mut self) -> Result<()> {
		let schema = Arc::clone(&self.schema);
		let names: Vec<String> = self.singulars.keys().cloned().collect();

		for name in &names {
			let association = schema.association(&self.model, name)?;
			if association.kind != AssociationKind::BelongsTo {
				continue;
			}
			if self.singulars.get(name).is_some_and(|t| t.marked_for_destruction) {
				if let Some(mut target) = self.singulars.remove(name) {
					target.destroy()?;
				}
				self.attributes.insert(association.foreign_key.clone(), Value::Null);
			} else if let Some(target) = self.singulars.get_mut(name) {
				target.save_graph()?;
				let id = target.id().clone();
				self.attributes.insert(association.foreign_key.clone(), id);
			}
		}

		self.persist_row()?;
		let owner_id = self.id().clone();

		for name in &names {
			let association = schema.association(&self.model, name)?;
			if association.kind != AssociationKind::HasOne {
				continue;
			}
			if self.singulars.get(name).is_some_and(|t| t.marked_for_destruction) {
				if let Some(mut target) = self.singulars.remove(name) {
					target.destroy()?;
				}
			} else if let Some(target) = self.singulars.get_mut(name) {
				target
					.attributes
					.insert(association.foreign_key.clone(), owner_id.clone());
				target.save_graph()?;
			}
		}

		let collections: Vec<String> = self.collections.keys().cloned().collect();
		for name in &collections {
			let association = schema.association(&self.model, name)?;
			let Some(collection) = self.collections.get_mut(name) else {
				continue;
			};
			let mut idx = 0;
			while idx < collection.records.len() {
				if collection.records[idx].marked_for_destruction {
					let mut target = collection.records.remove(idx);
					target.destroy()?;
					continue;
				}
				let target = &mut collection.records[idx];
				target
					.attributes
					.insert(association.foreign_key.clone(), owner_id.clone());
				target.save_graph()?;
				idx += 1;
			}
		}
		Ok(())
	}

	fn persist_row(&mut self) -> Result<()> {
		let schema = Arc::clone(&self.schema);
		let table = schema.table(self.model.as_str())?;
		let pk = schema.catalog().primary_key(self.model.as_str())?;
		if self.persisted {
			let id = self.id().clone();
			schema.store().update(table, pk, &id, self.attributes.clone())?;
		} else {
			let id = schema.store().insert(table, pk, self.attributes.clone())?;
			self.attributes.insert(pk.to_string(), id);
			self.persisted = true;
		}
		trace!(model = %self.model, id = %key_string(self.id()), "row persisted");
		Ok(())
	}

	/// Deletes the stored row.
	pub fn destroy(&mut self) -> Result<()> {
		if self.persisted {
			let schema = Arc::clone(&self.schema);
			let table = schema.table(self.model.as_str())?;
			let pk = schema.catalog().primary_key(self.model.as_str())?;
			let id = self.id().clone();
			schema.store().delete(table, pk, &id)?;
		}
		self.persisted = false;
		self.destroyed = true;
		Ok(())
	}

	/// Re-reads the stored row and drops loaded association targets.
	pub fn reload(&mut self) -> Result<()> {
		let schema = Arc::clone(&self.schema);
		let table = schema.table(self.model.as_str())?;
		let pk = schema.catalog().primary_key(self.model.as_str())?;
		let id = self.id().clone();
		let row = if self.persisted {
			schema.store().find(table, pk, &id)?
		} else {
			None
		};
		let row = row.ok_or_else(|| RecordError::not_found(&self.model, key_string(&id)))?;
		self.attributes.extend(row);
		self.singulars.clear();
		self.collections.clear();
		Ok(())
	}

	/// Assigns and saves inside one store transaction. A failed save rolls
	/// the store back.
	pub fn update_attributes(&mut self, params: Params, options: &AssignOptions) -> Result<bool> {
		let schema = Arc::clone(&self.schema);
		let store = schema.store();
		store.begin()?;
		let outcome = self
			.assign_attributes(params, options)
			.and_then(|()| self.save());
		match outcome {
			Ok(true) => {
				store.commit()?;
				Ok(true)
			}
			Ok(false) => {
				store.rollback()?;
				Ok(false)
			}
			Err(err) => {
				store.rollback()?;
				Err(err)
			}
		}
	}

	/// Like [`Record::update_attributes`] but fails with `RecordInvalid`.
	pub fn update_attributes_bang(&mut self, params: Params, options: &AssignOptions) -> Result<()> {
		if self.update_attributes(params, options)? {
			Ok(())
		} else {
			Err(self.invalid())
		}
	}
}
