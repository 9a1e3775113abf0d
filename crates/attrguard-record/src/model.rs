// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Class-level entry points: construction, creation, lookups, and scoped
//! relations.

use std::sync::Arc;

use attrguard_core::{GuardError, ModelId, Params};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{RecordError, Result};
use crate::options::AssignOptions;
use crate::record::Record;
use crate::schema::Schema;
use crate::store::key_string;

/// Handle on one model of a [`Schema`].
#[derive(Debug, Clone)]
pub struct Model {
	schema: Arc<Schema>,
	id: ModelId,
}

impl Model {
	pub(crate) fn new(schema: Arc<Schema>, id: ModelId) -> Self {
		Self { schema, id }
	}

	pub fn id(&self) -> &ModelId {
		&self.id
	}

	pub fn schema(&self) -> &Arc<Schema> {
		&self.schema
	}

	/// Builds an unsaved record from `params`. A permitted type column picks
	/// the subclass to instantiate.
	#[instrument(level = "debug", skip(self, params, options), fields(model = %self.id, role = %options.role))]
	pub fn new_record(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		let model = self.schema.subclass_from_attributes(&self.id, &params)?;
		let mut record = Record::blank(Arc::clone(&self.schema), model)?;
		record.assign_attributes(params, options)?;
		Ok(record)
	}

	/// Builds and saves. The record is returned whether or not it saved.
	pub fn create(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		let mut record = self.new_record(params, options)?;
		record.save()?;
		Ok(record)
	}

	/// Like [`Model::create`] but fails with `RecordInvalid`.
	pub fn create_bang(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		let mut record = self.new_record(params, options)?;
		record.save_bang()?;
		Ok(record)
	}

	/// Creates one record per mapping with the same options.
	pub fn create_all(&self, entries: Vec<Params>, options: &AssignOptions) -> Result<Vec<Record>> {
		entries
			.into_iter()
			.map(|params| self.create(params, options))
			.collect()
	}

	pub fn create_all_bang(&self, entries: Vec<Params>, options: &AssignOptions) -> Result<Vec<Record>> {
		entries
			.into_iter()
			.map(|params| self.create_bang(params, options))
			.collect()
	}

	/// Loads the stored record with primary key `id`.
	pub fn find(&self, id: impl Into<Value>) -> Result<Record> {
		let id = id.into();
		let table = self.schema.table(self.id.as_str())?;
		let pk = self.schema.catalog().primary_key(self.id.as_str())?;
		let row = self
			.schema
			.store()
			.find(table, pk, &id)?
			.ok_or_else(|| RecordError::not_found(&self.id, key_string(&id)))?;
		let record = Record::from_row(Arc::clone(&self.schema), self.id.clone(), row)?;
		if !self.schema.catalog().is_descendant_of(record.model().as_str(), self.id.as_str())? {
			return Err(RecordError::not_found(&self.id, key_string(&id)));
		}
		Ok(record)
	}

	pub fn all(&self) -> Result<Vec<Record>> {
		self.scoped(Map::new()).to_vec()
	}

	/// Relation over rows whose columns equal `conditions`.
	pub fn scoped(&self, conditions: Map<String, Value>) -> Relation {
		Relation {
			model: self.clone(),
			conditions,
		}
	}

	/// Returns the first record matching `params`, or builds one from them.
	pub fn find_or_initialize_by(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		self.guard_finder(&params, options)?;
		match self.scoped(params.as_map().clone()).first()? {
			Some(record) => Ok(record),
			None => self.new_record(params, options),
		}
	}

	/// Returns the first record matching `params`, or creates one from them.
	pub fn find_or_create_by(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		self.guard_finder(&params, options)?;
		match self.scoped(params.as_map().clone()).first()? {
			Some(record) => Ok(record),
			None => self.create(params, options),
		}
	}

	pub fn find_or_create_by_bang(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		self.guard_finder(&params, options)?;
		match self.scoped(params.as_map().clone()).first()? {
			Some(record) => Ok(record),
			None => self.create_bang(params, options),
		}
	}

	/// Finder lookups read unfiltered keys, so a model without rules refuses
	/// unpermitted mappings before searching.
	fn guard_finder(&self, params: &Params, options: &AssignOptions) -> Result<()> {
		if options.without_protection || params.is_permitted() {
			return Ok(());
		}
		if !self.schema.catalog().has_any_rules(self.id.as_str())? {
			return Err(GuardError::ForbiddenAttributes { model: self.id.clone() }.into());
		}
		Ok(())
	}
}

/// Rows of a model filtered by column equality.
#[derive(Debug, Clone)]
pub struct Relation {
	model: Model,
	conditions: Map<String, Value>,
}

impl Relation {
	pub fn conditions(&self) -> &Map<String, Value> {
		&self.conditions
	}

	/// Matching records, restricted to the model and its subclasses.
	pub fn to_vec(&self) -> Result<Vec<Record>> {
		let schema = &self.model.schema;
		let id = &self.model.id;
		let table = schema.table(id.as_str())?;
		let mut records = Vec::new();
		for row in schema.store().find_where(table, &self.conditions)? {
			let record = Record::from_row(Arc::clone(schema), id.clone(), row)?;
			if schema.catalog().is_descendant_of(record.model().as_str(), id.as_str())? {
				records.push(record);
			}
		}
		Ok(records)
	}

	pub fn first(&self) -> Result<Option<Record>> {
		Ok(self.to_vec()?.into_iter().next())
	}

	pub fn count(&self) -> Result<usize> {
		Ok(self.to_vec()?.len())
	}

	/// Builds a record carrying the relation's conditions, then assigns
	/// `params` over them.
	pub fn new_record(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		let schema = &self.model.schema;
		let model = schema.subclass_from_attributes(&self.model.id, &params)?;
		let mut record = Record::blank(Arc::clone(schema), model)?;
		for (column, value) in &self.conditions {
			record.write_attribute(column, value.clone())?;
		}
		record.assign_attributes(params, options)?;
		Ok(record)
	}

	pub fn create(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		let mut record = self.new_record(params, options)?;
		record.save()?;
		Ok(record)
	}

	pub fn create_bang(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		let mut record = self.new_record(params, options)?;
		record.save_bang()?;
		Ok(record)
	}

	/// First matching record, or a new one built from `params`.
	pub fn first_or_initialize(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		match self.first()? {
			Some(record) => Ok(record),
			None => self.new_record(params, options),
		}
	}

	pub fn first_or_create(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		match self.first()? {
			Some(record) => {
				debug!(model = %self.model.id, "first_or_create found an existing record");
				Ok(record)
			}
			None => self.create(params, options),
		}
	}

	pub fn first_or_create_bang(&self, params: Params, options: &AssignOptions) -> Result<Record> {
		match self.first()? {
			Some(record) => Ok(record),
			None => self.create_bang(params, options),
		}
	}
}
