// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Association builders.
//!
//! Every builder constructs the target through the same assignment pipeline
//! as a top-level record, then writes the foreign key through the internal
//! write path so strict removal policies never see it.

use std::collections::btree_map::Entry;
use std::sync::Arc;

use attrguard_core::Params;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{RecordError, Result};
use crate::options::AssignOptions;
use crate::record::{Collection, Record};
use crate::schema::{Association, AssociationKind};
use crate::store::key_string;

impl Record {
	/// Loaded or fetched target of a has-one or belongs-to association.
	pub fn association(&mut self, name: &str) -> Result<Option<&mut Record>> {
		let association = self.singular_association(name)?;
		if !self.singulars.contains_key(name) && self.persisted {
			if let Some(record) = self.fetch_singular(&association)? {
				self.singulars.insert(name.to_string(), Box::new(record));
			}
		}
		Ok(self.singulars.get_mut(name).map(|r| r.as_mut()))
	}

	/// Builds a new has-one or belongs-to target from `params`.
	pub fn build_association(&mut self, name: &str, params: Params, options: &AssignOptions) -> Result<&mut Record> {
		let association = self.singular_association(name)?;
		let record = self.new_associated(&association, params, options)?;
		Ok(self.replace_singular(name, record))
	}

	/// Builds and saves a has-one or belongs-to target. The record is
	/// returned whether or not it saved.
	pub fn create_association(&mut self, name: &str, params: Params, options: &AssignOptions) -> Result<&mut Record> {
		self.create_singular(name, params, options, false)
	}

	/// Like [`Record::create_association`] but fails with `RecordInvalid`.
	pub fn create_association_bang(
		&mut self,
		name: &str,
		params: Params,
		options: &AssignOptions,
	) -> Result<&mut Record> {
		self.create_singular(name, params, options, true)
	}

	/// Proxy for a has-many association.
	pub fn collection(&mut self, name: &str) -> Result<CollectionProxy<'_>> {
		let schema = Arc::clone(&self.schema);
		let association = schema.association(&self.model, name)?;
		if !association.kind.is_collection() {
			return Err(RecordError::WrongAssociationKind {
				model: self.model.clone(),
				association: name.to_string(),
				expected: "collection",
			});
		}
		Ok(CollectionProxy {
			association: association.clone(),
			owner: self,
		})
	}

	fn singular_association(&self, name: &str) -> Result<Association> {
		let association = self.schema.association(&self.model, name)?;
		if association.kind.is_collection() {
			return Err(RecordError::WrongAssociationKind {
				model: self.model.clone(),
				association: name.to_string(),
				expected: "singular",
			});
		}
		Ok(association.clone())
	}

	fn create_singular(&mut self, name: &str, params: Params, options: &AssignOptions, strict: bool) -> Result<&mut Record> {
		let association = self.singular_association(name)?;
		let mut record = self.new_associated(&association, params, options)?;
		let saved = record.save()?;
		if saved && association.kind == AssociationKind::BelongsTo {
			self.write_attribute(&association.foreign_key, record.id().clone())?;
		}
		if !saved && strict {
			return Err(record.invalid());
		}
		Ok(self.replace_singular(name, record))
	}

	/// Constructs an associated record through the assignment pipeline.
	pub(crate) fn new_associated(
		&self,
		association: &Association,
		params: Params,
		options: &AssignOptions,
	) -> Result<Record> {
		let model = self.schema.subclass_from_attributes(&association.target, &params)?;
		let mut record = Record::blank(Arc::clone(&self.schema), model)?;
		record.assign_attributes(params, options)?;
		match association.kind {
			AssociationKind::HasOne | AssociationKind::HasMany => {
				record.write_attribute(&association.foreign_key, self.id().clone())?;
			}
			AssociationKind::BelongsTo => {}
		}
		debug!(
			owner = %self.model,
			association = %association.name,
			target = %record.model,
			"built associated record"
		);
		Ok(record)
	}

	pub(crate) fn replace_singular(&mut self, name: &str, record: Record) -> &mut Record {
		match self.singulars.entry(name.to_string()) {
			Entry::Occupied(mut slot) => {
				slot.insert(Box::new(record));
				slot.into_mut()
			}
			Entry::Vacant(slot) => slot.insert(Box::new(record)),
		}
	}

	pub(crate) fn push_target(&mut self, name: &str, record: Record) -> &mut Record {
		let records = &mut self.collections.entry(name.to_string()).or_default().records;
		records.push(record);
		let idx = records.len() - 1;
		&mut records[idx]
	}

	fn fetch_singular(&self, association: &Association) -> Result<Option<Record>> {
		let schema = &self.schema;
		let target = association.target.as_str();
		let table = schema.table(target)?;
		let row = match association.kind {
			AssociationKind::HasOne => {
				let mut conditions = Map::new();
				conditions.insert(association.foreign_key.clone(), self.id().clone());
				schema.store().find_where(table, &conditions)?.into_iter().next()
			}
			AssociationKind::BelongsTo => {
				let key = self.get(&association.foreign_key);
				if key.is_null() {
					None
				} else {
					let pk = schema.catalog().primary_key(target)?;
					schema.store().find(table, pk, key)?
				}
			}
			AssociationKind::HasMany => None,
		};
		row.map(|row| Record::from_row(Arc::clone(schema), association.target.clone(), row))
			.transpose()
	}

	/// Stored targets of a has-many association owned by this record.
	pub(crate) fn fetch_collection(&self, association: &Association) -> Result<Vec<Record>> {
		if !self.persisted {
			return Ok(Vec::new());
		}
		let schema = &self.schema;
		let table = schema.table(association.target.as_str())?;
		let mut conditions = Map::new();
		conditions.insert(association.foreign_key.clone(), self.id().clone());
		schema
			.store()
			.find_where(table, &conditions)?
			.into_iter()
			.map(|row| Record::from_row(Arc::clone(schema), association.target.clone(), row))
			.collect()
	}

	/// Merges stored targets into the in-memory collection and marks it loaded.
	pub(crate) fn load_collection(&mut self, association: &Association) -> Result<()> {
		if self
			.collections
			.get(&association.name)
			.is_some_and(|c| c.loaded)
		{
			return Ok(());
		}
		let fetched = self.fetch_collection(association)?;
		let collection = self.collections.entry(association.name.clone()).or_default();
		let mut pending = std::mem::take(&mut collection.records);
		let mut merged = Vec::with_capacity(fetched.len() + pending.len());
		for record in fetched {
			let id = key_string(record.id());
			match pending
				.iter()
				.position(|r| r.persisted && key_string(r.id()) == id)
			{
				Some(idx) => merged.push(pending.remove(idx)),
				None => merged.push(record),
			}
		}
		merged.extend(pending);
		*collection = Collection {
			loaded: true,
			records: merged,
		};
		Ok(())
	}
}

/// Builder and creator for one has-many association of an owner record.
pub struct CollectionProxy<'a> {
	owner: &'a mut Record,
	association: Association,
}

impl<'a> CollectionProxy<'a> {
	pub fn association(&self) -> &Association {
		&self.association
	}

	/// Targets currently held in memory.
	pub fn target(&self) -> &[Record] {
		self.owner
			.collections
			.get(&self.association.name)
			.map(|c| c.records.as_slice())
			.unwrap_or_default()
	}

	/// Loads stored targets and returns the full collection.
	pub fn load(&mut self) -> Result<&mut [Record]> {
		self.owner.load_collection(&self.association)?;
		Ok(self
			.owner
			.collections
			.entry(self.association.name.clone())
			.or_default()
			.records
			.as_mut_slice())
	}

	/// Stored rows pointing at the owner.
	pub fn count(&self) -> Result<usize> {
		Ok(self.owner.fetch_collection(&self.association)?.len())
	}

	pub fn build(&mut self, params: Params, options: &AssignOptions) -> Result<&mut Record> {
		let record = self.owner.new_associated(&self.association, params, options)?;
		Ok(self.owner.push_target(&self.association.name, record))
	}

	/// Alias of [`CollectionProxy::build`].
	pub fn new_record(&mut self, params: Params, options: &AssignOptions) -> Result<&mut Record> {
		self.build(params, options)
	}

	/// Builds one target per mapping with the same options.
	pub fn build_many(&mut self, entries: Vec<Params>, options: &AssignOptions) -> Result<&mut [Record]> {
		let start = self.target().len();
		for params in entries {
			self.build(params, options)?;
		}
		Ok(self.tail(start))
	}

	pub fn create(&mut self, params: Params, options: &AssignOptions) -> Result<&mut Record> {
		self.create_record(params, options, false)
	}

	/// Like [`CollectionProxy::create`] but fails with `RecordInvalid`.
	pub fn create_bang(&mut self, params: Params, options: &AssignOptions) -> Result<&mut Record> {
		self.create_record(params, options, true)
	}

	pub fn create_many(&mut self, entries: Vec<Params>, options: &AssignOptions) -> Result<&mut [Record]> {
		let start = self.target().len();
		for params in entries {
			self.create_record(params, options, false)?;
		}
		Ok(self.tail(start))
	}

	fn tail(&mut self, start: usize) -> &mut [Record] {
		let records = &mut self
			.owner
			.collections
			.entry(self.association.name.clone())
			.or_default()
			.records;
		let start = start.min(records.len());
		&mut records[start..]
	}

	/// Builds and saves one target inside a store transaction. On failure
	/// the target is removed from the collection and the store rolled back.
	fn create_record(&mut self, params: Params, options: &AssignOptions, strict: bool) -> Result<&mut Record> {
		if !self.owner.persisted {
			return Err(RecordError::RecordNotSaved {
				model: self.owner.model.clone(),
				message: "you cannot call create unless the parent is saved".to_string(),
			});
		}

		let schema = Arc::clone(&self.owner.schema);
		let store = schema.store();
		store.begin()?;

		let record = match self.owner.new_associated(&self.association, params, options) {
			Ok(record) => record,
			Err(err) => {
				store.rollback()?;
				return Err(err);
			}
		};

		let records = &mut self
			.owner
			.collections
			.entry(self.association.name.clone())
			.or_default()
			.records;
		records.push(record);
		let idx = records.len() - 1;

		match records[idx].save() {
			Ok(true) => store.commit()?,
			Ok(false) if !strict => store.commit()?,
			Ok(false) => {
				let failed = records.remove(idx);
				store.rollback()?;
				return Err(failed.invalid());
			}
			Err(err) => {
				records.remove(idx);
				store.rollback()?;
				return Err(err);
			}
		}
		Ok(&mut records[idx])
	}
}

/// Ids in `entries` that are not blank, in canonical string form.
pub(crate) fn entry_ids(entries: &[Map<String, Value>]) -> Vec<String> {
	entries
		.iter()
		.filter_map(|e| e.get("id"))
		.filter(|v| !crate::store::is_blank(v))
		.map(key_string)
		.collect()
}
