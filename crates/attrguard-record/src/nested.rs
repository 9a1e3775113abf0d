// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Nested-attribute handlers.
//!
//! A mapping under `<association>_attributes` updates, builds, or marks for
//! destruction the associated records. `id` and `_destroy` are protocol
//! keys: they steer the handler and are never assigned as data. Without
//! protection an `id` that matches nothing builds a new record carrying that
//! id, written through the internal write path.

use std::cmp::Ordering;

use attrguard_core::Params;
use serde_json::{Map, Value};
use tracing::debug;

use crate::association::entry_ids;
use crate::error::{RecordError, Result};
use crate::record::{AssignScope, Record};
use crate::schema::{Association, NestedHandler, NestedOptions, DESTROY_KEY};
use crate::store::{is_blank, key_string};

const ID_KEY: &str = "id";

/// Values of `_destroy` that request destruction.
const TRUTHY: &[&str] = &["1", "t", "T", "true", "TRUE", "on", "ON"];

pub(crate) fn has_destroy_flag(attributes: &Map<String, Value>) -> bool {
	match attributes.get(DESTROY_KEY) {
		Some(Value::Bool(flag)) => *flag,
		Some(Value::Number(n)) => n.as_i64() == Some(1),
		Some(Value::String(s)) => TRUTHY.contains(&s.as_str()),
		_ => false,
	}
}

/// A record flagged for destruction is never rejected.
fn call_reject_if(options: &NestedOptions, attributes: &Map<String, Value>) -> bool {
	if has_destroy_flag(attributes) {
		return false;
	}
	options
		.reject_if
		.as_ref()
		.is_some_and(|reject| reject.rejects(attributes))
}

fn reject_new_record(options: &NestedOptions, attributes: &Map<String, Value>) -> bool {
	has_destroy_flag(attributes) || call_reject_if(options, attributes)
}

fn nested_id(attributes: &Map<String, Value>) -> Option<String> {
	attributes
		.get(ID_KEY)
		.filter(|v| !is_blank(v))
		.map(key_string)
}

/// Strips protocol keys. Returns the assignable mapping and, when running
/// without protection, the explicit id to write onto a new record.
fn assignable(mut attributes: Map<String, Value>, scope: &AssignScope) -> (Params, Option<Value>) {
	attributes.remove(DESTROY_KEY);
	let id = attributes.remove(ID_KEY);
	let explicit_id = if scope.options.without_protection {
		id.filter(|v| !is_blank(v))
	} else {
		None
	};
	let mut params = Params::from_map(attributes);
	if scope.permitted {
		params = params.permit();
	}
	(params, explicit_id)
}

fn assign_to_or_mark_for_destruction(
	record: &mut Record,
	attributes: Map<String, Value>,
	allow_destroy: bool,
	scope: &AssignScope,
) -> Result<()> {
	let destroy = has_destroy_flag(&attributes);
	let (params, _) = assignable(attributes, scope);
	record.assign_attributes(params, &scope.options)?;
	if destroy && allow_destroy {
		record.mark_for_destruction();
	}
	Ok(())
}

/// Numeric keys first, in numeric order, then the rest lexically.
fn compare_keys(a: &str, b: &str) -> Ordering {
	match (a.parse::<u64>(), b.parse::<u64>()) {
		(Ok(x), Ok(y)) => x.cmp(&y),
		(Ok(_), Err(_)) => Ordering::Less,
		(Err(_), Ok(_)) => Ordering::Greater,
		(Err(_), Err(_)) => a.cmp(b),
	}
}

fn as_mapping(association: &str, value: Value) -> Result<Map<String, Value>> {
	match value {
		Value::Object(map) => Ok(map),
		other => Err(RecordError::invalid_nested(
			association,
			format!("expected a mapping per entry, got {other}"),
		)),
	}
}

/// Normalizes a collection payload into a list of entry mappings.
fn collection_entries(association: &str, value: Value) -> Result<Vec<Map<String, Value>>> {
	match value {
		Value::Array(items) => items
			.into_iter()
			.map(|item| as_mapping(association, item))
			.collect(),
		Value::Object(map) if map.contains_key(ID_KEY) => Ok(vec![map]),
		Value::Object(map) => {
			let mut pairs: Vec<(String, Value)> = map.into_iter().collect();
			pairs.sort_by(|(a, _), (b, _)| compare_keys(a, b));
			pairs
				.into_iter()
				.map(|(_, item)| as_mapping(association, item))
				.collect()
		}
		other => Err(RecordError::invalid_nested(
			association,
			format!("expected a mapping or a sequence, got {other}"),
		)),
	}
}

impl Record {
	pub(crate) fn assign_nested(&mut self, handler: &NestedHandler, value: Value, scope: &AssignScope) -> Result<()> {
		debug!(
			model = %self.model,
			association = %handler.association.name,
			role = %scope.options.role,
			without_protection = scope.options.without_protection,
			"assigning nested attributes"
		);
		if handler.association.kind.is_collection() {
			return self.assign_nested_collection(handler, value, scope);
		}
		let attributes = match value {
			Value::Object(map) => map,
			other => {
				return Err(RecordError::invalid_nested(
					&handler.association.name,
					format!("expected a mapping, got {other}"),
				))
			}
		};
		self.assign_nested_one_to_one(handler, attributes, scope)
	}

	fn assign_nested_one_to_one(
		&mut self,
		handler: &NestedHandler,
		attributes: Map<String, Value>,
		scope: &AssignScope,
	) -> Result<()> {
		let association = &handler.association;
		let options = &handler.options;
		let id = nested_id(&attributes);

		if options.update_only || id.is_some() {
			let rejected = call_reject_if(options, &attributes);
			if let Some(existing) = self.association(&association.name)? {
				if options.update_only || id.as_deref() == Some(key_string(existing.id()).as_str()) {
					if !rejected {
						assign_to_or_mark_for_destruction(existing, attributes, options.allow_destroy, scope)?;
					}
					return Ok(());
				}
			}
		}

		if let Some(id) = &id {
			if !scope.options.without_protection {
				return Err(RecordError::not_found(&association.target, id.clone()));
			}
		}

		if reject_new_record(options, &attributes) {
			return Ok(());
		}

		let record = self.build_nested(association, attributes, scope)?;
		self.replace_singular(&association.name, record);
		Ok(())
	}

	fn assign_nested_collection(&mut self, handler: &NestedHandler, value: Value, scope: &AssignScope) -> Result<()> {
		let association = &handler.association;
		let options = &handler.options;

		let size = match &value {
			Value::Object(map) => map.len(),
			Value::Array(items) => items.len(),
			other => {
				return Err(RecordError::invalid_nested(
					&association.name,
					format!("expected a mapping or a sequence, got {other}"),
				))
			}
		};
		if let Some(limit) = options.limit.as_ref().and_then(|limit| limit.resolve(self)) {
			if size > limit {
				return Err(RecordError::TooManyRecords { limit, got: size });
			}
		}

		let entries = collection_entries(&association.name, value)?;
		self.preload_nested_targets(association, &entries)?;

		for attributes in entries {
			let Some(id) = nested_id(&attributes) else {
				if !reject_new_record(options, &attributes) {
					let record = self.build_nested(association, attributes, scope)?;
					self.push_target(&association.name, record);
				}
				continue;
			};

			let existing = self
				.collections
				.get_mut(&association.name)
				.and_then(|c| c.records.iter_mut().find(|r| key_string(r.id()) == id));
			match existing {
				Some(record) => {
					if !call_reject_if(options, &attributes) {
						assign_to_or_mark_for_destruction(record, attributes, options.allow_destroy, scope)?;
					}
				}
				None if scope.options.without_protection => {
					let record = self.build_nested(association, attributes, scope)?;
					self.push_target(&association.name, record);
				}
				None => return Err(RecordError::not_found(&association.target, id)),
			}
		}
		Ok(())
	}

	/// Pulls stored targets named by entry ids into an unloaded collection.
	fn preload_nested_targets(&mut self, association: &Association, entries: &[Map<String, Value>]) -> Result<()> {
		if self
			.collections
			.get(&association.name)
			.is_some_and(|c| c.loaded)
		{
			return Ok(());
		}
		let ids = entry_ids(entries);
		if ids.is_empty() {
			return Ok(());
		}
		let fetched = self.fetch_collection(association)?;
		let collection = self.collections.entry(association.name.clone()).or_default();
		for record in fetched {
			let id = key_string(record.id());
			let held = collection.records.iter().any(|r| key_string(r.id()) == id);
			if ids.contains(&id) && !held {
				collection.records.push(record);
			}
		}
		Ok(())
	}

	fn build_nested(
		&mut self,
		association: &Association,
		attributes: Map<String, Value>,
		scope: &AssignScope,
	) -> Result<Record> {
		let (params, explicit_id) = assignable(attributes, scope);
		let mut record = self.new_associated(association, params, &scope.options)?;
		if let Some(id) = explicit_id {
			record.write_primary_key(id)?;
		}
		Ok(record)
	}
}
