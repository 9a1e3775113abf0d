// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence seam.
//!
//! The record layer never talks to a database directly. It reads and writes
//! rows through a [`Store`], and wraps multi-step writes in
//! `begin`/`commit`/`rollback`. [`MemoryStore`] keeps rows in process and
//! implements transactions as a stack of snapshots, so nested transactions
//! behave like savepoints.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::trace;

/// A stored row: column name to value.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("no row in {table} with {primary_key}={id}")]
	RowNotFound {
		table: String,
		primary_key: String,
		id: String,
	},

	#[error("duplicate {primary_key}={id} in {table}")]
	DuplicateKey {
		table: String,
		primary_key: String,
		id: String,
	},

	#[error("no transaction in progress")]
	NoTransaction,

	#[error("store backend error: {0}")]
	Backend(String),
}

/// Row storage used by records.
pub trait Store: Send + Sync {
	/// Inserts a row and returns its primary key value. A null or missing
	/// key is assigned by the store.
	fn insert(&self, table: &str, primary_key: &str, row: Row) -> Result<Value, StoreError>;

	fn update(&self, table: &str, primary_key: &str, id: &Value, row: Row) -> Result<(), StoreError>;

	fn delete(&self, table: &str, primary_key: &str, id: &Value) -> Result<(), StoreError>;

	fn find(&self, table: &str, primary_key: &str, id: &Value) -> Result<Option<Row>, StoreError>;

	/// Rows whose columns equal every condition, in insertion order.
	fn find_where(&self, table: &str, conditions: &Row) -> Result<Vec<Row>, StoreError>;

	fn begin(&self) -> Result<(), StoreError>;

	fn commit(&self) -> Result<(), StoreError>;

	fn rollback(&self) -> Result<(), StoreError>;
}

/// Canonical string form of a key value, used for id comparisons.
pub fn key_string(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

/// Returns true for null, empty or whitespace-only strings, and empty
/// collections.
pub fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(b) => !b,
		Value::String(s) => s.trim().is_empty(),
		Value::Array(a) => a.is_empty(),
		Value::Object(o) => o.is_empty(),
		Value::Number(_) => false,
	}
}

#[derive(Debug, Clone, Default)]
struct Table {
	rows: Vec<Row>,
	next_id: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
	tables: BTreeMap<String, Table>,
	snapshots: Vec<BTreeMap<String, Table>>,
}

/// In-process store with snapshot transactions.
#[derive(Debug, Default)]
pub struct MemoryStore {
	state: Mutex<MemoryState>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of rows in a table.
	pub fn count(&self, table: &str) -> usize {
		self.state.lock().tables.get(table).map_or(0, |t| t.rows.len())
	}

	/// Current transaction nesting depth.
	pub fn depth(&self) -> usize {
		self.state.lock().snapshots.len()
	}
}

fn position(table: &Table, primary_key: &str, id: &Value) -> Option<usize> {
	let wanted = key_string(id);
	table
		.rows
		.iter()
		.position(|row| row.get(primary_key).is_some_and(|v| !v.is_null() && key_string(v) == wanted))
}

impl Store for MemoryStore {
	fn insert(&self, table: &str, primary_key: &str, mut row: Row) -> Result<Value, StoreError> {
		let mut state = self.state.lock();
		let entry = state.tables.entry(table.to_string()).or_insert_with(|| Table {
			rows: Vec::new(),
			next_id: 1,
		});

		let id = match row.get(primary_key) {
			Some(id) if !id.is_null() => {
				if position(entry, primary_key, id).is_some() {
					return Err(StoreError::DuplicateKey {
						table: table.to_string(),
						primary_key: primary_key.to_string(),
						id: key_string(id),
					});
				}
				if let Some(n) = id.as_i64() {
					entry.next_id = entry.next_id.max(n + 1);
				}
				id.clone()
			}
			_ => {
				let id = Value::from(entry.next_id);
				entry.next_id += 1;
				id
			}
		};

		row.insert(primary_key.to_string(), id.clone());
		entry.rows.push(row);
		trace!(table, id = %key_string(&id), "row inserted");
		Ok(id)
	}

	fn update(&self, table: &str, primary_key: &str, id: &Value, row: Row) -> Result<(), StoreError> {
		let mut state = self.state.lock();
		let not_found = || StoreError::RowNotFound {
			table: table.to_string(),
			primary_key: primary_key.to_string(),
			id: key_string(id),
		};
		let entry = state.tables.get_mut(table).ok_or_else(not_found)?;
		let idx = position(entry, primary_key, id).ok_or_else(not_found)?;
		for (column, value) in row {
			entry.rows[idx].insert(column, value);
		}
		Ok(())
	}

	fn delete(&self, table: &str, primary_key: &str, id: &Value) -> Result<(), StoreError> {
		let mut state = self.state.lock();
		if let Some(entry) = state.tables.get_mut(table) {
			if let Some(idx) = position(entry, primary_key, id) {
				entry.rows.remove(idx);
			}
		}
		Ok(())
	}

	fn find(&self, table: &str, primary_key: &str, id: &Value) -> Result<Option<Row>, StoreError> {
		let state = self.state.lock();
		Ok(state
			.tables
			.get(table)
			.and_then(|t| position(t, primary_key, id).map(|idx| t.rows[idx].clone())))
	}

	fn find_where(&self, table: &str, conditions: &Row) -> Result<Vec<Row>, StoreError> {
		let state = self.state.lock();
		let Some(entry) = state.tables.get(table) else {
			return Ok(Vec::new());
		};
		Ok(entry
			.rows
			.iter()
			.filter(|row| {
				conditions.iter().all(|(column, expected)| {
					let actual = row.get(column).unwrap_or(&Value::Null);
					match (actual, expected) {
						(Value::Null, Value::Null) => true,
						(Value::Null, _) | (_, Value::Null) => false,
						_ => key_string(actual) == key_string(expected),
					}
				})
			})
			.cloned()
			.collect())
	}

	fn begin(&self) -> Result<(), StoreError> {
		let mut state = self.state.lock();
		let snapshot = state.tables.clone();
		state.snapshots.push(snapshot);
		Ok(())
	}

	fn commit(&self) -> Result<(), StoreError> {
		let mut state = self.state.lock();
		state.snapshots.pop().ok_or(StoreError::NoTransaction)?;
		Ok(())
	}

	fn rollback(&self) -> Result<(), StoreError> {
		let mut state = self.state.lock();
		let snapshot = state.snapshots.pop().ok_or(StoreError::NoTransaction)?;
		state.tables = snapshot;
		trace!(depth = state.snapshots.len(), "transaction rolled back");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn row(value: Value) -> Row {
		match value {
			Value::Object(map) => map,
			_ => Row::new(),
		}
	}

	#[test]
	fn assigns_sequential_ids() {
		let store = MemoryStore::new();
		let a = store.insert("people", "id", row(json!({"name": "a"}))).unwrap();
		let b = store.insert("people", "id", row(json!({"name": "b", "id": null}))).unwrap();
		assert_eq!(a, json!(1));
		assert_eq!(b, json!(2));
	}

	#[test]
	fn explicit_ids_are_kept_and_checked() {
		let store = MemoryStore::new();
		store.insert("people", "id", row(json!({"id": 5}))).unwrap();
		assert!(matches!(
			store.insert("people", "id", row(json!({"id": 5}))),
			Err(StoreError::DuplicateKey { .. })
		));
		assert_eq!(store.insert("people", "id", Row::new()).unwrap(), json!(6));
	}

	#[test]
	fn find_where_compares_stringified_values() {
		let store = MemoryStore::new();
		store
			.insert("battles", "id", row(json!({"team_id": 3})))
			.unwrap();
		let rows = store.find_where("battles", &row(json!({"team_id": "3"}))).unwrap();
		assert_eq!(rows.len(), 1);
		let none = store.find_where("battles", &row(json!({"team_id": null}))).unwrap();
		assert!(none.is_empty());
	}

	#[test]
	fn rollback_restores_snapshot() {
		let store = MemoryStore::new();
		store.insert("t", "id", Row::new()).unwrap();
		store.begin().unwrap();
		store.insert("t", "id", Row::new()).unwrap();
		store.begin().unwrap();
		store.insert("t", "id", Row::new()).unwrap();
		store.rollback().unwrap();
		assert_eq!(store.count("t"), 2);
		store.rollback().unwrap();
		assert_eq!(store.count("t"), 1);
		assert!(matches!(store.commit(), Err(StoreError::NoTransaction)));
	}

	#[test]
	fn blank_values() {
		assert!(is_blank(&json!(null)));
		assert!(is_blank(&json!("  ")));
		assert!(is_blank(&json!([])));
		assert!(!is_blank(&json!(0)));
		assert!(!is_blank(&json!("x")));
	}
}
