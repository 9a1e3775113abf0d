// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Candidate attribute mappings.
//!
//! [`Params`] is the untrusted input to every assignment entry point. Keys are
//! normalized to strings on insertion; values keep whatever JSON shape the
//! caller supplied. The `permitted` marker is set by an upstream parameter
//! filter and is only read by the strong-parameters fallback.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opening delimiter of a multi-parameter key such as `starting(1i)`.
pub const MULTIPARAMETER_DELIMITER: char = '(';

/// String-keyed attribute mapping with an optional "already permitted" marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
	#[serde(flatten)]
	entries: Map<String, Value>,
	#[serde(skip)]
	permitted: bool,
}

impl Params {
	pub fn new() -> Self {
		Self::default()
	}

	/// Wraps an existing JSON object. Non-object values yield an empty mapping.
	pub fn from_value(value: Value) -> Self {
		match value {
			Value::Object(entries) => Self {
				entries,
				permitted: false,
			},
			_ => Self::default(),
		}
	}

	pub fn from_map(entries: Map<String, Value>) -> Self {
		Self {
			entries,
			permitted: false,
		}
	}

	/// Builds a mapping from any key type that renders as a string.
	pub fn from_pairs<K, I>(pairs: I) -> Self
	where
		K: ToString,
		I: IntoIterator<Item = (K, Value)>,
	{
		let mut params = Self::new();
		for (key, value) in pairs {
			params.insert(key, value);
		}
		params
	}

	/// Marks the mapping as explicitly permitted by an upstream filter.
	pub fn permit(mut self) -> Self {
		self.permitted = true;
		self
	}

	pub fn is_permitted(&self) -> bool {
		self.permitted
	}

	pub fn insert(&mut self, key: impl ToString, value: Value) -> Option<Value> {
		self.entries.insert(key.to_string(), value)
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.get(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.entries.remove(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &String> {
		self.entries.keys()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.entries.iter()
	}

	/// Returns a copy without the given keys, preserving the permitted marker.
	pub fn except(&self, keys: &[&str]) -> Self {
		let entries = self
			.entries
			.iter()
			.filter(|(k, _)| !keys.contains(&k.as_str()))
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect();
		Self {
			entries,
			permitted: self.permitted,
		}
	}

	/// Keeps only the entries for which `keep` returns true.
	pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
		let entries = std::mem::take(&mut self.entries);
		self.entries = entries.into_iter().filter(|(k, v)| keep(k, v)).collect();
	}

	pub fn as_map(&self) -> &Map<String, Value> {
		&self.entries
	}

	pub fn into_map(self) -> Map<String, Value> {
		self.entries
	}

	pub fn into_value(self) -> Value {
		Value::Object(self.entries)
	}
}

impl IntoIterator for Params {
	type Item = (String, Value);
	type IntoIter = serde_json::map::IntoIter;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

impl From<Map<String, Value>> for Params {
	fn from(entries: Map<String, Value>) -> Self {
		Self::from_map(entries)
	}
}

/// Returns true for keys that carry one part of a multi-parameter value.
pub fn is_multiparameter(key: &str) -> bool {
	key.contains(MULTIPARAMETER_DELIMITER)
}

/// Strips the `(Ni)` suffix of a multi-parameter key.
pub fn base_name(key: &str) -> &str {
	match key.find(MULTIPARAMETER_DELIMITER) {
		Some(idx) => &key[..idx],
		None => key,
	}
}

/// Builds a [`Params`] from `key => value` pairs.
///
/// ```
/// use attrguard_core::params;
///
/// let p = params! { "first_name" => "Josh", "id" => 5 };
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
	() => { $crate::Params::new() };
	($($key:expr => $value:expr),+ $(,)?) => {{
		let mut params = $crate::Params::new();
		$(params.insert($key, $crate::__private::json!($value));)+
		params
	}};
}
