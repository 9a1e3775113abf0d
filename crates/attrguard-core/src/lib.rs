// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mass-assignment protection.
//!
//! This crate decides which keys of an untrusted attribute mapping may be
//! written onto a record. Each model declares, per role, either a whitelist
//! of assignable attribute names or a blacklist of protected ones. Rules are
//! inherited down a model hierarchy and resolved into immutable snapshots.
//!
//! # Example
//!
//! ```
//! use attrguard_core::{params, Catalog, ModelSpec, Role};
//!
//! let mut builder = Catalog::builder();
//! builder.define(ModelSpec::new("Person")).unwrap();
//! builder
//!     .declare_accessible("Person", Role::DEFAULT, ["name"])
//!     .unwrap();
//! let catalog = builder.build();
//!
//! let filtered = catalog
//!     .filter("Person", params! { "name" => "Ada", "admin" => true }, &Role::DEFAULT, false)
//!     .unwrap();
//! assert_eq!(filtered, params! { "name" => "Ada" });
//! ```

pub mod catalog;
pub mod error;
pub mod fallback;
pub mod params;
pub mod role;
pub mod rules;
pub mod sanitizer;
pub mod wrapper;

pub use catalog::{Catalog, CatalogBuilder, ModelId, ModelSpec, DEFAULT_INHERITANCE_COLUMN, DEFAULT_PRIMARY_KEY};
pub use error::{GuardError, Result};
pub use params::{base_name, is_multiparameter, Params, MULTIPARAMETER_DELIMITER};
pub use role::Role;
pub use rules::{RuleMode, RuleSet};
pub use sanitizer::{LoggerPolicy, RemovalPolicy, Sanitization, SanitizerPolicy, StrictPolicy, UnknownPolicy};
pub use wrapper::wrap_keys;

#[doc(hidden)]
pub mod __private {
	pub use serde_json::json;
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn catalog() -> Catalog {
		let mut builder = Catalog::builder();
		builder
			.define(ModelSpec::new("Tight"))
			.unwrap()
			.define(ModelSpec::new("Loose"))
			.unwrap();
		builder
			.declare_accessible("Tight", Role::DEFAULT, ["name", "email"])
			.unwrap()
			.declare_protected("Loose", Role::DEFAULT, ["admin"])
			.unwrap()
			.declare_accessible("Tight", Role::from("admin"), ["name", "email", "admin"])
			.unwrap()
			.declare_protected("Loose", Role::from("admin"), Vec::<String>::new())
			.unwrap();
		builder.build()
	}

	proptest! {
		#[test]
		fn whitelist_output_is_subset_of_entries(keys in proptest::collection::vec("[a-z_]{1,8}", 0..12)) {
			let catalog = catalog();
			let params = Params::from_pairs(keys.iter().map(|k| (k.clone(), serde_json::Value::Bool(true))));
			let out = catalog.filter("Tight", params, &Role::DEFAULT, false).unwrap();
			for key in out.keys() {
				prop_assert!(key == "name" || key == "email");
			}
		}

		#[test]
		fn blacklist_keeps_everything_else(keys in proptest::collection::vec("[a-z_]{1,8}", 0..12)) {
			let catalog = catalog();
			let params = Params::from_pairs(keys.iter().map(|k| (k.clone(), serde_json::Value::Null)));
			let out = catalog.filter("Loose", params.clone(), &Role::DEFAULT, false).unwrap();
			for key in params.keys() {
				let expected = key != "admin" && key != "id" && key != "type";
				prop_assert_eq!(out.contains_key(key), expected);
			}
		}

		#[test]
		fn filtering_is_idempotent(
			keys in proptest::collection::vec("[a-z_]{1,8}(\\(1i\\))?", 0..12),
			without in any::<bool>(),
		) {
			let catalog = catalog();
			let params = Params::from_pairs(keys.iter().map(|k| (k.clone(), serde_json::Value::Bool(true))));
			for model in ["Tight", "Loose"] {
				for role in [Role::DEFAULT, Role::from("admin")] {
					let once = catalog.filter(model, params.clone(), &role, without).unwrap();
					let twice = catalog.filter(model, once.clone(), &role, without).unwrap();
					prop_assert_eq!(twice, once);
				}
			}
		}

		#[test]
		fn defaults_never_survive(value in any::<i64>(), without in any::<bool>()) {
			let catalog = catalog();
			let params = Params::from_pairs([
				("id", serde_json::json!(value)),
				("type", serde_json::json!("Other")),
			]);
			let out = catalog.filter("Loose", params, &Role::DEFAULT, without).unwrap();
			prop_assert!(out.is_empty());
		}
	}
}
