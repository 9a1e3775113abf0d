// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Record layer for attrguard.
//!
//! Every path that writes an attribute mapping onto a record runs the
//! mapping through the catalog first: model construction, `create` and its
//! variants, `update_attributes`, association builders, nested attributes,
//! and the `first_or_*` / `find_or_*_by` finders. Each call takes explicit
//! [`AssignOptions`]; a record keeps a per-instance scope stack so setters
//! invoked during an assignment see the options of the call that reached
//! them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use attrguard_core::{params, ModelSpec};
//! use attrguard_record::{AssignOptions, MemoryStore, Schema};
//!
//! let mut builder = Schema::builder();
//! builder
//!     .define(ModelSpec::new("Person").columns(["name", "admin"]))
//!     .unwrap();
//! builder.declare_protected("Person", "default", ["admin"]).unwrap();
//! let schema = builder.build(Arc::new(MemoryStore::new()));
//!
//! let person = schema
//!     .model("Person")
//!     .unwrap()
//!     .create(params! { "name" => "Ada", "admin" => true }, &AssignOptions::default())
//!     .unwrap();
//! assert!(person.is_persisted());
//! assert_eq!(person.get("admin"), &serde_json::Value::Null);
//! ```

mod association;
pub mod error;
mod model;
pub mod multiparameter;
mod nested;
pub mod options;
mod record;
pub mod schema;
pub mod store;

pub use association::CollectionProxy;
pub use error::{RecordError, Result};
pub use model::{Model, Relation};
pub use options::AssignOptions;
pub use record::Record;
pub use schema::{
	Association, AssociationKind, NestedLimit, NestedOptions, RejectIf, Schema, SchemaBuilder, VirtualSetter,
	DESTROY_KEY, NESTED_SUFFIX,
};
pub use store::{MemoryStore, Row, Store, StoreError};
