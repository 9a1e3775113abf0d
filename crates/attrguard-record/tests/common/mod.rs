// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared model fixtures for the record-layer integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use attrguard_core::{params, ModelSpec, Params, SanitizerPolicy};
use attrguard_record::{
	AssignOptions, MemoryStore, Model, NestedLimit, NestedOptions, Record, RecordError, RejectIf, Schema,
};
use serde_json::{json, Value};

pub const PEOPLE_COLUMNS: [&str; 5] = ["first_name", "gender", "comments", "best_friend_id", "best_friend_of_id"];

pub struct Fixture {
	pub schema: Arc<Schema>,
	pub store: Arc<MemoryStore>,
}

impl Fixture {
	pub fn model(&self, name: &str) -> Model {
		self.schema.model(name).unwrap()
	}
}

pub fn fixture() -> Fixture {
	fixture_with_policy(SanitizerPolicy::Log)
}

pub fn strict_fixture() -> Fixture {
	fixture_with_policy(SanitizerPolicy::Strict)
}

pub fn fixture_with_policy(policy: SanitizerPolicy) -> Fixture {
	let mut b = Schema::builder();
	b.set_default_policy(policy);

	for person in ["LoosePerson", "TightPerson", "NestedPerson"] {
		b.define(ModelSpec::new(person).columns(PEOPLE_COLUMNS)).unwrap();
	}

	b.declare_protected("LoosePerson", "default", ["comments", "best_friend_id", "best_friend_of_id"])
		.unwrap();
	b.declare_protected("LoosePerson", "admin", Vec::<String>::new())
		.unwrap();

	b.declare_accessible("TightPerson", "default", ["first_name", "gender"])
		.unwrap();
	b.declare_accessible("TightPerson", "admin", ["first_name", "gender", "comments"])
		.unwrap();
	let nested_keys = ["best_friend_attributes", "best_friend_of_attributes", "best_friends_attributes"];
	b.declare_accessible("TightPerson", "default", nested_keys).unwrap();
	b.declare_accessible("TightPerson", "admin", nested_keys).unwrap();

	for person in ["LoosePerson", "TightPerson"] {
		b.has_one(person, "best_friend", person, "best_friend_id").unwrap();
		b.belongs_to(person, "best_friend_of", person, "best_friend_of_id")
			.unwrap();
		b.has_many(person, "best_friends", person, "best_friend_id").unwrap();
		for association in ["best_friend", "best_friend_of", "best_friends"] {
			b.accepts_nested_attributes_for(person, association, NestedOptions::new())
				.unwrap();
		}
	}

	b.declare_accessible(
		"NestedPerson",
		"default",
		["first_name", "best_friend_first_name", "best_friend_attributes"],
	)
	.unwrap();
	b.declare_accessible("NestedPerson", "admin", ["first_name", "gender", "comments"])
		.unwrap();
	b.declare_accessible("NestedPerson", "admin", ["best_friend_attributes", "best_friend_first_name"])
		.unwrap();
	b.has_one("NestedPerson", "best_friend", "NestedPerson", "best_friend_id")
		.unwrap();
	b.accepts_nested_attributes_for(
		"NestedPerson",
		"best_friend",
		NestedOptions::new().update_only().reject_if(RejectIf::AllBlank),
	)
	.unwrap();
	b.virtual_setter("NestedPerson", "comments", |_, _| {
		Err(RecordError::setter("comments", "comments are read-only"))
	});
	b.virtual_setter("NestedPerson", "best_friend_first_name", |record, value| {
		record.assign_attributes(
			params! { "best_friend_attributes" => json!({ "first_name": value }) },
			&AssignOptions::default(),
		)
	});

	b.define(ModelSpec::new("Company").columns(["name", "rating", "type", "description", "firm_id"]))
		.unwrap();
	b.define(ModelSpec::new("Firm").parent("Company")).unwrap();
	b.declare_protected("Company", "default", ["rating"]).unwrap();
	b.validates_presence_of("Company", ["name"]);
	b.has_many("Firm", "clients", "Company", "firm_id").unwrap();

	b.define(ModelSpec::new("Corporation").columns(["name", "rating", "type", "description"]))
		.unwrap();
	b.define(ModelSpec::new("SpecialCorporation").parent("Corporation"))
		.unwrap();
	b.declare_accessible("Corporation", "default", ["type", "name", "description"])
		.unwrap();

	b.define(ModelSpec::new("Subscriber").primary_key("nick").columns(["name"]))
		.unwrap();
	b.declare_accessible_none("Subscriber").unwrap();

	b.define(ModelSpec::new("Keyboard").primary_key("key_number").columns(["name"]))
		.unwrap();
	b.declare_accessible("Keyboard", "default", ["name"]).unwrap();

	b.define(ModelSpec::new("Vehicle").columns(["name", "type"])).unwrap();
	b.define(ModelSpec::new("Truck").parent("Vehicle")).unwrap();

	b.define(ModelSpec::new("Task").columns(["starting", "ending"])).unwrap();
	b.define(ModelSpec::new("Book").columns(["title"])).unwrap();

	b.define(ModelSpec::new("Team").columns(["name"])).unwrap();
	b.define(ModelSpec::new("Battle").columns(["team_id"])).unwrap();
	b.declare_accessible_none("Battle").unwrap();
	b.has_many("Team", "nested_battles", "Battle", "team_id").unwrap();
	b.has_many("Team", "limited_battles", "Battle", "team_id").unwrap();
	b.accepts_nested_attributes_for("Team", "nested_battles", NestedOptions::new().allow_destroy())
		.unwrap();
	b.accepts_nested_attributes_for(
		"Team",
		"limited_battles",
		NestedOptions::new().limit(NestedLimit::Fixed(2)),
	)
	.unwrap();

	let store = Arc::new(MemoryStore::new());
	let schema = b.build(store.clone());
	Fixture { schema, store }
}

pub fn attributes_hash() -> Params {
	params! {
		"id" => 5,
		"first_name" => "Josh",
		"gender" => "m",
		"comments" => "rides a sweet bike",
	}
}

pub fn attributes_hash_except(keys: &[&str]) -> Params {
	attributes_hash().except(keys)
}

pub fn admin() -> AssignOptions {
	AssignOptions::as_role("admin")
}

pub fn trusted() -> AssignOptions {
	AssignOptions::without_protection()
}

pub fn assert_default_attributes(person: &Record, created: bool) {
	assert_eq!(person.id().is_null(), !created, "id of {person:?}");
	assert_eq!(person.get("first_name"), &json!("Josh"));
	assert_eq!(person.get("gender"), &json!("m"));
	assert_eq!(person.get("comments"), &Value::Null);
}

pub fn assert_admin_attributes(person: &Record, created: bool) {
	assert_eq!(person.id().is_null(), !created, "id of {person:?}");
	assert_eq!(person.get("first_name"), &json!("Josh"));
	assert_eq!(person.get("gender"), &json!("m"));
	assert_eq!(person.get("comments"), &json!("rides a sweet bike"));
}

/// Everything but the id, which stays protected even without protection.
pub fn assert_all_attributes(person: &Record) {
	assert_ne!(person.id(), &json!(5));
	assert_eq!(person.get("first_name"), &json!("Josh"));
	assert_eq!(person.get("gender"), &json!("m"));
	assert_eq!(person.get("comments"), &json!("rides a sweet bike"));
}
