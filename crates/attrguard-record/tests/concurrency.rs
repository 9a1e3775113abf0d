// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod common;

use std::thread;

use attrguard_record::AssignOptions;
use common::*;
use serde_json::json;

#[test]
fn concurrent_assignments_do_not_share_roles() {
	let f = fixture();
	thread::scope(|s| {
		for i in 0..8 {
			let model = f.model(if i % 2 == 0 { "LoosePerson" } else { "TightPerson" });
			s.spawn(move || {
				for _ in 0..50 {
					let options = if i % 4 < 2 { admin() } else { AssignOptions::default() };
					let person = model.create(attributes_hash(), &options).unwrap();
					if options.role.is_default() {
						assert_default_attributes(&person, true);
					} else {
						assert_admin_attributes(&person, true);
					}
					assert_eq!(person.current_options(), AssignOptions::default());
				}
			});
		}
	});
	assert_eq!(f.store.count("LoosePerson") + f.store.count("TightPerson"), 400);
	assert_eq!(f.store.depth(), 0);
}

#[test]
fn nested_assignments_on_separate_threads_keep_their_own_scope() {
	let f = fixture();
	thread::scope(|s| {
		for i in 0..4 {
			let model = f.model("NestedPerson");
			s.spawn(move || {
				let mut person = model
					.create_bang(serde_json::from_value(json!({ "first_name": "David", "gender": "m" })).unwrap(), &admin())
					.unwrap();
				person
					.create_association_bang(
						"best_friend",
						serde_json::from_value(json!({ "first_name": "Jeremy", "gender": "m" })).unwrap(),
						&admin(),
					)
					.unwrap();
				let gender = if i % 2 == 0 { "f" } else { "x" };
				let update = serde_json::from_value(json!({
					"best_friend_first_name": format!("Josh{i}"),
					"best_friend_attributes": { "gender": gender },
				}))
				.unwrap();
				person.assign_attributes(update, &admin()).unwrap();
				let friend = person.association("best_friend").unwrap().unwrap();
				assert_eq!(friend.get("first_name"), &json!(format!("Josh{i}")));
				assert_eq!(friend.get("gender"), &json!(gender));
			});
		}
	});
}
