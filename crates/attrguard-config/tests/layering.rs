// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::io::Write;

use attrguard_config::{
	load_config_from_sources, ConfigError, ConfigSource, DefaultsSource, EnvSource, LogFormat,
	PolicyName, TomlSource,
};
use attrguard_core::{params, GuardError, Role};
use proptest::prelude::*;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[sanitizer]
policy = "log"

[logging]
level = "debug"
format = "pretty"

[[models]]
name = "Company"
columns = ["name", "rating", "type", "description"]
protected = { default = ["rating"] }

[[models]]
name = "Firm"
parent = "Company"

[[models]]
name = "Person"
columns = ["first_name", "gender", "comments"]
accessible = { default = ["first_name", "gender"], admin = ["first_name", "gender", "comments"] }
"#;

fn config_file(contents: &str) -> NamedTempFile {
	let mut file = NamedTempFile::new().unwrap();
	file.write_all(contents.as_bytes()).unwrap();
	file
}

fn env(pairs: &[(&str, &str)]) -> EnvSource {
	let vars: HashMap<String, String> = pairs
		.iter()
		.map(|(k, v)| (k.to_string(), v.to_string()))
		.collect();
	EnvSource::with_lookup(move |name| vars.get(name).cloned())
}

fn sources(file: &NamedTempFile, env: EnvSource) -> Vec<Box<dyn ConfigSource>> {
	// Sorted by precedence on load.
	vec![
		Box::new(env),
		Box::new(TomlSource::new(file.path())),
		Box::new(DefaultsSource),
	]
}

#[test]
fn file_values_apply_over_defaults() {
	let file = config_file(CONFIG);
	let config = load_config_from_sources(sources(&file, env(&[]))).unwrap();

	assert_eq!(config.sanitizer.policy, PolicyName::Log);
	assert!(!config.sanitizer.whitelist_attributes);
	assert_eq!(config.logging.level, "debug");
	assert_eq!(config.logging.format, LogFormat::Pretty);
	assert_eq!(config.models.models.len(), 3);
}

#[test]
fn environment_overrides_file() {
	let file = config_file(CONFIG);
	let config = load_config_from_sources(sources(
		&file,
		env(&[("ATTRGUARD_SANITIZER_POLICY", "strict"), ("ATTRGUARD_LOG_FORMAT", "json")]),
	))
	.unwrap();

	assert_eq!(config.sanitizer.policy, PolicyName::Strict);
	assert_eq!(config.logging.format, LogFormat::Json);
	assert_eq!(config.logging.level, "debug");
}

#[test]
fn catalog_from_file_filters_by_role() {
	let file = config_file(CONFIG);
	let catalog = load_config_from_sources(sources(&file, env(&[])))
		.unwrap()
		.catalog()
		.unwrap();

	let out = catalog
		.filter(
			"Firm",
			params! { "name" => "37signals", "rating" => 1, "type" => "Company" },
			&Role::DEFAULT,
			false,
		)
		.unwrap();
	assert_eq!(out, params! { "name" => "37signals" });

	let out = catalog
		.filter("Person", params! { "comments" => "hi" }, &Role::from("admin"), false)
		.unwrap();
	assert_eq!(out, params! { "comments" => "hi" });
}

#[test]
fn strict_policy_from_environment_reaches_catalog() {
	let file = config_file(CONFIG);
	let catalog = load_config_from_sources(sources(
		&file,
		env(&[("ATTRGUARD_SANITIZER_POLICY", "strict")]),
	))
	.unwrap()
	.catalog()
	.unwrap();

	let err = catalog
		.filter("Person", params! { "comments" => "hi" }, &Role::DEFAULT, false)
		.unwrap_err();
	assert!(matches!(err, GuardError::MassAssignment { ref attribute, .. } if attribute == "comments"));
}

#[test]
fn whitelist_by_default_from_environment_conflicts_with_protected_models() {
	let file = config_file(CONFIG);
	let err = load_config_from_sources(sources(
		&file,
		env(&[("ATTRGUARD_WHITELIST_ATTRIBUTES", "true")]),
	))
	.unwrap_err();
	assert!(matches!(err, ConfigError::Catalog(GuardError::Configuration { .. })));
}

#[test]
fn unknown_parent_fails_loading() {
	let file = config_file(
		r#"
[[models]]
name = "Firm"
parent = "Company"
"#,
	);
	let err = load_config_from_sources(sources(&file, env(&[]))).unwrap_err();
	assert!(matches!(err, ConfigError::Validation(_)));
}

proptest! {
	#[test]
	fn environment_policy_always_wins(file_strict in any::<bool>(), env_strict in any::<bool>()) {
		let name = |strict: bool| if strict { "strict" } else { "log" };
		let file = config_file(&format!("[sanitizer]\npolicy = \"{}\"\n", name(file_strict)));
		let config = load_config_from_sources(sources(
			&file,
			env(&[("ATTRGUARD_SANITIZER_POLICY", name(env_strict))]),
		))
		.unwrap();
		let expected = if env_strict { PolicyName::Strict } else { PolicyName::Log };
		prop_assert_eq!(config.sanitizer.policy, expected);
	}
}
