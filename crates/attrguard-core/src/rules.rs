// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute-name rule sets.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::base_name;

/// How a rule set's entries are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
	/// Listed names are protected; everything else may be assigned.
	Blacklist,
	/// Only listed names may be assigned.
	Whitelist,
	/// No rules are declared anywhere in the hierarchy.
	Unset,
}

impl fmt::Display for RuleMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			RuleMode::Blacklist => "blacklist",
			RuleMode::Whitelist => "whitelist",
			RuleMode::Unset => "unset",
		};
		write!(f, "{s}")
	}
}

/// Attribute names governed by one mode.
///
/// Multi-parameter keys (`starting(1i)`) are matched by their base name, so a
/// whitelist entry `starting` admits every part of a `starting` date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
	mode: RuleMode,
	entries: BTreeSet<String>,
}

impl RuleSet {
	pub fn new(mode: RuleMode) -> Self {
		Self {
			mode,
			entries: BTreeSet::new(),
		}
	}

	pub fn whitelist<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = Self::new(RuleMode::Whitelist);
		set.extend(names);
		set
	}

	pub fn blacklist<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = Self::new(RuleMode::Blacklist);
		set.extend(names);
		set
	}

	pub fn unset() -> Self {
		Self::new(RuleMode::Unset)
	}

	pub fn mode(&self) -> RuleMode {
		self.mode
	}

	pub fn entries(&self) -> &BTreeSet<String> {
		&self.entries
	}

	/// Adds names to the set. Repeated declarations accumulate.
	pub fn extend<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.entries.extend(names.into_iter().map(Into::into));
	}

	pub fn includes(&self, key: &str) -> bool {
		self.entries.contains(base_name(key))
	}

	/// Returns true when the rule set refuses `key`.
	pub fn denies(&self, key: &str) -> bool {
		match self.mode {
			RuleMode::Whitelist => !self.includes(key),
			RuleMode::Blacklist => self.includes(key),
			RuleMode::Unset => false,
		}
	}

	pub fn allows(&self, key: &str) -> bool {
		!self.denies(key)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn blacklist_denies_included_items() {
		let set = RuleSet::blacklist(["admin"]);
		assert!(set.denies("admin"));
		assert!(!set.denies("first_name"));
	}

	#[test]
	fn whitelist_denies_everything_not_listed() {
		let set = RuleSet::whitelist(["name", "email"]);
		assert!(set.allows("name"));
		assert!(set.denies("admin"));
	}

	#[test]
	fn matching_is_case_sensitive() {
		let set = RuleSet::whitelist(["name"]);
		assert!(set.denies("Name"));
	}

	#[test]
	fn multiparameter_keys_match_base_name() {
		let white = RuleSet::whitelist(["starting"]);
		assert!(white.allows("starting(1i)"));
		assert!(white.denies("ending(1i)"));

		let black = RuleSet::blacklist(["starting"]);
		assert!(black.denies("starting(2i)"));
	}

	#[test]
	fn empty_whitelist_denies_all() {
		let set = RuleSet::whitelist(Vec::<String>::new());
		assert!(set.denies("anything"));
	}

	#[test]
	fn unset_denies_nothing() {
		assert!(RuleSet::unset().allows("anything"));
	}
}
