// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sanitizer configuration section.

use std::fmt;
use std::str::FromStr;

use attrguard_core::{SanitizerPolicy, UnknownPolicy};
use serde::{Deserialize, Serialize};

/// Removal policy that can be named in configuration.
///
/// Custom policies are code, so only the built-in ones appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyName {
	#[default]
	#[serde(alias = "logger")]
	Log,
	Strict,
}

impl PolicyName {
	pub fn to_policy(self) -> SanitizerPolicy {
		match self {
			Self::Log => SanitizerPolicy::Log,
			Self::Strict => SanitizerPolicy::Strict,
		}
	}
}

impl fmt::Display for PolicyName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Log => write!(f, "log"),
			Self::Strict => write!(f, "strict"),
		}
	}
}

impl FromStr for PolicyName {
	type Err = UnknownPolicy;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.parse::<SanitizerPolicy>()? {
			SanitizerPolicy::Strict => Ok(Self::Strict),
			_ => Ok(Self::Log),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SanitizerConfigLayer {
	pub policy: Option<PolicyName>,
	pub whitelist_attributes: Option<bool>,
}

impl SanitizerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.policy.is_some() {
			self.policy = other.policy;
		}
		if other.whitelist_attributes.is_some() {
			self.whitelist_attributes = other.whitelist_attributes;
		}
	}

	pub fn finalize(self) -> SanitizerConfig {
		SanitizerConfig {
			policy: self.policy.unwrap_or_default(),
			whitelist_attributes: self.whitelist_attributes.unwrap_or(false),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SanitizerConfig {
	/// Policy applied to models that do not name their own.
	pub policy: PolicyName,
	/// Puts every root model in whitelist mode.
	pub whitelist_attributes: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn later_layer_wins() {
		let mut base = SanitizerConfigLayer {
			policy: Some(PolicyName::Strict),
			whitelist_attributes: Some(true),
		};
		base.merge(SanitizerConfigLayer {
			policy: Some(PolicyName::Log),
			whitelist_attributes: None,
		});
		let config = base.finalize();
		assert_eq!(config.policy, PolicyName::Log);
		assert!(config.whitelist_attributes);
	}

	#[test]
	fn defaults_to_log_without_whitelist() {
		let config = SanitizerConfigLayer::default().finalize();
		assert_eq!(config.policy, PolicyName::Log);
		assert!(!config.whitelist_attributes);
	}

	#[test]
	fn parses_names() {
		assert_eq!("STRICT".parse::<PolicyName>().unwrap(), PolicyName::Strict);
		assert_eq!("logger".parse::<PolicyName>().unwrap(), PolicyName::Log);
		assert!("loud".parse::<PolicyName>().is_err());
	}

	#[test]
	fn accepts_logger_alias_in_toml() {
		let layer: SanitizerConfigLayer = toml::from_str("policy = \"logger\"").unwrap();
		assert_eq!(layer.policy, Some(PolicyName::Log));
	}
}
