// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Named policy variant selecting which rule set applies to an assignment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
	/// The role used when a caller does not name one.
	pub const DEFAULT: Role = Role(Cow::Borrowed("default"));

	pub fn new(name: impl Into<String>) -> Self {
		let name = name.into();
		if name.is_empty() {
			return Self::DEFAULT;
		}
		Self(Cow::Owned(name))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_default(&self) -> bool {
		self.as_str() == Self::DEFAULT.as_str()
	}
}

impl Default for Role {
	fn default() -> Self {
		Self::DEFAULT
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Role {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for Role {
	fn from(name: String) -> Self {
		Self::new(name)
	}
}
