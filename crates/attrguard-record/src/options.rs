// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use attrguard_core::Role;

/// Per-call assignment options threaded through every entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignOptions {
	pub role: Role,
	/// Skips role-based filtering. Default-protected keys are still removed.
	pub without_protection: bool,
}

impl AssignOptions {
	pub fn as_role(role: impl Into<Role>) -> Self {
		Self {
			role: role.into(),
			without_protection: false,
		}
	}

	pub fn without_protection() -> Self {
		Self {
			role: Role::DEFAULT,
			without_protection: true,
		}
	}
}
