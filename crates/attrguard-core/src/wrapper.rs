// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key derivation for request-parameter wrapping.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::role::Role;

/// Attribute names a request wrapper should nest under the model's key.
///
/// The role's whitelist when the hierarchy whitelists anything, otherwise the
/// model's column names.
pub fn wrap_keys(catalog: &Catalog, model: &str, role: &Role) -> Result<Vec<String>> {
	let accessible = catalog.accessible_attributes(model, role)?;
	if !accessible.is_empty() {
		return Ok(accessible.into_iter().collect());
	}
	Ok(catalog.columns(model)?.iter().cloned().collect())
}
