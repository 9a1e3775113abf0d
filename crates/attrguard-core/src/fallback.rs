// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Strong-parameters fallback for models without declared rules.

use tracing::debug;

use crate::catalog::ModelId;
use crate::error::{GuardError, Result};
use crate::params::Params;

/// Accepts a mapping only when an upstream filter marked it permitted.
pub fn enforce(model: &ModelId, params: Params) -> Result<Params> {
	if params.is_permitted() {
		return Ok(params);
	}
	debug!(model = %model, keys = params.len(), "unpermitted parameters for unprotected model");
	Err(GuardError::ForbiddenAttributes {
		model: model.clone(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params;

	#[test]
	fn permitted_passes_through() {
		let id = ModelId::from("Book");
		let p = params! { "title" => "Dune" }.permit();
		assert_eq!(enforce(&id, p.clone()).unwrap(), p);
	}

	#[test]
	fn unpermitted_is_forbidden_even_when_empty() {
		let id = ModelId::from("Book");
		assert!(enforce(&id, Params::new()).is_err());
	}
}
