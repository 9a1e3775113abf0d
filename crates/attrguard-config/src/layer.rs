// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by one source.

use serde::{Deserialize, Serialize};

use crate::sections::{LoggingConfigLayer, ModelDeclaration, SanitizerConfigLayer};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GuardConfigLayer {
	pub sanitizer: Option<SanitizerConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
	pub models: Option<Vec<ModelDeclaration>>,
}

impl GuardConfigLayer {
	/// Overlays `other` onto `self`. Model lists are replaced, not appended.
	pub fn merge(&mut self, other: Self) {
		if let Some(sanitizer) = other.sanitizer {
			self.sanitizer.get_or_insert_with(Default::default).merge(sanitizer);
		}
		if let Some(logging) = other.logging {
			self.logging.get_or_insert_with(Default::default).merge(logging);
		}
		if other.models.is_some() {
			self.models = other.models;
		}
	}
}
