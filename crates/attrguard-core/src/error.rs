// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for rule declaration and sanitization.

use thiserror::Error;

use crate::catalog::ModelId;
use crate::role::Role;

/// Result type alias for authorization operations.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Errors raised while declaring rules or sanitizing a candidate mapping.
#[derive(Debug, Error)]
pub enum GuardError {
	/// A declaration conflicts with the rules already established for the
	/// model hierarchy, or references something that does not exist.
	#[error("configuration error for {model}: {message}")]
	Configuration { model: ModelId, message: String },

	/// The strict removal policy refused a filtered attribute.
	#[error("can't mass-assign protected attribute for {model} (role {role}): {attribute}")]
	MassAssignment {
		model: ModelId,
		role: Role,
		attribute: String,
		removed: Vec<String>,
	},

	/// The model declares no rules and the mapping was not explicitly permitted.
	#[error("forbidden attributes for {model}: parameters must be explicitly permitted")]
	ForbiddenAttributes { model: ModelId },

	/// The model was never registered with the catalog.
	#[error("unknown model: {0}")]
	UnknownModel(ModelId),

	/// A custom removal policy aborted the assignment.
	#[error("removal policy rejected attributes for {model}: {reason}")]
	Rejected { model: ModelId, reason: String },
}

impl GuardError {
	pub fn configuration(model: &ModelId, message: impl Into<String>) -> Self {
		Self::Configuration {
			model: model.clone(),
			message: message.into(),
		}
	}

	pub fn rejected(model: &ModelId, reason: impl Into<String>) -> Self {
		Self::Rejected {
			model: model.clone(),
			reason: reason.into(),
		}
	}
}
