// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the record layer.

use attrguard_core::{GuardError, ModelId};
use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for record operations.
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors raised while assigning, building, or persisting records.
#[derive(Debug, Error)]
pub enum RecordError {
	/// Sanitization refused the mapping.
	#[error(transparent)]
	Guard(#[from] GuardError),

	/// A key survived filtering but names nothing on the model.
	#[error("unknown attribute '{attribute}' for {model}")]
	UnknownAttribute { model: ModelId, attribute: String },

	#[error("couldn't find {model} with id={id}")]
	RecordNotFound { model: ModelId, id: String },

	#[error("maximum {limit} records are allowed, got {got} records instead")]
	TooManyRecords { limit: usize, got: usize },

	#[error("validation failed for {model}: {}", errors.join(", "))]
	RecordInvalid { model: ModelId, errors: Vec<String> },

	#[error("{model} not saved: {message}")]
	RecordNotSaved { model: ModelId, message: String },

	/// The type column named a model outside the hierarchy.
	#[error("invalid single-table inheritance type: {subclass} is not a subclass of {model}")]
	SubclassNotFound { model: ModelId, subclass: String },

	#[error("no association named '{association}' on {model}")]
	UnknownAssociation { model: ModelId, association: String },

	#[error("'{association}' on {model} is not a {expected} association")]
	WrongAssociationKind {
		model: ModelId,
		association: String,
		expected: &'static str,
	},

	#[error("invalid nested attributes for '{association}': {message}")]
	InvalidNestedValue { association: String, message: String },

	#[error("error assembling multi-parameter attribute '{attribute}': {message}")]
	MultiparameterAssignment { attribute: String, message: String },

	/// A registered virtual setter failed.
	#[error("setter for '{attribute}' failed: {message}")]
	Setter { attribute: String, message: String },

	#[error(transparent)]
	Store(#[from] StoreError),
}

impl RecordError {
	pub fn unknown_attribute(model: &ModelId, attribute: impl Into<String>) -> Self {
		Self::UnknownAttribute {
			model: model.clone(),
			attribute: attribute.into(),
		}
	}

	pub fn not_found(model: &ModelId, id: impl Into<String>) -> Self {
		Self::RecordNotFound {
			model: model.clone(),
			id: id.into(),
		}
	}

	pub fn setter(attribute: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Setter {
			attribute: attribute.into(),
			message: message.into(),
		}
	}

	pub fn invalid_nested(association: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidNestedValue {
			association: association.into(),
			message: message.into(),
		}
	}

	/// Returns true when the failure came from the sanitizer.
	pub fn is_guard(&self) -> bool {
		matches!(self, Self::Guard(_))
	}
}
