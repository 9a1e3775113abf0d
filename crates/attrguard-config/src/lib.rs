// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for attrguard.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Declarative model rules loaded from `[[models]]` tables
//! - Consistent environment variable naming (`ATTRGUARD_*`)
//!
//! # Usage
//!
//! ```ignore
//! use attrguard_config::load_config_with_file;
//!
//! let config = load_config_with_file("attrguard.toml")?;
//! let catalog = config.catalog()?;
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::GuardConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use attrguard_core::{Catalog, CatalogBuilder};
use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardConfig {
	pub sanitizer: SanitizerConfig,
	pub logging: LoggingConfig,
	pub models: ModelsConfig,
}

impl GuardConfig {
	/// Builds a catalog from the declared models and sanitizer settings.
	pub fn catalog(&self) -> Result<Catalog, ConfigError> {
		self.models.build_catalog(&self.sanitizer)
	}

	/// Catalog builder seeded with the declared models, for callers that add
	/// models or associations in code.
	pub fn catalog_builder(&self) -> Result<CatalogBuilder, ConfigError> {
		self.models.catalog_builder(&self.sanitizer)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`ATTRGUARD_*`)
/// 2. Config file (`/etc/attrguard/attrguard.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<GuardConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::system()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<GuardConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::system()),
	])
}

/// Merge `sources` in precedence order and finalize the result.
pub fn load_config_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<GuardConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = GuardConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: GuardConfigLayer) -> Result<GuardConfig, ConfigError> {
	let sanitizer = layer.sanitizer.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let models = ModelsConfig {
		models: layer.models.unwrap_or_default(),
	};

	validate_config(&sanitizer, &models)?;

	info!(
		policy = %sanitizer.policy,
		whitelist_attributes = sanitizer.whitelist_attributes,
		log_level = %logging.level,
		log_format = %logging.format,
		models = models.models.len(),
		"attrguard configuration loaded"
	);

	Ok(GuardConfig {
		sanitizer,
		logging,
		models,
	})
}

/// Validate cross-field configuration rules.
///
/// Every parent must be declared, names must be unique, and the declarations
/// must be accepted by the catalog builder.
pub fn validate_config(sanitizer: &SanitizerConfig, models: &ModelsConfig) -> Result<(), ConfigError> {
	for model in &models.models {
		if model.name.trim().is_empty() {
			return Err(ConfigError::validation("model declaration with an empty name"));
		}
		if let Some(parent) = &model.parent {
			if models.get(parent).is_none() {
				return Err(ConfigError::validation(format!(
					"model {} names unknown parent {parent}",
					model.name
				)));
			}
		}
	}

	models.build_catalog(sanitizer)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use attrguard_core::GuardError;

	fn declaration(name: &str, parent: Option<&str>) -> ModelDeclaration {
		ModelDeclaration {
			name: name.to_string(),
			parent: parent.map(str::to_string),
			..Default::default()
		}
	}

	#[test]
	fn test_unknown_parent_validation() {
		let models = ModelsConfig {
			models: vec![declaration("Firm", Some("Company"))],
		};
		let result = validate_config(&SanitizerConfig::default(), &models);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("unknown parent Company"));
	}

	#[test]
	fn test_empty_name_validation() {
		let models = ModelsConfig {
			models: vec![declaration(" ", None)],
		};
		assert!(matches!(
			validate_config(&SanitizerConfig::default(), &models),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_conflicts_surface_as_catalog_errors() {
		let mut post = declaration("Post", None);
		post.protected.insert("default".to_string(), vec!["author_id".to_string()]);
		let models = ModelsConfig { models: vec![post] };
		let sanitizer = SanitizerConfig {
			whitelist_attributes: true,
			..Default::default()
		};
		assert!(matches!(
			validate_config(&sanitizer, &models),
			Err(ConfigError::Catalog(GuardError::Configuration { .. }))
		));
	}

	#[test]
	fn test_no_models_is_valid() {
		let config = finalize(GuardConfigLayer::default()).unwrap();
		assert_eq!(config, GuardConfig::default());
		assert_eq!(config.catalog().unwrap().model_ids().count(), 0);
	}
}
