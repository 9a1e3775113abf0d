// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files, and environment variables.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::GuardConfigLayer;
use crate::sections::{LogFormat, LoggingConfigLayer, PolicyName, SanitizerConfigLayer};

pub const ENV_SANITIZER_POLICY: &str = "ATTRGUARD_SANITIZER_POLICY";
pub const ENV_WHITELIST_ATTRIBUTES: &str = "ATTRGUARD_WHITELIST_ATTRIBUTES";
pub const ENV_LOG_LEVEL: &str = "ATTRGUARD_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "ATTRGUARD_LOG_FORMAT";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<GuardConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<GuardConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(GuardConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/attrguard/attrguard.toml")
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<GuardConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(GuardConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: GuardConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!(
			models = layer.models.as_ref().map_or(0, Vec::len),
			"parsed config layer from TOML"
		);
		Ok(layer)
	}
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable source.
///
/// Convention: ATTRGUARD_<SECTION>_<FIELD>. Model declarations are only read
/// from files.
pub struct EnvSource {
	lookup: Lookup,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn system() -> Self {
		Self::with_lookup(|name| std::env::var(name).ok())
	}

	/// Reads variables through `lookup` instead of the process environment.
	pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
		Self {
			lookup: Box::new(lookup),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self
			.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn sanitizer(&self) -> Result<SanitizerConfigLayer, ConfigError> {
		let policy = match self.var(ENV_SANITIZER_POLICY) {
			Some(v) => Some(
				v.parse::<PolicyName>()
					.map_err(|e| ConfigError::invalid_value(ENV_SANITIZER_POLICY, e.to_string()))?,
			),
			None => None,
		};
		Ok(SanitizerConfigLayer {
			policy,
			whitelist_attributes: self.bool(ENV_WHITELIST_ATTRIBUTES),
		})
	}

	fn logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		let format = match self.var(ENV_LOG_FORMAT) {
			Some(v) => Some(
				v.parse::<LogFormat>()
					.map_err(|e| ConfigError::invalid_value(ENV_LOG_FORMAT, e))?,
			),
			None => None,
		};
		Ok(LoggingConfigLayer {
			level: self.var(ENV_LOG_LEVEL),
			format,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<GuardConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(GuardConfigLayer {
			sanitizer: Some(self.sanitizer()?),
			logging: Some(self.logging()?),
			models: None,
		})
	}
}
