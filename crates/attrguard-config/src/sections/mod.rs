// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod logging;
mod models;
mod sanitizer;

pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use models::{ModelDeclaration, ModelsConfig};
pub use sanitizer::{PolicyName, SanitizerConfig, SanitizerConfigLayer};
