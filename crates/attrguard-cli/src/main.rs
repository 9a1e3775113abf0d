// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! attrguard command-line tool.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use attrguard_config::{load_config, load_config_with_file, GuardConfig, LogFormat, LoggingConfig};
use attrguard_core::Role;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod version;

/// attrguard - inspect mass-assignment rules and dry-run sanitization.
#[derive(Parser, Debug)]
#[command(name = "attrguard", about = "Inspect mass-assignment rules", version)]
struct Args {
	/// Config file with sanitizer settings and `[[models]]` declarations
	#[arg(long, short, global = true, env = "ATTRGUARD_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Validate the configuration and list declared models
	Check,
	/// Show the effective rules for a model and role
	Rules {
		model: String,
		#[arg(long, default_value = "default")]
		role: String,
	},
	/// Filter a JSON object the way mass assignment would
	Sanitize {
		model: String,
		#[arg(long, default_value = "default")]
		role: String,
		/// Skip role rules; default-protected keys are still removed
		#[arg(long)]
		without_protection: bool,
		/// Mark the input as explicitly permitted
		#[arg(long)]
		permit: bool,
		/// JSON file to read (stdin when omitted or `-`)
		#[arg(long, short)]
		input: Option<PathBuf>,
	},
	/// Print the keys a request wrapper should nest under the model
	WrapKeys {
		model: String,
		#[arg(long, default_value = "default")]
		role: String,
	},
	/// Show version and build information
	Version,
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
	let registry = tracing_subscriber::registry().with(filter);
	let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
	match logging.format {
		LogFormat::Pretty => registry.with(layer.pretty()).init(),
		LogFormat::Compact => registry.with(layer.compact()).init(),
		LogFormat::Json => registry.with(layer.json()).init(),
	}
}

fn load(config: Option<&Path>) -> Result<GuardConfig> {
	match config {
		Some(path) => {
			if !path.exists() {
				bail!("config file {} does not exist", path.display());
			}
			load_config_with_file(path).with_context(|| format!("failed to load {}", path.display()))
		}
		None => load_config().context("failed to load configuration"),
	}
}

fn read_input(input: Option<&Path>) -> Result<String> {
	let mut buf = String::new();
	match input {
		Some(path) if path != Path::new("-") => {
			return std::fs::read_to_string(path)
				.with_context(|| format!("failed to read {}", path.display()));
		}
		_ => {
			std::io::stdin()
				.read_to_string(&mut buf)
				.context("failed to read stdin")?;
		}
	}
	Ok(buf)
}

fn main() -> Result<()> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	let config = load(args.config.as_deref())?;
	init_tracing(&config.logging);
	let catalog = config.catalog().context("invalid model declarations")?;
	tracing::debug!(command = ?args.command, "running command");

	let output = match args.command {
		Command::Check => commands::check(&config, &catalog)?,
		Command::Rules { model, role } => commands::rules(&catalog, &model, &Role::new(role))?,
		Command::Sanitize {
			model,
			role,
			without_protection,
			permit,
			input,
		} => {
			let body = read_input(input.as_deref())?;
			let args = commands::SanitizeArgs {
				role: Role::new(role),
				without_protection,
				permit,
			};
			commands::sanitize(&catalog, &model, &body, &args)?
		}
		Command::WrapKeys { model, role } => commands::wrap(&catalog, &model, &Role::new(role))?,
		Command::Version => version::format_version_info(),
	};
	print!("{output}");
	if !output.ends_with('\n') {
		println!();
	}
	Ok(())
}
