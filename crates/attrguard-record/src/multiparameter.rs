// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Multi-parameter attribute assembly.
//!
//! Form helpers split one value across keys like `starting(1i)`,
//! `starting(2i)`, `starting(3i)`. The position is one-based and the optional
//! suffix casts the part: `i` integer, `f` float, `s` string. Groups of three
//! integer parts become a `YYYY-MM-DD` date, groups of five or six become a
//! `YYYY-MM-DDTHH:MM:SS` timestamp, anything else an array.

use std::collections::BTreeMap;

use attrguard_core::MULTIPARAMETER_DELIMITER;
use serde_json::{Number, Value};

use crate::error::{RecordError, Result};
use crate::store::is_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cast {
	Integer,
	Float,
	Raw,
}

struct Part {
	position: usize,
	cast: Cast,
}

fn error(attribute: &str, message: impl Into<String>) -> RecordError {
	RecordError::MultiparameterAssignment {
		attribute: attribute.to_string(),
		message: message.into(),
	}
}

fn parse_key(key: &str) -> Result<(&str, Part)> {
	let malformed = || error(key, "expected a key of the form name(Ni)");
	let (base, rest) = key.split_once(MULTIPARAMETER_DELIMITER).ok_or_else(malformed)?;
	let inner = rest.strip_suffix(')').ok_or_else(malformed)?;
	let (digits, cast) = match inner.chars().last() {
		Some('i') => (&inner[..inner.len() - 1], Cast::Integer),
		Some('f') => (&inner[..inner.len() - 1], Cast::Float),
		Some('s') => (&inner[..inner.len() - 1], Cast::Raw),
		_ => (inner, Cast::Raw),
	};
	let position: usize = digits.parse().map_err(|_| malformed())?;
	if base.is_empty() || position == 0 {
		return Err(malformed());
	}
	Ok((base, Part { position, cast }))
}

fn cast(attribute: &str, cast: Cast, value: Value) -> Result<Option<Value>> {
	if is_blank(&value) {
		return Ok(None);
	}
	let text = match &value {
		Value::String(s) => s.trim().to_string(),
		other => other.to_string(),
	};
	match cast {
		Cast::Raw => Ok(Some(value)),
		Cast::Integer => text
			.parse::<i64>()
			.map(|n| Some(Value::from(n)))
			.map_err(|_| error(attribute, format!("'{text}' is not an integer"))),
		Cast::Float => text
			.parse::<f64>()
			.ok()
			.and_then(Number::from_f64)
			.map(|n| Some(Value::Number(n)))
			.ok_or_else(|| error(attribute, format!("'{text}' is not a number"))),
	}
}

fn is_leap(year: i64) -> bool {
	(year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: i64) -> i64 {
	match month {
		2 if is_leap(year) => 29,
		2 => 28,
		4 | 6 | 9 | 11 => 30,
		_ => 31,
	}
}

fn integer(parts: &BTreeMap<usize, Option<Value>>, position: usize, default: i64) -> i64 {
	parts
		.get(&position)
		.and_then(|v| v.as_ref())
		.and_then(Value::as_i64)
		.unwrap_or(default)
}

fn date(attribute: &str, parts: &BTreeMap<usize, Option<Value>>) -> Result<Option<(i64, i64, i64)>> {
	if parts.get(&1).and_then(|v| v.as_ref()).is_none() {
		return Ok(None);
	}
	let year = integer(parts, 1, 1);
	let month = integer(parts, 2, 1);
	let day = integer(parts, 3, 1);
	if !(1..=12).contains(&month) || day < 1 || day > days_in_month(year, month) {
		return Err(error(attribute, format!("{year}-{month}-{day} is not a valid date")));
	}
	Ok(Some((year, month, day)))
}

fn assemble_group(attribute: &str, parts: BTreeMap<usize, Option<Value>>, integers: bool) -> Result<Value> {
	if parts.values().all(Option::is_none) {
		return Ok(Value::Null);
	}
	let max = parts.keys().next_back().copied().unwrap_or(0);

	if integers && max == 3 {
		return Ok(match date(attribute, &parts)? {
			Some((y, m, d)) => Value::String(format!("{y:04}-{m:02}-{d:02}")),
			None => Value::Null,
		});
	}

	if integers && (max == 5 || max == 6) {
		let Some((y, m, d)) = date(attribute, &parts)? else {
			return Ok(Value::Null);
		};
		let hour = integer(&parts, 4, 0);
		let minute = integer(&parts, 5, 0);
		let second = integer(&parts, 6, 0);
		if !(0..24).contains(&hour) || !(0..60).contains(&minute) || !(0..60).contains(&second) {
			return Err(error(
				attribute,
				format!("{hour}:{minute}:{second} is not a valid time"),
			));
		}
		return Ok(Value::String(format!(
			"{y:04}-{m:02}-{d:02}T{hour:02}:{minute:02}:{second:02}"
		)));
	}

	let mut values = vec![Value::Null; max];
	for (position, value) in parts {
		values[position - 1] = value.unwrap_or(Value::Null);
	}
	Ok(Value::Array(values))
}

/// Groups multi-parameter pairs by attribute and builds one value per
/// attribute, in attribute-name order.
pub fn assemble(pairs: Vec<(String, Value)>) -> Result<Vec<(String, Value)>> {
	let mut groups: BTreeMap<String, (BTreeMap<usize, Option<Value>>, bool)> = BTreeMap::new();
	for (key, value) in pairs {
		let (base, part) = parse_key(&key)?;
		let value = cast(base, part.cast, value)?;
		let (parts, integers) = groups.entry(base.to_string()).or_insert((BTreeMap::new(), true));
		*integers &= part.cast == Cast::Integer;
		parts.insert(part.position, value);
	}

	groups
		.into_iter()
		.map(|(attribute, (parts, integers))| {
			let value = assemble_group(&attribute, parts, integers)?;
			Ok((attribute, value))
		})
		.collect()
}
