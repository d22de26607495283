//! Packet Validator (C4, spec.md §4.4).
//!
//! Structural rules are checked in the order spec.md lists them, fail-fast,
//! so the first-failing rule (and not some unrelated later one) is what
//! gets logged. Verb existence is deliberately not checked here — that's
//! the dispatch loop's job (§4.6e), since this module has no registry
//! dependency.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::ValidationError;
use crate::packet::{LogLevel, Operation, Packet, StatusKey, StyleEntry, StyleTable};

pub fn validate(body: &Value) -> Result<Packet, ValidationError> {
	let obj = body.as_object().ok_or(ValidationError::NotAnObject)?;

	let response_queue = obj
		.get("response_queue")
		.and_then(Value::as_str)
		.ok_or(ValidationError::BadResponseQueue)?
		.to_string();

	let version_utc_seconds = obj.get("version_utc_seconds").and_then(as_number).ok_or(ValidationError::BadVersion)?;

	let verb = obj
		.get("type")
		.and_then(Value::as_str)
		.ok_or(ValidationError::BadField { field: "type" })?
		.to_string();

	let uuid = obj
		.get("uuid")
		.and_then(Value::as_str)
		.ok_or(ValidationError::BadField { field: "uuid" })?
		.to_string();

	let sent_at = obj.get("sent_at").and_then(as_number).ok_or(ValidationError::BadField { field: "sent_at" })?;

	let style_value = obj.get("style");
	if let Some(v) = style_value {
		if !v.is_object() && !v.is_null() {
			return Err(ValidationError::BadField { field: "style" });
		}
	}

	let ignore_version_value = obj.get("ignore_version");
	if let Some(v) = ignore_version_value {
		if !v.is_boolean() && !v.is_null() {
			return Err(ValidationError::BadField { field: "ignore_version" });
		}
	}

	let style = match style_value.filter(|v| v.is_object()) {
		Some(v) => Some(validate_style_table(v)?),
		None => None,
	};

	let args = obj.get("args").cloned().unwrap_or(Value::Null);
	let ignore_version = ignore_version_value.and_then(Value::as_bool).unwrap_or(false);

	Ok(Packet { response_queue, version_utc_seconds, verb, uuid, sent_at, args, style, ignore_version })
}

fn as_number(v: &Value) -> Option<f64> {
	v.as_f64()
}

fn validate_style_table(style: &Value) -> Result<StyleTable, ValidationError> {
	let obj = style.as_object().expect("caller checked is_object");
	let mut table: StyleTable = HashMap::new();

	for (key, value) in obj {
		let status_key = parse_status_key(key).ok_or_else(|| ValidationError::BadStyleKey(key.clone()))?;

		let entry_obj = value.as_object().ok_or_else(|| ValidationError::BadStyleEntry(key.clone()))?;

		let operation_str = entry_obj
			.get("operation")
			.and_then(Value::as_str)
			.ok_or_else(|| ValidationError::BadOperation(key.clone()))?;
		let operation = Operation::parse(operation_str).ok_or_else(|| ValidationError::BadOperation(key.clone()))?;

		let log_level = match entry_obj.get("log_level") {
			None | Some(Value::Null) => None,
			Some(Value::String(s)) => Some(LogLevel::parse(s).ok_or_else(|| ValidationError::BadLogLevel(key.clone()))?),
			Some(_) => return Err(ValidationError::BadLogLevel(key.clone())),
		};

		let ignore_version = if operation == Operation::Retry {
			match entry_obj.get("ignore_version") {
				None | Some(Value::Null) => None,
				Some(Value::Bool(b)) => Some(*b),
				Some(_) => return Err(ValidationError::BadIgnoreVersion(key.clone())),
			}
		} else {
			None
		};

		table.insert(status_key, StyleEntry { operation, log_level, ignore_version });
	}

	Ok(table)
}

fn parse_status_key(key: &str) -> Option<StatusKey> {
	if let Some(prefix) = key.strip_suffix("xx") {
		if prefix.len() == 1 {
			let class: u8 = prefix.parse().ok()?;
			if (2..=5).contains(&class) {
				return Some(StatusKey::Class(class));
			}
		}
		return None;
	}

	let code: u16 = key.parse().ok()?;
	if (200..=599).contains(&code) {
		Some(StatusKey::Exact(code))
	} else {
		None
	}
}
