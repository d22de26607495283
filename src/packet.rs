//! Inbound/outbound wire types (spec.md §3, §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One of the four reply operations a style entry can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Copy,
	Success,
	Failure,
	Retry,
}

impl Operation {
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"copy" => Some(Self::Copy),
			"success" => Some(Self::Success),
			"failure" => Some(Self::Failure),
			"retry" => Some(Self::Retry),
			_ => None,
		}
	}

	pub fn wire_str(self) -> &'static str {
		match self {
			Self::Copy => "copy",
			Self::Success => "success",
			Self::Failure => "failure",
			Self::Retry => "retry",
		}
	}
}

/// Severity tag attached to a style entry. `None` means "do not log this
/// outcome line" (the wire value `"NONE"`), distinct from "absent", which
/// means "fall through to the default table's level".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
	None,
	Trace,
	Debug,
	Info,
	Warn,
	Error,
}

impl LogLevel {
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"NONE" => Some(Self::None),
			"TRACE" => Some(Self::Trace),
			"DEBUG" => Some(Self::Debug),
			"INFO" => Some(Self::Info),
			"WARN" => Some(Self::Warn),
			"ERROR" => Some(Self::Error),
			_ => None,
		}
	}

	pub fn wire_str(self) -> &'static str {
		match self {
			Self::None => "NONE",
			Self::Trace => "TRACE",
			Self::Debug => "DEBUG",
			Self::Info => "INFO",
			Self::Warn => "WARN",
			Self::Error => "ERROR",
		}
	}

	/// Emits `record` at this level via the `log` facade, namespaced under
	/// the dispatch loop's target. `None` suppresses the line entirely.
	pub fn log(self, target: &str, record: &str) {
		match self {
			Self::None => {}
			Self::Trace => log::trace!(target: "dispatch", "[{target}] {record}"),
			Self::Debug => log::debug!(target: "dispatch", "[{target}] {record}"),
			Self::Info => log::info!(target: "dispatch", "[{target}] {record}"),
			Self::Warn => log::warn!(target: "dispatch", "[{target}] {record}"),
			Self::Error => log::error!(target: "dispatch", "[{target}] {record}"),
		}
	}
}

/// A status key within a style table: either an exact 3-digit HTTP status
/// or a class wildcard (`2xx`..`5xx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
	Exact(u16),
	Class(u8),
}

impl StatusKey {
	pub fn wire_key(self) -> String {
		match self {
			Self::Exact(code) => code.to_string(),
			Self::Class(class) => format!("{class}xx"),
		}
	}
}

/// The outcome a handler reported, before style resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
	Http(u16),
	Success,
	Failure,
}

impl HandlerStatus {
	pub fn as_json(self) -> Value {
		match self {
			Self::Http(code) => Value::from(code),
			Self::Success => Value::from("success"),
			Self::Failure => Value::from("failure"),
		}
	}
}

/// One entry of a style table: `{operation, log_level?, ignore_version?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleEntry {
	pub operation: Operation,
	pub log_level: Option<LogLevel>,
	pub ignore_version: Option<bool>,
}

/// A client-supplied or system-default decision table.
pub type StyleTable = HashMap<StatusKey, StyleEntry>;

/// Renders a style table back to the wire shape it was parsed from, for
/// the retry path, which republishes the packet's own `style` table
/// unchanged alongside the overridden `ignore_version`.
pub fn style_table_to_json(table: &StyleTable) -> Value {
	let entries = table.iter().map(|(key, entry)| {
		let mut entry_json = serde_json::Map::new();
		entry_json.insert("operation".into(), Value::from(entry.operation.wire_str()));
		if let Some(level) = entry.log_level {
			entry_json.insert("log_level".into(), Value::from(level.wire_str()));
		}
		if let Some(ignore_version) = entry.ignore_version {
			entry_json.insert("ignore_version".into(), Value::from(ignore_version));
		}
		(key.wire_key(), Value::Object(entry_json))
	});
	Value::Object(entries.collect())
}

/// A validated inbound packet (spec.md §3).
#[derive(Debug, Clone)]
pub struct Packet {
	pub response_queue: String,
	pub version_utc_seconds: f64,
	pub verb: String,
	pub uuid: String,
	pub sent_at: f64,
	pub args: Value,
	pub style: Option<StyleTable>,
	pub ignore_version: bool,
}

impl Packet {
	pub fn is_void(&self) -> bool {
		self.response_queue.starts_with("void")
	}
}

/// The three outbound reply shapes (spec.md §6).
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Reply {
	#[serde(rename = "copy")]
	Copy { uuid: String, status: Value, info: Option<Value> },
	#[serde(rename = "success")]
	Success { uuid: String },
	#[serde(rename = "failure")]
	Failure { uuid: String },
}
