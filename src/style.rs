//! Response-Style Resolver (C5, spec.md §4.5).

use crate::packet::{HandlerStatus, LogLevel, Operation, StatusKey, StyleEntry, StyleTable};

/// The hard fallback used when neither the client's table nor the system
/// default table match a status (spec.md §3, §4.5).
pub fn fallback_style() -> StyleEntry {
	StyleEntry {
		operation: Operation::Retry,
		log_level: Some(LogLevel::Warn),
		ignore_version: None,
	}
}

/// Builds the system default table: `2xx->copy/TRACE`, `4xx->failure/WARN`,
/// `5xx->retry/WARN`.
pub fn default_table() -> StyleTable {
	let mut table = StyleTable::new();
	table.insert(
		StatusKey::Class(2),
		StyleEntry { operation: Operation::Copy, log_level: Some(LogLevel::Trace), ignore_version: None },
	);
	table.insert(
		StatusKey::Class(4),
		StyleEntry { operation: Operation::Failure, log_level: Some(LogLevel::Warn), ignore_version: None },
	);
	table.insert(
		StatusKey::Class(5),
		StyleEntry { operation: Operation::Retry, log_level: Some(LogLevel::Warn), ignore_version: None },
	);
	table
}

fn lookup(table: &StyleTable, status: u16) -> Option<&StyleEntry> {
	table.get(&StatusKey::Exact(status)).or_else(|| {
		let class = (status / 100) as u8;
		table.get(&StatusKey::Class(class))
	})
}

/// Resolves the effective style entry for `status`, given an optional
/// client table and the system `defaults` table.
///
/// Resolution order (spec.md §4.5):
/// 1. The sentinel shortcuts for `success`/`failure` bypass both tables.
/// 2. Otherwise look up the client table first (exact status, then class
///    wildcard); any field missing from the match is filled in from the
///    same lookup against `defaults`.
/// 3. If the client table has no match at all, use `defaults` wholesale.
/// 4. If neither matches, use [`fallback_style`].
pub fn resolve(style: Option<&StyleTable>, status: HandlerStatus, defaults: &StyleTable) -> StyleEntry {
	let code = match status {
		HandlerStatus::Success => return StyleEntry { operation: Operation::Success, log_level: Some(LogLevel::Trace), ignore_version: None },
		HandlerStatus::Failure => return StyleEntry { operation: Operation::Failure, log_level: Some(LogLevel::Trace), ignore_version: None },
		HandlerStatus::Http(code) => code,
	};

	let default_match = lookup(defaults, code);

	let Some(style) = style else {
		return default_match.cloned().unwrap_or_else(fallback_style);
	};

	let Some(client_match) = lookup(style, code) else {
		return default_match.cloned().unwrap_or_else(fallback_style);
	};

	let mut merged = client_match.clone();
	if let Some(default_match) = default_match {
		if merged.log_level.is_none() {
			merged.log_level = default_match.log_level;
		}
		if merged.ignore_version.is_none() {
			merged.ignore_version = default_match.ignore_version;
		}
	}
	merged
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn table(entries: Vec<(StatusKey, StyleEntry)>) -> StyleTable {
		HashMap::from_iter(entries)
	}

	#[test]
	fn success_and_failure_bypass_tables() {
		let defaults = default_table();
		let entry = resolve(None, HandlerStatus::Success, &defaults);
		assert_eq!(entry.operation, Operation::Success);
		assert_eq!(entry.log_level, Some(LogLevel::Trace));

		let entry = resolve(None, HandlerStatus::Failure, &defaults);
		assert_eq!(entry.operation, Operation::Failure);
	}

	#[test]
	fn no_client_table_uses_defaults() {
		let defaults = default_table();
		let entry = resolve(None, HandlerStatus::Http(200), &defaults);
		assert_eq!(entry.operation, Operation::Copy);
		let entry = resolve(None, HandlerStatus::Http(503), &defaults);
		assert_eq!(entry.operation, Operation::Retry);
	}

	#[test]
	fn unmatched_status_falls_back_to_retry_warn() {
		let defaults = table(vec![]);
		let entry = resolve(None, HandlerStatus::Http(200), &defaults);
		assert_eq!(entry.operation, Operation::Retry);
		assert_eq!(entry.log_level, Some(LogLevel::Warn));
	}

	#[test]
	fn exact_status_key_wins_over_class_wildcard() {
		let defaults = default_table();
		let client = table(vec![(
			StatusKey::Exact(404),
			StyleEntry { operation: Operation::Retry, log_level: None, ignore_version: None },
		)]);
		let entry = resolve(Some(&client), HandlerStatus::Http(404), &defaults);
		assert_eq!(entry.operation, Operation::Retry);
		// log_level missing from client entry, filled from defaults' 4xx->WARN
		assert_eq!(entry.log_level, Some(LogLevel::Warn));
	}

	#[test]
	fn client_table_with_no_match_falls_to_full_defaults() {
		let defaults = default_table();
		let client = table(vec![(
			StatusKey::Exact(404),
			StyleEntry { operation: Operation::Retry, log_level: None, ignore_version: None },
		)]);
		// 500 isn't in the client table at all -> whole default 5xx entry used
		let entry = resolve(Some(&client), HandlerStatus::Http(500), &defaults);
		assert_eq!(entry.operation, Operation::Retry);
		assert_eq!(entry.log_level, Some(LogLevel::Warn));
	}

	#[test]
	fn retry_style_carries_ignore_version() {
		let defaults = default_table();
		let client = table(vec![(
			StatusKey::Class(5),
			StyleEntry { operation: Operation::Retry, log_level: None, ignore_version: Some(true) },
		)]);
		let entry = resolve(Some(&client), HandlerStatus::Http(500), &defaults);
		assert_eq!(entry.ignore_version, Some(true));
	}
}
