//! Handler Registry (C1, spec.md §4.1).
//!
//! Maps a verb name to the closure that knows whether the call costs a
//! Reddit-quota slot and how to turn the raw HTTP response into a
//! canonical payload. The original implementation builds this registry
//! via runtime reflection over a directory of modules (see Design Note
//! "Dynamic verb dispatch" in spec.md §9); here it's an explicit,
//! statically-built map from verb name to a plain function pointer, each
//! one a small async fn defined in a sibling module, the same shape as
//! the teacher's per-endpoint structs but without the indirection of a
//! trait object (no handler instance carries its own state).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::auth::Token;
use crate::client::RedditClient;
use crate::error::HandlerError;
use crate::packet::HandlerStatus;

mod accounts;
mod comments;
mod friends;
mod links;
mod messages;
mod modlog;
mod ping;
mod subreddits;

pub type HandlerOutput = Result<(HandlerStatus, Option<Value>), HandlerError>;
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = HandlerOutput> + Send + 'a>>;

/// Signature every verb's implementation function has.
pub type HandlerFn = for<'a> fn(&'a RedditClient, &'a Token, &'a Value) -> HandlerFuture<'a>;

/// A single registered verb: whether it consumes a Reddit-quota slot, and
/// how to invoke it.
pub struct HandlerEntry {
	pub requires_delay: bool,
	pub invoke: HandlerFn,
}

/// The finite set of verbs the broker understands, keyed by name and
/// resolved in O(1).
pub struct HandlerRegistry {
	handlers: HashMap<&'static str, HandlerEntry>,
}

impl HandlerRegistry {
	pub fn new() -> Self {
		let mut handlers = HashMap::new();
		ping::register(&mut handlers);
		accounts::register(&mut handlers);
		comments::register(&mut handlers);
		links::register(&mut handlers);
		friends::register(&mut handlers);
		messages::register(&mut handlers);
		modlog::register(&mut handlers);
		subreddits::register(&mut handlers);
		Self { handlers }
	}

	pub fn get(&self, verb: &str) -> Option<&HandlerEntry> {
		self.handlers.get(verb)
	}
}

impl Default for HandlerRegistry {
	fn default() -> Self {
		Self::new()
	}
}

fn insert(handlers: &mut HashMap<&'static str, HandlerEntry>, verb: &'static str, requires_delay: bool, invoke: HandlerFn) {
	handlers.insert(verb, HandlerEntry { requires_delay, invoke });
}

fn str_arg<'a>(args: &'a Value, key: &'static str) -> Result<&'a str, HandlerError> {
	args.get(key).and_then(Value::as_str).ok_or(HandlerError::MissingArg(key))
}

fn opt_str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
	args.get(key).and_then(Value::as_str)
}

fn opt_u32_arg(args: &Value, key: &str) -> Option<u32> {
	args.get(key).and_then(Value::as_u64).map(|v| v as u32)
}

fn str_array_arg<'a>(args: &'a Value, key: &'static str) -> Result<Vec<&'a str>, HandlerError> {
	args.get(key)
		.and_then(Value::as_array)
		.map(|arr| arr.iter().filter_map(Value::as_str).collect())
		.ok_or(HandlerError::MissingArg(key))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registry_resolves_every_canonical_verb() {
		let registry = HandlerRegistry::new();
		for verb in [
			"_ping",
			"show_user",
			"user_is_moderator",
			"user_is_approved",
			"user_is_banned",
			"subreddit_comments",
			"post_comment",
			"lookup_comment",
			"subreddit_links",
			"flair_link",
			"ban_user",
			"unban_user",
			"approve_user",
			"disapprove_user",
			"inbox",
			"compose",
			"mark_all_read",
			"modlog",
			"subreddit_moderators",
		] {
			assert!(registry.get(verb).is_some(), "missing handler for {verb}");
		}
	}

	#[test]
	fn unknown_verb_resolves_to_none() {
		let registry = HandlerRegistry::new();
		assert!(registry.get("delete_universe").is_none());
	}
}
