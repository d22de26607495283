//! `_ping`: liveness check, no Reddit call involved.

use std::collections::HashMap;

use serde_json::Value;

use super::{insert, HandlerEntry, HandlerFuture};
use crate::auth::Token;
use crate::client::RedditClient;
use crate::packet::HandlerStatus;

pub fn register(handlers: &mut HashMap<&'static str, HandlerEntry>) {
	insert(handlers, "_ping", false, invoke);
}

fn invoke<'a>(_reddit: &'a RedditClient, _token: &'a Token, _args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move { Ok((HandlerStatus::Success, None)) })
}
