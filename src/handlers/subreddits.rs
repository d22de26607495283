//! `subreddit_moderators`.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::{insert, str_arg, HandlerEntry, HandlerFuture};
use crate::auth::Token;
use crate::client::RedditClient;
use crate::packet::HandlerStatus;

pub fn register(handlers: &mut HashMap<&'static str, HandlerEntry>) {
	insert(handlers, "subreddit_moderators", true, subreddit_moderators);
}

fn subreddit_moderators<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let subreddit = str_arg(args, "subreddit")?;
		let resp = reddit.subreddit_moderators(token, subreddit).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		let mods: Vec<Value> = resp.body["data"]["children"]
			.as_array()
			.into_iter()
			.flatten()
			.map(|child| json!({ "username": child["name"], "mod_permissions": child["mod_permissions"] }))
			.collect();
		Ok((HandlerStatus::Http(resp.status), Some(json!({ "mods": mods }))))
	})
}
