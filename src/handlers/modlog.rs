//! `modlog`.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::{insert, opt_str_arg, opt_u32_arg, str_array_arg, HandlerEntry, HandlerFuture};
use crate::auth::Token;
use crate::client::RedditClient;
use crate::packet::HandlerStatus;

pub fn register(handlers: &mut HashMap<&'static str, HandlerEntry>) {
	insert(handlers, "modlog", true, modlog);
}

fn modlog<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let subreddits = str_array_arg(args, "subreddits")?;
		// Each entry may itself carry embedded `+`s; flatten before rejoining.
		let flattened: Vec<&str> = subreddits.iter().flat_map(|sub| sub.split('+')).collect();
		let joined = flattened.join("+");

		let limit = opt_u32_arg(args, "limit");
		let after = opt_str_arg(args, "after");
		let resp = reddit.modlog(token, &joined, limit, after).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}

		let data = &resp.body["data"];
		let after = data.get("after").cloned().unwrap_or(Value::Null);
		let mut actions: Vec<Value> = data["children"]
			.as_array()
			.into_iter()
			.flatten()
			.map(|child| {
				let child = &child["data"];
				json!({
					"target_fullname": child.get("target_fullname"),
					"target_author": child.get("target_author"),
					"mod": child["mod"],
					"action": child["action"],
					"details": child.get("details"),
					"subreddit": child["subreddit"],
					"created_utc": child["created_utc"].as_f64(),
				})
			})
			.collect();
		actions.sort_by(|a, b| b["created_utc"].as_f64().partial_cmp(&a["created_utc"].as_f64()).unwrap());
		if let Some(limit) = limit {
			actions.truncate(limit as usize);
		}
		Ok((HandlerStatus::Http(resp.status), Some(json!({ "actions": actions, "after": after }))))
	})
}
