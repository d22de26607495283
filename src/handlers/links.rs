//! `subreddit_links`, `flair_link`.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::{insert, opt_str_arg, opt_u32_arg, str_arg, HandlerEntry, HandlerFuture};
use crate::auth::Token;
use crate::client::RedditClient;
use crate::packet::HandlerStatus;

pub fn register(handlers: &mut HashMap<&'static str, HandlerEntry>) {
	insert(handlers, "subreddit_links", true, subreddit_links);
	insert(handlers, "flair_link", true, flair_link);
}

fn subreddit_links<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		if opt_u32_arg(args, "limit") == Some(0) {
			return Ok((HandlerStatus::Http(400), None));
		}
		let subreddit = str_arg(args, "subreddit")?;
		let limit = opt_u32_arg(args, "limit");
		let after = opt_str_arg(args, "after");
		let resp = reddit.subreddit_links(token, subreddit, limit, after).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}

		let data = &resp.body["data"];
		let after = data.get("after").cloned().unwrap_or(Value::Null);

		let mut self_posts: Vec<Value> = Vec::new();
		let mut url_posts: Vec<Value> = Vec::new();

		for child in data["children"].as_array().into_iter().flatten() {
			let child = &child["data"];
			if !child["banned_at_utc"].is_null() || child["removed"].as_bool().unwrap_or(false) {
				continue;
			}
			let info = json!({
				"fullname": child["name"],
				"title": child["title"],
				"author": child["author"],
				"subreddit": child["subreddit"],
				"created_utc": child["created_utc"],
			});
			if child["is_self"].as_bool().unwrap_or(false) {
				let mut entry = info;
				entry["body"] = child["selftext"].clone();
				self_posts.push(entry);
			} else {
				let mut entry = info;
				entry["url"] = child["url"].clone();
				url_posts.push(entry);
			}
		}

		let by_created_desc = |a: &Value, b: &Value| b["created_utc"].as_f64().partial_cmp(&a["created_utc"].as_f64()).unwrap();
		self_posts.sort_by(by_created_desc);
		url_posts.sort_by(by_created_desc);

		if let Some(limit) = limit {
			let limit = limit as usize;
			while self_posts.len() + url_posts.len() > limit {
				let drop_self = match (self_posts.last(), url_posts.last()) {
					(Some(s), Some(u)) => s["created_utc"].as_f64() < u["created_utc"].as_f64(),
					(Some(_), None) => true,
					_ => false,
				};
				if drop_self {
					self_posts.pop();
				} else {
					url_posts.pop();
				}
			}
		}

		Ok((HandlerStatus::Http(resp.status), Some(json!({ "self": self_posts, "url": url_posts, "after": after }))))
	})
}

fn flair_link<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let subreddit = str_arg(args, "subreddit")?;
		let link_fullname = opt_str_arg(args, "link_fullname");
		let css_class = opt_str_arg(args, "css_class");
		let text = opt_str_arg(args, "text");
		let Some(link_fullname) = link_fullname else {
			return Err(crate::error::HandlerError::MissingArg("link_fullname"));
		};
		let resp = reddit.flair_link(token, subreddit, link_fullname, css_class, text).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		Ok((HandlerStatus::Success, None))
	})
}
