//! `subreddit_comments`, `post_comment`, `lookup_comment`.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::{insert, opt_str_arg, opt_u32_arg, str_arg, HandlerEntry, HandlerFuture};
use crate::auth::Token;
use crate::client::RedditClient;
use crate::packet::HandlerStatus;

pub fn register(handlers: &mut HashMap<&'static str, HandlerEntry>) {
	insert(handlers, "subreddit_comments", true, subreddit_comments);
	insert(handlers, "post_comment", true, post_comment);
	insert(handlers, "lookup_comment", true, lookup_comment);
}

fn comment_record(child: &Value) -> Value {
	json!({
		"fullname": child["name"],
		"body": child["body"],
		"author": child["author"],
		"link_fullname": child["link_id"],
		"link_author": child["link_author"],
		"subreddit": child["subreddit"],
		"created_utc": child["created_utc"],
	})
}

fn subreddit_comments<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let subreddit = str_arg(args, "subreddit")?;
		let limit = opt_u32_arg(args, "limit");
		let after = opt_str_arg(args, "after");
		let resp = reddit.subreddit_comments(token, subreddit, limit, after).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		let data = &resp.body["data"];
		let after = data.get("after").cloned().unwrap_or(Value::Null);
		let mut comments: Vec<Value> = data["children"].as_array().into_iter().flatten().map(|c| comment_record(&c["data"])).collect();
		comments.sort_by(|a, b| b["created_utc"].as_f64().partial_cmp(&a["created_utc"].as_f64()).unwrap());
		if let Some(limit) = limit {
			comments.truncate(limit as usize);
		}
		Ok((HandlerStatus::Http(resp.status), Some(json!({ "comments": comments, "after": after }))))
	})
}

fn post_comment<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let parent = str_arg(args, "parent")?;
		let text = str_arg(args, "text")?;
		let resp = reddit.post_comment(token, parent, text).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		Ok((HandlerStatus::Success, None))
	})
}

fn lookup_comment<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let link_fullname = str_arg(args, "link_fullname")?;
		let comment_fullname = str_arg(args, "comment_fullname")?;
		let resp = reddit.lookup_comment(token, link_fullname, comment_fullname).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		resolve_lookup(resp.status, &resp.body)
	})
}

/// Disambiguates the two-listing response and builds the reply, or 404s on
/// a genuinely empty listing. Split out from `lookup_comment` so the
/// listing-order logic is unit-testable without a network round trip.
fn resolve_lookup(status: u16, body: &Value) -> Result<(HandlerStatus, Option<Value>), crate::error::HandlerError> {
	let listings = match body.as_array() {
		Some(arr) if arr.len() == 2 => arr,
		_ => return Ok((HandlerStatus::Http(404), None)),
	};

	let (link_listing, comment_listing) = if !listings[0]["data"]["dist"].is_null() { (&listings[0], &listings[1]) } else { (&listings[1], &listings[0]) };

	if !comment_listing["data"]["dist"].is_null() {
		return Ok((HandlerStatus::Http(404), None));
	}

	let Some(child) = comment_listing["data"]["children"].as_array().and_then(|c| c.first()) else {
		return Ok((HandlerStatus::Http(404), None));
	};
	if child["kind"] != "t1" {
		return Err(crate::error::HandlerError::UnexpectedShape("expected kind=t1 in comment listing"));
	}
	let link_children = link_listing["data"]["children"].as_array();
	let Some(link_child) = link_children.and_then(|c| c.first()) else {
		return Err(crate::error::HandlerError::UnexpectedShape("expected kind=t3 in link listing"));
	};
	if link_child["kind"] != "t3" {
		return Err(crate::error::HandlerError::UnexpectedShape("expected kind=t3 in link listing"));
	}

	let child = &child["data"];
	let link_child = &link_child["data"];
	let reply = json!({
		"fullname": child["name"],
		"body": child["body"],
		"author": child["author"],
		"link_fullname": link_child["name"],
		"link_author": link_child["author"],
		"subreddit": child["subreddit"],
		"created_utc": child["created_utc"],
	});
	Ok((HandlerStatus::Http(status), Some(reply)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn comment_listing_json(dist: Value, fullname: &str) -> Value {
		json!({ "data": { "dist": dist, "children": [{ "kind": "t1", "data": { "name": fullname, "body": "hi", "author": "a", "subreddit": "s", "created_utc": 1.0 } }] } })
	}

	fn link_listing_json(dist: Value, fullname: &str) -> Value {
		json!({ "data": { "dist": dist, "children": [{ "kind": "t3", "data": { "name": fullname, "author": "op" } }] } })
	}

	#[test]
	fn resolves_when_comment_listing_is_first() {
		let body = json!([comment_listing_json(json!(1), "t1_c"), link_listing_json(Value::Null, "t3_l")]);
		let (status, info) = resolve_lookup(200, &body).unwrap();
		assert_eq!(status, HandlerStatus::Http(200));
		let info = info.unwrap();
		assert_eq!(info["fullname"], "t1_c");
		assert_eq!(info["link_fullname"], "t3_l");
	}

	#[test]
	fn resolves_when_link_listing_is_first() {
		let body = json!([link_listing_json(Value::Null, "t3_l"), comment_listing_json(json!(1), "t1_c")]);
		let (status, info) = resolve_lookup(200, &body).unwrap();
		assert_eq!(status, HandlerStatus::Http(200));
		let info = info.unwrap();
		assert_eq!(info["fullname"], "t1_c");
		assert_eq!(info["link_fullname"], "t3_l");
	}

	#[test]
	fn empty_comment_listing_is_404() {
		let body = json!([json!({ "data": { "dist": 1, "children": [] } }), link_listing_json(Value::Null, "t3_l")]);
		let (status, info) = resolve_lookup(200, &body).unwrap();
		assert_eq!(status, HandlerStatus::Http(404));
		assert!(info.is_none());
	}
}
