//! `show_user`, `user_is_moderator`, `user_is_approved`, `user_is_banned`.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::{insert, str_arg, HandlerEntry, HandlerFuture};
use crate::auth::Token;
use crate::client::RedditClient;
use crate::error::HandlerError;
use crate::packet::HandlerStatus;

pub fn register(handlers: &mut HashMap<&'static str, HandlerEntry>) {
	insert(handlers, "show_user", true, show_user);
	insert(handlers, "user_is_moderator", true, user_is_moderator);
	insert(handlers, "user_is_approved", true, user_is_approved);
	insert(handlers, "user_is_banned", true, user_is_banned);
}

fn show_user<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let username = str_arg(args, "username")?;
		let resp = reddit.show_user(token, username).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		let data = &resp.body["data"];
		let link_karma = data["link_karma"].as_i64().unwrap_or_default();
		let comment_karma = data["comment_karma"].as_i64().unwrap_or_default();
		let reply = json!({
			"cumulative_karma": link_karma + comment_karma,
			"link_karma": link_karma,
			"comment_karma": comment_karma,
			"created_at_utc_seconds": data["created_utc"].as_f64().unwrap_or_default(),
		});
		Ok((HandlerStatus::Http(resp.status), Some(reply)))
	})
}

/// Shared by the three relationship-listing verbs: fetch a listing, check
/// whether any child's `name` case-insensitively matches the username.
async fn relationship_listing(reddit: &RedditClient, token: &Token, args: &Value, listing: &str) -> Result<(HandlerStatus, Option<bool>), HandlerError> {
	let subreddit = str_arg(args, "subreddit")?;
	let username = str_arg(args, "username")?;
	let resp = reddit.about_listing(token, subreddit, listing).await?;
	if !resp.is_success() {
		return Ok((HandlerStatus::Http(resp.status), None));
	}
	let present = resp.body["data"]["children"]
		.as_array()
		.into_iter()
		.flatten()
		.any(|child| child["name"].as_str().is_some_and(|name| name.eq_ignore_ascii_case(username)));
	Ok((HandlerStatus::Http(resp.status), Some(present)))
}

fn user_is_moderator<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let (status, present) = relationship_listing(reddit, token, args, "moderators").await?;
		Ok((status, present.map(|p| json!({ "moderator": p }))))
	})
}

fn user_is_approved<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let (status, present) = relationship_listing(reddit, token, args, "contributors").await?;
		Ok((status, present.map(|p| json!({ "approved": p }))))
	})
}

fn user_is_banned<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let (status, present) = relationship_listing(reddit, token, args, "banned").await?;
		Ok((status, present.map(|p| json!({ "banned": p }))))
	})
}
