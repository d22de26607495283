//! `ban_user`, `unban_user`, `approve_user`, `disapprove_user`.
//!
//! `approve_user`/`disapprove_user` aren't in the original handler set; they
//! round out the ban/unban pair onto the `contributor` relationship the same
//! way the friend/unfriend endpoints already support it.

use std::collections::HashMap;

use serde_json::Value;

use super::{insert, opt_str_arg, str_arg, HandlerEntry, HandlerFuture};
use crate::auth::Token;
use crate::client::RedditClient;
use crate::packet::HandlerStatus;

pub fn register(handlers: &mut HashMap<&'static str, HandlerEntry>) {
	insert(handlers, "ban_user", true, ban_user);
	insert(handlers, "unban_user", true, unban_user);
	insert(handlers, "approve_user", true, approve_user);
	insert(handlers, "disapprove_user", true, disapprove_user);
}

fn ban_user<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let subreddit = str_arg(args, "subreddit")?;
		let username = str_arg(args, "username")?;
		let message = opt_str_arg(args, "message");
		let note = opt_str_arg(args, "note");
		let resp = reddit.subreddit_friend(token, subreddit, username, "banned", message, note).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		Ok((HandlerStatus::Success, None))
	})
}

fn unban_user<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let subreddit = str_arg(args, "subreddit")?;
		let username = str_arg(args, "username")?;
		let resp = reddit.subreddit_unfriend(token, subreddit, username, "banned").await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		Ok((HandlerStatus::Success, None))
	})
}

fn approve_user<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let subreddit = str_arg(args, "subreddit")?;
		let username = str_arg(args, "username")?;
		let resp = reddit.subreddit_friend(token, subreddit, username, "contributor", None, None).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		Ok((HandlerStatus::Success, None))
	})
}

fn disapprove_user<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let subreddit = str_arg(args, "subreddit")?;
		let username = str_arg(args, "username")?;
		let resp = reddit.subreddit_unfriend(token, subreddit, username, "contributor").await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		Ok((HandlerStatus::Success, None))
	})
}
