//! `inbox`, `compose`, `mark_all_read`.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::{insert, str_arg, HandlerEntry, HandlerFuture};
use crate::auth::Token;
use crate::client::RedditClient;
use crate::packet::HandlerStatus;

const INBOX_PAGE_SIZE: u32 = 25;

pub fn register(handlers: &mut HashMap<&'static str, HandlerEntry>) {
	insert(handlers, "inbox", true, inbox);
	insert(handlers, "compose", true, compose);
	insert(handlers, "mark_all_read", true, mark_all_read);
}

fn inbox<'a>(reddit: &'a RedditClient, token: &'a Token, _args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let resp = reddit.unread(token, Some(INBOX_PAGE_SIZE)).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		let mut messages = Vec::new();
		let mut comments = Vec::new();
		for child in resp.body["data"]["children"].as_array().into_iter().flatten() {
			if child["was_comment"].as_bool().unwrap_or(false) {
				comments.push(json!({
					"fullname": child["name"],
					"body": child["body"],
					"author": child["author"],
					"subreddit": child["subreddit"],
					"created_utc": child["created_utc"],
				}));
			} else {
				messages.push(json!({
					"fullname": child["name"],
					"subject": child["subject"],
					"body": child["body"],
					"author": child["author"],
					"created_utc": child["created_utc"],
				}));
			}
		}
		Ok((HandlerStatus::Http(resp.status), Some(json!({ "messages": messages, "comments": comments }))))
	})
}

fn compose<'a>(reddit: &'a RedditClient, token: &'a Token, args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let recipient = str_arg(args, "recipient")?;
		let subject = str_arg(args, "subject")?;
		let body = str_arg(args, "body")?;
		let resp = reddit.compose(token, recipient, subject, body).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		Ok((HandlerStatus::Success, None))
	})
}

fn mark_all_read<'a>(reddit: &'a RedditClient, token: &'a Token, _args: &'a Value) -> HandlerFuture<'a> {
	Box::pin(async move {
		let resp = reddit.mark_all_read(token).await?;
		if !resp.is_success() {
			return Ok((HandlerStatus::Http(resp.status), None));
		}
		Ok((HandlerStatus::Success, None))
	})
}
