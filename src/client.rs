//! Reddit Client Facade (C2, spec.md §4.2).
//!
//! One method per verb, each attaching the bot's `User-Agent` and the
//! current bearer token, returning the raw `(status, body)` pair without
//! interpreting it — interpretation is the handler's job (C1). Network and
//! parse errors propagate as `ClientError`; non-2xx HTTP responses do not,
//! the handler observes them via `status`.

use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use crate::auth::Token;
use crate::error::ClientError;

pub const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// The raw result of an upstream call: a status code plus whatever JSON
/// body Reddit returned (or `Value::Null` for bodiless responses).
#[derive(Debug, Clone)]
pub struct RawResponse {
	pub status: u16,
	pub body: Value,
}

impl RawResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

pub struct RedditClient {
	http: reqwest::Client,
	user_agent: String,
	oauth_base: String,
}

impl RedditClient {
	pub fn new(http: reqwest::Client, user_agent: String) -> Self {
		Self::with_base(http, user_agent, OAUTH_BASE.to_string())
	}

	/// Like [`Self::new`] but pointed at an arbitrary base URL; used in
	/// tests to aim the client at an in-process mock server.
	pub fn with_base(http: reqwest::Client, user_agent: String, oauth_base: String) -> Self {
		Self { http, user_agent, oauth_base }
	}

	fn request(&self, method: Method, url: &str, token: &Token) -> RequestBuilder {
		self.http.request(method, url).header("User-Agent", &self.user_agent).header("Authorization", token.auth_header())
	}

	async fn send(builder: RequestBuilder) -> Result<RawResponse, ClientError> {
		let resp = builder.send().await?;
		let status = resp.status().as_u16();
		let bytes = resp.bytes().await?;
		let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
		Ok(RawResponse { status, body })
	}

	pub async fn show_user(&self, token: &Token, username: &str) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/user/{username}/about");
		Self::send(self.request(Method::GET, &url, token)).await
	}

	pub async fn about_listing(&self, token: &Token, subreddit: &str, listing: &str) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/r/{subreddit}/about/{listing}");
		Self::send(self.request(Method::GET, &url, token)).await
	}

	pub async fn subreddit_comments(&self, token: &Token, subreddits: &str, limit: Option<u32>, after: Option<&str>) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/r/{subreddits}/comments");
		Self::send(paginate(self.request(Method::GET, &url, token), limit, after)).await
	}

	pub async fn subreddit_links(&self, token: &Token, subreddits: &str, limit: Option<u32>, after: Option<&str>) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/r/{subreddits}/new");
		Self::send(paginate(self.request(Method::GET, &url, token), limit, after)).await
	}

	pub async fn post_comment(&self, token: &Token, parent: &str, text: &str) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/api/comment");
		Self::send(self.request(Method::POST, &url, token).form(&[("thing_id", parent), ("text", text), ("api_type", "json")])).await
	}

	pub async fn lookup_comment(&self, token: &Token, link_fullname: &str, comment_fullname: &str) -> Result<RawResponse, ClientError> {
		let link_id = link_fullname.trim_start_matches("t3_");
		let base = &self.oauth_base;
		let url = format!("{base}/comments/{link_id}");
		Self::send(self.request(Method::GET, &url, token).query(&[("comment", comment_fullname)])).await
	}

	pub async fn flair_link(&self, token: &Token, subreddit: &str, link_fullname: &str, css_class: Option<&str>, text: Option<&str>) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/r/{subreddit}/api/flair");
		let mut form = vec![("api_type", "json"), ("link", link_fullname)];
		if let Some(css_class) = css_class {
			form.push(("css_class", css_class));
		}
		if let Some(text) = text {
			form.push(("text", text));
		}
		Self::send(self.request(Method::POST, &url, token).form(&form)).await
	}

	pub async fn subreddit_friend(
		&self,
		token: &Token,
		subreddit: &str,
		username: &str,
		relationship: &str,
		ban_message: Option<&str>,
		ban_note: Option<&str>,
	) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/r/{subreddit}/api/friend?api_type=json");
		let mut form = vec![("name", username), ("type", relationship)];
		if relationship == "banned" {
			form.push(("ban_reason", "other"));
			if let Some(message) = ban_message {
				form.push(("ban_message", message));
			}
			if let Some(note) = ban_note {
				form.push(("note", note));
			}
		}
		Self::send(self.request(Method::POST, &url, token).form(&form)).await
	}

	pub async fn subreddit_unfriend(&self, token: &Token, subreddit: &str, username: &str, relationship: &str) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/r/{subreddit}/api/unfriend");
		Self::send(self.request(Method::POST, &url, token).form(&[("name", username), ("type", relationship)])).await
	}

	pub async fn unread(&self, token: &Token, limit: Option<u32>) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/message/unread");
		Self::send(paginate(self.request(Method::GET, &url, token), limit, None)).await
	}

	pub async fn compose(&self, token: &Token, recipient: &str, subject: &str, body: &str) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/api/compose");
		Self::send(self.request(Method::POST, &url, token).form(&[("api_type", "json"), ("to", recipient), ("subject", subject), ("text", body)])).await
	}

	pub async fn mark_all_read(&self, token: &Token) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/api/read_all_messages");
		Self::send(self.request(Method::POST, &url, token)).await
	}

	pub async fn modlog(&self, token: &Token, subreddits: &str, limit: Option<u32>, after: Option<&str>) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/r/{subreddits}/about/log");
		Self::send(paginate(self.request(Method::GET, &url, token), limit, after)).await
	}

	pub async fn subreddit_moderators(&self, token: &Token, subreddit: &str) -> Result<RawResponse, ClientError> {
		let base = &self.oauth_base;
		let url = format!("{base}/r/{subreddit}/about/moderators");
		Self::send(self.request(Method::GET, &url, token)).await
	}
}

/// Attaches `limit`/`after` query params when present; omitting a param
/// entirely (rather than sending it empty) is what tells Reddit "use the
/// default" (spec.md §4.2).
fn paginate(builder: RequestBuilder, limit: Option<u32>, after: Option<&str>) -> RequestBuilder {
	let mut query: Vec<(&str, String)> = Vec::new();
	if let Some(limit) = limit {
		query.push(("limit", limit.to_string()));
	}
	if let Some(after) = after {
		query.push(("after", after.to_string()));
	}
	builder.query(&query)
}
