//! Auth Manager (C3, spec.md §4.3).
//!
//! Caches a bearer token for the configured bot account and knows how to
//! get a fresh one; it does not decide *when* that's necessary — that's
//! the dispatch loop's job (§4.6f). Grounded in the teacher's `oauth.rs`
//! token-cache pattern (`ArcSwap` holding the current credential, swapped
//! out wholesale on refresh) but built around the password grant the
//! original implementation uses instead of the teacher's device-spoofing
//! flows.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;

use crate::error::AuthError;

pub const LOGIN_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const REVOKE_URL: &str = "https://www.reddit.com/api/v1/revoke_token";

/// A cached Reddit bearer token (spec.md §3).
///
/// Invariant: whenever one of these is the currently-cached token, its
/// `expires_at` is at least 15 minutes in the future; callers that observe
/// otherwise are expected to trigger a refresh before using it.
#[derive(Debug, Clone)]
pub struct Token {
	pub access_token: String,
	pub token_type: String,
	pub expires_at: DateTime<Utc>,
	pub scope: String,
}

impl Token {
	pub fn auth_header(&self) -> String {
		format!("{} {}", self.token_type, self.access_token)
	}

	/// True once fewer than `margin` remain before expiry.
	pub fn needs_refresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
		let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::zero());
		self.expires_at - now < margin
	}
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
	access_token: String,
	token_type: String,
	expires_in: i64,
	scope: String,
}

/// Issues and caches bearer tokens for a single bot account.
pub struct AuthManager {
	http: reqwest::Client,
	user_agent: String,
	username: String,
	password: String,
	client_id: String,
	client_secret: String,
	login_url: String,
	revoke_url: String,
	cached: ArcSwapOption<Token>,
}

impl AuthManager {
	pub fn new(http: reqwest::Client, user_agent: String, username: String, password: String, client_id: String, client_secret: String) -> Self {
		Self::with_endpoints(http, user_agent, username, password, client_id, client_secret, LOGIN_URL.to_string(), REVOKE_URL.to_string())
	}

	/// Like [`Self::new`] but pointed at arbitrary login/revoke endpoints;
	/// used in tests to aim the manager at an in-process mock server.
	#[allow(clippy::too_many_arguments)]
	pub fn with_endpoints(
		http: reqwest::Client,
		user_agent: String,
		username: String,
		password: String,
		client_id: String,
		client_secret: String,
		login_url: String,
		revoke_url: String,
	) -> Self {
		Self { http, user_agent, username, password, client_id, client_secret, login_url, revoke_url, cached: ArcSwapOption::empty() }
	}

	/// `current_auth()` from spec.md §4.3: the cached token, if any.
	pub fn current_auth(&self) -> Option<Arc<Token>> {
		self.cached.load_full()
	}

	/// Forces the next freshness check to consider the cache empty.
	///
	/// Purges unconditionally: the caller (dispatch loop, on a 401) knows
	/// the token is bad even though its nominal expiry hasn't passed.
	pub fn invalidate(&self) {
		self.cached.store(None);
	}

	/// Executes the password-grant login flow against Reddit and, on
	/// success, caches and returns the resulting token. On failure
	/// (network error or a non-2xx response) returns `Err` and leaves the
	/// cache untouched; the dispatch loop is responsible for requeueing
	/// the packet that triggered the refresh.
	pub async fn refresh(&self) -> Result<Arc<Token>, AuthError> {
		let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));

		let resp = self
			.http
			.post(&self.login_url)
			.header("User-Agent", &self.user_agent)
			.header("Authorization", format!("Basic {basic}"))
			.form(&[("grant_type", "password"), ("username", &self.username), ("password", &self.password)])
			.send()
			.await?;

		let status = resp.status();
		if !status.is_success() {
			warn!("[auth] login rejected with status {status}");
			return Err(AuthError::LoginRejected(status.as_u16()));
		}

		let body: LoginResponse = resp.json().await.map_err(|_| AuthError::MalformedResponse("body"))?;

		let token = Arc::new(Token {
			access_token: body.access_token,
			token_type: body.token_type,
			expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in),
			scope: body.scope,
		});

		debug!("[auth] refreshed token, expires at {}", token.expires_at);
		self.cached.store(Some(token.clone()));
		Ok(token)
	}

	/// Revokes the cached token against Reddit, if one is cached. Not part
	/// of the hot dispatch path; used on clean shutdown.
	pub async fn revoke(&self) -> Result<(), AuthError> {
		let Some(token) = self.cached.load_full() else {
			return Ok(());
		};
		let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));
		self.http
			.post(&self.revoke_url)
			.header("User-Agent", &self.user_agent)
			.header("Authorization", format!("Basic {basic}"))
			.form(&[("token", token.access_token.as_str()), ("token_type_hint", "access_token")])
			.send()
			.await?;
		self.cached.store(None);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn token_needs_refresh_inside_margin() {
		let token = Token {
			access_token: "a".into(),
			token_type: "bearer".into(),
			expires_at: Utc::now() + chrono::Duration::minutes(10),
			scope: "*".into(),
		};
		assert!(token.needs_refresh_at(Utc::now(), Duration::from_secs(15 * 60)));
	}

	#[test]
	fn token_fresh_outside_margin() {
		let token = Token {
			access_token: "a".into(),
			token_type: "bearer".into(),
			expires_at: Utc::now() + chrono::Duration::minutes(30),
			scope: "*".into(),
		};
		assert!(!token.needs_refresh_at(Utc::now(), Duration::from_secs(15 * 60)));
	}

	#[test]
	fn fresh_manager_has_no_cached_token() {
		let manager = AuthManager::new(reqwest::Client::new(), "ua".into(), "u".into(), "p".into(), "id".into(), "secret".into());
		assert!(manager.current_auth().is_none());
	}

	#[test]
	fn invalidate_clears_any_cached_token() {
		let manager = AuthManager::new(reqwest::Client::new(), "ua".into(), "u".into(), "p".into(), "id".into(), "secret".into());
		manager.cached.store(Some(Arc::new(Token {
			access_token: "a".into(),
			token_type: "bearer".into(),
			expires_at: Utc::now() + chrono::Duration::hours(1),
			scope: "*".into(),
		})));
		assert!(manager.current_auth().is_some());
		manager.invalidate();
		assert!(manager.current_auth().is_none());
	}
}
