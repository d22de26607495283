//! End-to-end dispatch scenarios driven through an in-process mock Reddit
//! (`httpmock`) and an in-process mock queue, covering the scenarios laid
//! out for the dispatch loop: ping, a real verb round-trip, stale-version
//! dropping, retry-via-style, 401-triggered token invalidation, and
//! pagination.

use std::time::Duration;

use httpmock::prelude::*;
use reddit_broker::auth::AuthManager;
use reddit_broker::client::RedditClient;
use reddit_broker::dispatch::Dispatcher;
use reddit_broker::handlers::HandlerRegistry;
use reddit_broker::queue::MockQueue;
use serde_json::{json, Value};

fn login_body(token: &str) -> String {
	json!({ "access_token": token, "token_type": "bearer", "expires_in": 3600, "scope": "*" }).to_string()
}

fn packet(response_queue: &str, verb: &str, uuid: &str, version: f64, args: Value) -> Vec<u8> {
	serde_json::to_vec(&json!({
		"response_queue": response_queue,
		"version_utc_seconds": version,
		"type": verb,
		"uuid": uuid,
		"sent_at": version,
		"args": args,
	}))
	.unwrap()
}

fn packet_with_style(response_queue: &str, verb: &str, uuid: &str, version: f64, args: Value, style: Value) -> Vec<u8> {
	serde_json::to_vec(&json!({
		"response_queue": response_queue,
		"version_utc_seconds": version,
		"type": verb,
		"uuid": uuid,
		"sent_at": version,
		"args": args,
		"style": style,
	}))
	.unwrap()
}

async fn harness(server: &MockServer) -> (Dispatcher, MockQueue) {
	let http = reqwest::Client::new();
	let auth = AuthManager::with_endpoints(
		http.clone(),
		"test-broker/1.0".into(),
		"bot".into(),
		"hunter2".into(),
		"cid".into(),
		"secret".into(),
		server.url("/api/v1/access_token"),
		server.url("/revoke_token"),
	);
	let reddit = RedditClient::with_base(http, "test-broker/1.0".into(), server.base_url());
	let dispatcher = Dispatcher::new(auth, reddit, HandlerRegistry::new(), Duration::from_millis(5), "work".into());
	(dispatcher, MockQueue::new("work"))
}

async fn run_briefly(dispatcher: &mut Dispatcher, queue: &mut MockQueue, budget: Duration) {
	let _ = tokio::time::timeout(budget, dispatcher.run(queue)).await;
}

#[tokio::test]
async fn ping_scenario() {
	let server = MockServer::start_async().await;
	let _login = server.mock_async(|when, then| {
		when.method(POST).path("/api/v1/access_token");
		then.status(200).header("content-type", "application/json").body(login_body("tok-1"));
	}).await;

	let (mut dispatcher, mut queue) = harness(&server).await;
	queue.push("work", packet("resp-ping", "_ping", "U1", 1.0, json!({})));

	run_briefly(&mut dispatcher, &mut queue, Duration::from_millis(300)).await;

	let replies = queue.drain("resp-ping");
	assert_eq!(replies.len(), 1);
	let reply: Value = serde_json::from_slice(&replies[0]).unwrap();
	assert_eq!(reply["type"], "success");
	assert_eq!(reply["uuid"], "U1");
}

#[tokio::test]
async fn show_user_scenario() {
	let server = MockServer::start_async().await;
	server.mock_async(|when, then| {
		when.method(POST).path("/api/v1/access_token");
		then.status(200).header("content-type", "application/json").body(login_body("tok-1"));
	}).await;
	server.mock_async(|when, then| {
		when.method(GET).path("/user/Tjstretchalot/about");
		then.status(200).header("content-type", "application/json").body(
			json!({ "data": { "link_karma": 100, "comment_karma": 250, "created_utc": 1_600_000_000.0 } }).to_string(),
		);
	}).await;

	let (mut dispatcher, mut queue) = harness(&server).await;
	queue.push("work", packet("resp-user", "show_user", "U2", 1.0, json!({"username": "Tjstretchalot"})));

	run_briefly(&mut dispatcher, &mut queue, Duration::from_millis(300)).await;

	let replies = queue.drain("resp-user");
	assert_eq!(replies.len(), 1);
	let reply: Value = serde_json::from_slice(&replies[0]).unwrap();
	assert_eq!(reply["type"], "copy");
	assert_eq!(reply["status"], 200);
	assert_eq!(reply["info"]["cumulative_karma"], 350);
	assert!(reply["info"]["created_at_utc_seconds"].as_f64().is_some());
}

#[tokio::test]
async fn stale_version_is_dropped_silently() {
	let server = MockServer::start_async().await;
	server.mock_async(|when, then| {
		when.method(POST).path("/api/v1/access_token");
		then.status(200).header("content-type", "application/json").body(login_body("tok-1"));
	}).await;

	let (mut dispatcher, mut queue) = harness(&server).await;
	queue.push("work", packet("resp-stale", "_ping", "U3", 5.0, json!({})));
	queue.push("work", packet("resp-stale", "_ping", "U4", 3.0, json!({})));

	run_briefly(&mut dispatcher, &mut queue, Duration::from_millis(300)).await;

	let replies = queue.drain("resp-stale");
	assert_eq!(replies.len(), 1);
	let reply: Value = serde_json::from_slice(&replies[0]).unwrap();
	assert_eq!(reply["uuid"], "U3");
}

#[tokio::test]
async fn retry_style_republishes_with_ignore_version() {
	let server = MockServer::start_async().await;
	server.mock_async(|when, then| {
		when.method(POST).path("/api/v1/access_token");
		then.status(200).header("content-type", "application/json").body(login_body("tok-1"));
	}).await;
	server.mock_async(|when, then| {
		when.method(GET).path("/user/flaky/about");
		then.status(500);
	}).await;

	let (mut dispatcher, mut queue) = harness(&server).await;
	queue.push(
		"work",
		packet_with_style("resp-retry", "show_user", "U5", 1.0, json!({"username": "flaky"}), json!({"5xx": {"operation": "retry", "ignore_version": true}})),
	);

	run_briefly(&mut dispatcher, &mut queue, Duration::from_millis(300)).await;

	assert!(queue.drain("resp-retry").is_empty(), "no reply should be published for a retried delivery");
	let requeued = queue.drain("work");
	assert_eq!(requeued.len(), 1);
	let retried: Value = serde_json::from_slice(&requeued[0]).unwrap();
	assert_eq!(retried["ignore_version"], true);
	assert_eq!(retried["type"], "show_user");
	assert_eq!(retried["style"]["5xx"]["operation"], "retry", "the client's own style table must survive the republish");
}

#[tokio::test]
async fn a_401_invalidates_the_cached_token_before_the_next_call() {
	let server = MockServer::start_async().await;
	let login = server.mock_async(move |when, then| {
		when.method(POST).path("/api/v1/access_token");
		then.status(200).header("content-type", "application/json").body(login_body("tok-first"));
	}).await;
	server.mock_async(|when, then| {
		when.method(GET).path("/user/unauthorized/about").header("authorization", "bearer tok-first");
		then.status(401).header("content-type", "application/json").body(json!({"message": "Unauthorized"}).to_string());
	}).await;
	server.mock_async(|when, then| {
		when.method(GET).path("/user/authorized/about");
		then.status(200).header("content-type", "application/json").body(json!({"data": {"link_karma": 1, "comment_karma": 1, "created_utc": 1.0}}).to_string());
	}).await;

	let (mut dispatcher, mut queue) = harness(&server).await;
	queue.push("work", packet("resp-401", "show_user", "U6", 1.0, json!({"username": "unauthorized"})));
	queue.push("work", packet("resp-ok", "show_user", "U7", 1.0, json!({"username": "authorized"})));

	run_briefly(&mut dispatcher, &mut queue, Duration::from_millis(300)).await;

	let replies = queue.drain("resp-401");
	assert_eq!(replies.len(), 1);
	let reply: Value = serde_json::from_slice(&replies[0]).unwrap();
	assert_eq!(reply["status"], 401);
	assert!(!queue.drain("resp-ok").is_empty(), "the second packet still gets served after reauthenticating");

	// The second packet only gets served because the 401 purged the cached
	// token and a fresh login happened before it was dispatched.
	login.assert_calls_async(2).await;
}

#[tokio::test]
async fn pagination_yields_disjoint_older_pages() {
	let server = MockServer::start_async().await;
	server.mock_async(|when, then| {
		when.method(POST).path("/api/v1/access_token");
		then.status(200).header("content-type", "application/json").body(login_body("tok-1"));
	}).await;

	fn comment_child(name: &str, created_utc: f64) -> Value {
		json!({ "kind": "t1", "data": { "name": name, "body": "hi", "author": "a", "link_id": "t3_x", "link_author": "b", "subreddit": "s", "created_utc": created_utc } })
	}

	server.mock_async(|when, then| {
		when.method(GET).path("/r/test/comments").query_param("limit", "2");
		then.status(200).header("content-type", "application/json").body(
			json!({ "data": { "after": "t1_page1", "children": [comment_child("t1_a", 200.0), comment_child("t1_b", 100.0)] } }).to_string(),
		);
	}).await;
	server.mock_async(|when, then| {
		when.method(GET).path("/r/test/comments").query_param("after", "t1_page1");
		then.status(200).header("content-type", "application/json").body(
			json!({ "data": { "after": Value::Null, "children": [comment_child("t1_c", 50.0), comment_child("t1_d", 10.0)] } }).to_string(),
		);
	}).await;

	let (mut dispatcher, mut queue) = harness(&server).await;
	queue.push("work", packet("resp-page1", "subreddit_comments", "U7", 1.0, json!({"subreddit": "test", "limit": 2})));

	run_briefly(&mut dispatcher, &mut queue, Duration::from_millis(300)).await;
	let first: Value = serde_json::from_slice(&queue.drain("resp-page1")[0]).unwrap();
	let after = first["info"]["after"].as_str().unwrap().to_string();
	let first_fullnames: Vec<String> = first["info"]["comments"].as_array().unwrap().iter().map(|c| c["fullname"].as_str().unwrap().to_string()).collect();
	let first_min_created = first["info"]["comments"].as_array().unwrap().iter().map(|c| c["created_utc"].as_f64().unwrap()).fold(f64::MAX, f64::min);

	queue.push("work", packet("resp-page2", "subreddit_comments", "U8", 1.0, json!({"subreddit": "test", "limit": 2, "after": after})));
	run_briefly(&mut dispatcher, &mut queue, Duration::from_millis(300)).await;
	let second: Value = serde_json::from_slice(&queue.drain("resp-page2")[0]).unwrap();
	let second_fullnames: Vec<String> = second["info"]["comments"].as_array().unwrap().iter().map(|c| c["fullname"].as_str().unwrap().to_string()).collect();
	let second_max_created = second["info"]["comments"].as_array().unwrap().iter().map(|c| c["created_utc"].as_f64().unwrap()).fold(f64::MIN, f64::max);

	assert!(first_fullnames.iter().all(|f| !second_fullnames.contains(f)));
	assert!(second_max_created < first_min_created);
}
