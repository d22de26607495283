//! Dispatch Loop (C6, spec.md §4.6) — the broker's single worker.
//!
//! Owns the handler registry, the token cache's freshness check, the rate
//! clock and the response-queue ledger, with nothing shared across
//! concurrent tasks: the whole loop runs on one task, so none of that
//! state needs locking (spec.md §5). Mirrors `manager.py`'s
//! `listen_with_handlers` step for step, but a bad packet or handler
//! failure here never takes down the loop — only a queue transport error
//! does (spec.md §7).

use std::time::Duration;

use log::{debug, trace, warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::AuthManager;
use crate::client::RedditClient;
use crate::error::QueueError;
use crate::handlers::HandlerRegistry;
use crate::ledger::{Ledger, VersionCheck};
use crate::packet::{Operation, Packet};
use crate::queue::MessageQueue;
use crate::rate::RateClock;
use crate::style::{self, resolve};
use crate::validator::validate;

/// How long a token is allowed to sit before its nominal expiry before the
/// loop proactively refreshes it (spec.md §4.3).
const REFRESH_MARGIN: Duration = Duration::from_secs(15 * 60);

pub struct Dispatcher {
	auth: AuthManager,
	reddit: RedditClient,
	handlers: HandlerRegistry,
	ledger: Ledger,
	rate: RateClock,
	default_style: crate::packet::StyleTable,
	work_queue: String,
}

impl Dispatcher {
	pub fn new(auth: AuthManager, reddit: RedditClient, handlers: HandlerRegistry, min_time_between_requests: Duration, work_queue: String) -> Self {
		Self { auth, reddit, handlers, ledger: Ledger::new(), rate: RateClock::new(min_time_between_requests), default_style: style::default_table(), work_queue }
	}

	/// Runs forever, processing one delivery per iteration. Returns only on
	/// a fatal `QueueError` (transport failure) — anything else (malformed
	/// packets, handler errors, stale versions) is handled in place and the
	/// loop continues.
	pub async fn run<Q: MessageQueue>(&mut self, queue: &mut Q) -> Result<(), QueueError> {
		loop {
			self.sweep_ledger();

			let Some(delivery) = queue.receive().await? else {
				trace!(target: "dispatch", "no messages in the last inactivity window");
				// Mock queues resolve instantly with no backing I/O to wait
				// on; yield a tick so a wrapping `tokio::time::timeout` can
				// still preempt the loop between deliveries.
				tokio::time::sleep(Duration::from_millis(1)).await;
				continue;
			};

			let body_str = match std::str::from_utf8(&delivery.body) {
				Ok(s) => s,
				Err(_) => {
					warn!(target: "dispatch", "received non-utf8 packet");
					queue.nack(&delivery, false).await?;
					continue;
				}
			};

			let parsed: Result<Value, _> = serde_json::from_str(body_str);
			let Ok(body) = parsed else {
				warn!(target: "dispatch", "received non-json packet: {body_str}");
				queue.nack(&delivery, false).await?;
				continue;
			};

			let packet = match validate(&body) {
				Ok(packet) => packet,
				Err(err) => {
					warn!(
						target: "dispatch",
						"received malformed packet (response_queue={:?}, type={:?}, uuid={:?}): {err}",
						body.get("response_queue"),
						body.get("type"),
						body.get("uuid"),
					);
					queue.nack(&delivery, false).await?;
					continue;
				}
			};

			match self.ledger.observe(&packet.response_queue, packet.version_utc_seconds, packet.ignore_version) {
				VersionCheck::Stale => {
					debug!(target: "dispatch", "ignoring stale packet to {} (version {})", packet.response_queue, packet.version_utc_seconds);
					queue.nack(&delivery, false).await?;
					continue;
				}
				VersionCheck::New if !packet.is_void() => {
					debug!(target: "dispatch", "new response queue {} at version {}", packet.response_queue, packet.version_utc_seconds);
					queue.declare(&packet.response_queue).await?;
				}
				_ => {}
			}

			let Some(entry) = self.handlers.get(&packet.verb) else {
				warn!(target: "dispatch", "unknown verb {} for response queue {}", packet.verb, packet.response_queue);
				queue.nack(&delivery, false).await?;
				continue;
			};

			let Some(token) = self.ensure_fresh_token(queue, &delivery).await? else {
				continue;
			};

			if entry.requires_delay {
				self.rate.wait_turn().await;
			}

			let outcome = (entry.invoke)(&self.reddit, &token, &packet.args).await;

			if entry.requires_delay {
				self.rate.mark();
			}

			let (status, info) = match outcome {
				Ok((status, info)) => (status, info),
				Err(err) => {
					warn!(target: "dispatch", "handler for {} raised an error on response queue {} ({}): {err}", packet.verb, packet.response_queue, packet.uuid);
					(crate::packet::HandlerStatus::Failure, None)
				}
			};

			let handle_style = resolve(packet.style.as_ref(), status, &self.default_style);
			if let Some(level) = handle_style.log_level {
				level.log(
					"dispatch",
					&format!("status {:?} -> verb {} response queue {} ({}), operation {:?}", status, packet.verb, packet.response_queue, packet.uuid, handle_style.operation),
				);
			}

			if matches!(status, crate::packet::HandlerStatus::Http(401)) {
				warn!(target: "dispatch", "401 from reddit, purging cached token");
				self.auth.invalidate();
			}

			self.publish_outcome(queue, &delivery, &packet, status, info, handle_style.operation, handle_style.ignore_version).await?;
		}
	}

	fn sweep_ledger(&mut self) {
		let evicted = self.ledger.maybe_sweep();
		for queue_name in evicted {
			debug!(target: "dispatch", "forgetting response queue {queue_name}, unseen for 24h");
		}
	}

	/// Returns the current token, refreshing it first if it's missing or
	/// within `REFRESH_MARGIN` of expiry. On a failed refresh, nacks the
	/// delivery with `requeue=true` and returns `Ok(None)` so the caller
	/// simply moves on to the next delivery.
	async fn ensure_fresh_token<Q: MessageQueue>(&mut self, queue: &mut Q, delivery: &crate::queue::Delivery) -> Result<Option<std::sync::Arc<crate::auth::Token>>, QueueError> {
		let needs_refresh = match self.auth.current_auth() {
			Some(token) => token.needs_refresh_at(chrono::Utc::now(), REFRESH_MARGIN),
			None => true,
		};

		if !needs_refresh {
			return Ok(self.auth.current_auth());
		}

		self.rate.wait_turn().await;
		let result = self.auth.refresh().await;
		self.rate.mark();
		match result {
			Ok(token) => {
				debug!(target: "dispatch", "refreshed reddit token, expires at {}", token.expires_at);
				Ok(Some(token))
			}
			Err(err) => {
				warn!(target: "dispatch", "failed to authenticate with reddit, will requeue: {err}");
				queue.nack(delivery, true).await?;
				Ok(None)
			}
		}
	}

	#[allow(clippy::too_many_arguments)]
	async fn publish_outcome<Q: MessageQueue>(
		&self,
		queue: &mut Q,
		delivery: &crate::queue::Delivery,
		packet: &Packet,
		status: crate::packet::HandlerStatus,
		info: Option<Value>,
		operation: Operation,
		ignore_version: Option<bool>,
	) -> Result<(), QueueError> {
		if packet.is_void() {
			return queue.ack(delivery).await;
		}

		match operation {
			Operation::Copy => {
				let reply = json!({ "type": "copy", "uuid": packet.uuid, "status": status.as_json(), "info": info });
				queue.publish(&packet.response_queue, &serde_json::to_vec(&reply).expect("json encoding cannot fail")).await?;
				queue.ack(delivery).await
			}
			Operation::Success => {
				let reply = json!({ "type": "success", "uuid": packet.uuid });
				queue.publish(&packet.response_queue, &serde_json::to_vec(&reply).expect("json encoding cannot fail")).await?;
				queue.ack(delivery).await
			}
			Operation::Retry => {
				let mut retried = serde_json::to_value(RetriedPacket::from(packet)).expect("packet always serializes");
				retried["ignore_version"] = json!(ignore_version.unwrap_or(false));
				queue.publish(&self.work_queue, &serde_json::to_vec(&retried).expect("json encoding cannot fail")).await?;
				queue.nack(delivery, false).await
			}
			Operation::Failure => {
				let reply = json!({ "type": "failure", "uuid": packet.uuid });
				queue.publish(&packet.response_queue, &serde_json::to_vec(&reply).expect("json encoding cannot fail")).await?;
				queue.nack(delivery, false).await
			}
		}
	}
}

/// The shape a retried packet is re-published in: the original packet,
/// `style` table included, with only `ignore_version` overridden. Mirrors
/// `new_bod = body.copy(); new_bod['ignore_version'] = ...`, which carries
/// every field, including the client's own style table, forward untouched.
#[derive(serde::Serialize)]
struct RetriedPacket {
	response_queue: String,
	version_utc_seconds: f64,
	#[serde(rename = "type")]
	verb: String,
	uuid: String,
	sent_at: f64,
	args: Value,
	#[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_style")]
	style: Option<crate::packet::StyleTable>,
}

fn serialize_style<S>(style: &Option<crate::packet::StyleTable>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: serde::Serializer,
{
	match style {
		Some(table) => crate::packet::style_table_to_json(table).serialize(serializer),
		None => serializer.serialize_none(),
	}
}

impl From<&Packet> for RetriedPacket {
	fn from(packet: &Packet) -> Self {
		Self {
			response_queue: packet.response_queue.clone(),
			version_utc_seconds: packet.version_utc_seconds,
			verb: packet.verb.clone(),
			uuid: packet.uuid.clone(),
			sent_at: packet.sent_at,
			args: packet.args.clone(),
			style: packet.style.clone(),
		}
	}
}
