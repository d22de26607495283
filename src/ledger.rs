//! Response-queue ledger (part of C6, spec.md §4.6c/§4.6d).
//!
//! Tracks, per response queue, the highest `version_utc_seconds` seen so
//! far and when it was last seen, exactly mirroring `manager.py`'s
//! `response_queues` dict. Swept hourly; entries untouched for 24h are
//! forgotten.

use std::collections::HashMap;
use std::time::{Duration, Instant};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
const FORGET_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

struct QueueRecord {
	version: f64,
	last_seen_at: Instant,
}

/// Outcome of checking a packet's version against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
	/// First time we've seen this response queue; it's now tracked.
	New,
	/// Packet's version is current or newer; accept and process.
	Accepted,
	/// Packet's version is stale and `ignore_version` wasn't set; drop it.
	Stale,
}

pub struct Ledger {
	queues: HashMap<String, QueueRecord>,
	last_swept_at: Instant,
}

impl Ledger {
	pub fn new() -> Self {
		Self { queues: HashMap::new(), last_swept_at: Instant::now() }
	}

	/// Records that `response_queue` was seen at `version`, honoring
	/// `ignore_version`. Returns whether the packet should be processed.
	pub fn observe(&mut self, response_queue: &str, version: f64, ignore_version: bool) -> VersionCheck {
		let now = Instant::now();
		match self.queues.get_mut(response_queue) {
			None => {
				self.queues.insert(response_queue.to_string(), QueueRecord { version, last_seen_at: now });
				VersionCheck::New
			}
			Some(record) => {
				if !ignore_version && version < record.version {
					return VersionCheck::Stale;
				}
				if version > record.version {
					record.version = version;
				}
				record.last_seen_at = now;
				VersionCheck::Accepted
			}
		}
	}

	/// Runs the hourly sweep if it's due, evicting queues unseen for 24h.
	/// Returns the evicted queue names, for logging.
	pub fn maybe_sweep(&mut self) -> Vec<String> {
		let now = Instant::now();
		if now.duration_since(self.last_swept_at) < SWEEP_INTERVAL {
			return Vec::new();
		}
		self.last_swept_at = now;
		let stale: Vec<String> = self.queues.iter().filter(|(_, record)| now.duration_since(record.last_seen_at) > FORGET_AFTER).map(|(k, _)| k.clone()).collect();
		for key in &stale {
			self.queues.remove(key);
		}
		stale
	}
}

impl Default for Ledger {
	fn default() -> Self {
		Self::new()
	}
}
