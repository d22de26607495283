//! Rate clock (part of C6, spec.md §4.6f).
//!
//! A single `last_processed_at` timestamp shared by every quota-consuming
//! call the dispatch loop makes (handler invocations with `requires_delay`
//! and token refreshes alike), matching `manager.py`'s `delay_for_reddit`.

use std::time::{Duration, Instant};

use tokio::time::sleep;

pub struct RateClock {
	min_gap: Duration,
	last_processed_at: Option<Instant>,
}

impl RateClock {
	pub fn new(min_gap: Duration) -> Self {
		Self { min_gap, last_processed_at: None }
	}

	/// Sleeps just long enough that the next call is at least `min_gap`
	/// after the previous one. A no-op on the very first call.
	pub async fn wait_turn(&self) {
		if let Some(last) = self.last_processed_at {
			let elapsed = last.elapsed();
			if elapsed < self.min_gap {
				sleep(self.min_gap - elapsed).await;
			}
		}
	}

	/// Marks "now" as the moment a quota-consuming call completed.
	pub fn mark(&mut self) {
		self.last_processed_at = Some(Instant::now());
	}
}
