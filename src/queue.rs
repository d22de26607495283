//! Queue transport abstraction (spec.md §1, §10.4).
//!
//! `MessageQueue` is the seam between the dispatch loop and AMQP: production
//! wires it to `lapin`, tests drive it through an in-process mock. The
//! dispatch loop is generic over this trait rather than boxing it, since
//! there's exactly one concrete implementation live at a time.

use std::collections::VecDeque;
use std::time::Duration;

use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use futures_util::StreamExt;
use log::{info, warn};

use crate::error::QueueError;

/// A delivered message along with whatever the transport needs to
/// ack/nack it later.
pub struct Delivery {
	pub body: Vec<u8>,
	tag: u64,
}

/// How long `receive` waits for a message before returning `None`,
/// mirroring `consume(..., inactivity_timeout=600)` in the original.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(600);

pub trait MessageQueue {
	/// Waits up to `INACTIVITY_TIMEOUT` for the next delivery; `None` means
	/// the timeout elapsed with nothing received.
	async fn receive(&mut self) -> Result<Option<Delivery>, QueueError>;
	/// Declares `queue_name` if it doesn't already exist.
	async fn declare(&mut self, queue_name: &str) -> Result<(), QueueError>;
	/// Publishes `body` to `queue_name` via the default exchange.
	async fn publish(&mut self, queue_name: &str, body: &[u8]) -> Result<(), QueueError>;
	async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError>;
	async fn nack(&mut self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError>;
}

/// Connects with exponential backoff, mirroring the original `main.py`'s
/// connection retry loop (bounded attempts, then fatal).
pub async fn connect_with_retry(uri: &str, max_attempts: u32) -> Result<Connection, QueueError> {
	let mut attempt = 0;
	let mut backoff = Duration::from_secs(1);
	loop {
		attempt += 1;
		match Connection::connect(uri, ConnectionProperties::default()).await {
			Ok(conn) => return Ok(conn),
			Err(err) if attempt < max_attempts => {
				warn!("amqp connection attempt {attempt}/{max_attempts} failed: {err}, retrying in {backoff:?}");
				tokio::time::sleep(backoff).await;
				backoff = (backoff * 2).min(Duration::from_secs(60));
			}
			Err(err) => return Err(QueueError::Connection(err.to_string())),
		}
	}
}

/// The real transport, backed by a single `lapin` channel.
pub struct AmqpQueue {
	channel: Channel,
	consumer: Option<lapin::Consumer>,
	work_queue: String,
}

impl AmqpQueue {
	pub async fn connect(connection: &Connection, work_queue: String) -> Result<Self, QueueError> {
		let channel = connection.create_channel().await.map_err(|e| QueueError::Channel(e.to_string()))?;
		channel
			.queue_declare(&work_queue, QueueDeclareOptions::default(), FieldTable::default())
			.await
			.map_err(|e| QueueError::Channel(e.to_string()))?;
		let consumer = channel
			.basic_consume(&work_queue, "reddit-broker", BasicConsumeOptions::default(), FieldTable::default())
			.await
			.map_err(|e| QueueError::Channel(e.to_string()))?;
		info!("consuming from queue {work_queue}");
		Ok(Self { channel, consumer: Some(consumer), work_queue })
	}
}

impl MessageQueue for AmqpQueue {
	async fn receive(&mut self) -> Result<Option<Delivery>, QueueError> {
		let Some(consumer) = self.consumer.as_mut() else {
			return Ok(None);
		};
		match tokio::time::timeout(INACTIVITY_TIMEOUT, consumer.next()).await {
			Ok(Some(Ok(delivery))) => {
				let tag = delivery.delivery_tag;
				Ok(Some(Delivery { body: delivery.data, tag }))
			}
			Ok(Some(Err(err))) => Err(QueueError::Channel(err.to_string())),
			Ok(None) => Ok(None),
			Err(_elapsed) => Ok(None),
		}
	}

	async fn declare(&mut self, queue_name: &str) -> Result<(), QueueError> {
		self.channel
			.queue_declare(queue_name, QueueDeclareOptions::default(), FieldTable::default())
			.await
			.map(|_| ())
			.map_err(|e| QueueError::Channel(e.to_string()))
	}

	async fn publish(&mut self, queue_name: &str, body: &[u8]) -> Result<(), QueueError> {
		self.channel
			.basic_publish("", queue_name, BasicPublishOptions::default(), body, BasicProperties::default())
			.await
			.map_err(|e| QueueError::Channel(e.to_string()))?;
		Ok(())
	}

	async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError> {
		self.channel.basic_ack(delivery.tag, BasicAckOptions::default()).await.map_err(|e| QueueError::Channel(e.to_string()))
	}

	async fn nack(&mut self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError> {
		self.channel
			.basic_nack(delivery.tag, BasicNackOptions { requeue, ..Default::default() })
			.await
			.map_err(|e| QueueError::Channel(e.to_string()))
	}
}

/// An in-process mock for dispatch loop tests: every queue is a `VecDeque`
/// of byte buffers, acks/nacks with `requeue=false` are dropped, and
/// `requeue=true` puts the message back at the front of the work queue.
#[derive(Default)]
pub struct MockQueue {
	pub work_queue: String,
	queues: std::collections::HashMap<String, VecDeque<Vec<u8>>>,
	pending: Option<Vec<u8>>,
}

impl MockQueue {
	pub fn new(work_queue: impl Into<String>) -> Self {
		Self { work_queue: work_queue.into(), queues: std::collections::HashMap::new(), pending: None }
	}

	pub fn push(&mut self, queue_name: &str, body: Vec<u8>) {
		self.queues.entry(queue_name.to_string()).or_default().push_back(body);
	}

	pub fn drain(&mut self, queue_name: &str) -> Vec<Vec<u8>> {
		self.queues.remove(queue_name).map(Vec::from).unwrap_or_default()
	}
}

impl MessageQueue for MockQueue {
	async fn receive(&mut self) -> Result<Option<Delivery>, QueueError> {
		let work_queue = self.work_queue.clone();
		let body = self.queues.get_mut(&work_queue).and_then(VecDeque::pop_front);
		Ok(body.map(|body| Delivery { body, tag: 0 }))
	}

	async fn declare(&mut self, queue_name: &str) -> Result<(), QueueError> {
		self.queues.entry(queue_name.to_string()).or_default();
		Ok(())
	}

	async fn publish(&mut self, queue_name: &str, body: &[u8]) -> Result<(), QueueError> {
		self.push(queue_name, body.to_vec());
		Ok(())
	}

	async fn ack(&mut self, _delivery: &Delivery) -> Result<(), QueueError> {
		Ok(())
	}

	async fn nack(&mut self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError> {
		if requeue {
			let work_queue = self.work_queue.clone();
			self.queues.entry(work_queue).or_default().push_front(delivery.body.clone());
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn mock_receive_returns_none_when_empty() {
		let mut queue = MockQueue::new("work");
		assert!(queue.receive().await.unwrap().is_none());
	}

	#[tokio::test]
	async fn mock_publish_then_drain_round_trips() {
		let mut queue = MockQueue::new("work");
		queue.publish("resp", b"hello").await.unwrap();
		assert_eq!(queue.drain("resp"), vec![b"hello".to_vec()]);
	}

	#[tokio::test]
	async fn mock_nack_with_requeue_restores_the_message() {
		let mut queue = MockQueue::new("work");
		queue.push("work", b"pkt".to_vec());
		let delivery = queue.receive().await.unwrap().unwrap();
		assert!(queue.receive().await.unwrap().is_none());
		queue.nack(&delivery, true).await.unwrap();
		assert_eq!(queue.receive().await.unwrap().unwrap().body, b"pkt");
	}
}
