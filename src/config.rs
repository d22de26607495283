//! Process configuration (spec.md §6, §10.3).
//!
//! Loaded once at startup from the environment (after `dotenvy::dotenv()`
//! has had a chance to populate it), the way the teacher's `Config::load`
//! reads `REDLIB_*` variables. Unlike the teacher's all-`Option<String>`
//! config, every key here is required: a broker that can't reach Reddit or
//! AMQP has nothing useful to do, so we fail fast at startup instead of
//! deep inside the dispatch loop.

use std::env::var;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
	pub app_name: String,
	pub amqp_host: String,
	pub amqp_port: u16,
	pub amqp_vhost: String,
	pub amqp_username: String,
	pub amqp_password: String,
	pub amqp_queue: String,
	pub min_time_between_requests: Duration,
	pub user_agent: String,
	pub reddit_username: String,
	pub reddit_password: String,
	pub reddit_client_id: String,
	pub reddit_client_secret: String,
}

impl BrokerConfig {
	pub fn load() -> Result<Self, ConfigError> {
		Ok(Self {
			app_name: required("APPNAME")?,
			amqp_host: required("AMQP_HOST")?,
			amqp_port: parse_required("AMQP_PORT")?,
			amqp_vhost: required("AMQP_VHOST")?,
			amqp_username: required("AMQP_USERNAME")?,
			amqp_password: required("AMQP_PASSWORD")?,
			amqp_queue: required("AMQP_QUEUE")?,
			min_time_between_requests: Duration::from_secs_f64(parse_required::<f64>("MIN_TIME_BETWEEN_REQUESTS_S")?),
			user_agent: required("USER_AGENT")?,
			reddit_username: required("REDDIT_USERNAME")?,
			reddit_password: required("REDDIT_PASSWORD")?,
			reddit_client_id: required("REDDIT_CLIENT_ID")?,
			reddit_client_secret: required("REDDIT_CLIENT_SECRET")?,
		})
	}
}

fn required(key: &'static str) -> Result<String, ConfigError> {
	var(key).map_err(|_| ConfigError::Missing(key))
}

fn parse_required<T: std::str::FromStr>(key: &'static str) -> Result<T, ConfigError> {
	let raw = required(key)?;
	raw.parse().map_err(|_| ConfigError::Invalid(key, raw))
}

#[cfg(test)]
mod tests {
	use super::*;
	use sealed_test::prelude::*;

	#[test]
	#[sealed_test]
	fn load_fails_with_descriptive_error_when_missing() {
		let err = BrokerConfig::load().unwrap_err();
		assert!(matches!(err, ConfigError::Missing(_)));
	}

	#[test]
	#[sealed_test(env = [
		("APPNAME", "broker-test"),
		("AMQP_HOST", "localhost"),
		("AMQP_PORT", "5672"),
		("AMQP_VHOST", "/"),
		("AMQP_USERNAME", "guest"),
		("AMQP_PASSWORD", "guest"),
		("AMQP_QUEUE", "reddit_requests"),
		("MIN_TIME_BETWEEN_REQUESTS_S", "1.5"),
		("USER_AGENT", "test-agent/1.0"),
		("REDDIT_USERNAME", "bot"),
		("REDDIT_PASSWORD", "hunter2"),
		("REDDIT_CLIENT_ID", "cid"),
		("REDDIT_CLIENT_SECRET", "secret"),
	])]
	fn load_succeeds_with_full_environment() {
		let config = BrokerConfig::load().unwrap();
		assert_eq!(config.amqp_port, 5672);
		assert_eq!(config.min_time_between_requests, Duration::from_millis(1500));
	}
}
