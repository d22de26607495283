//! Broker-wide error taxonomy (spec.md §7).
//!
//! None of these ever reach a client directly: the dispatch loop maps them
//! onto a `status`/`failure` reply or, for queue I/O, treats them as fatal.

use thiserror::Error;

/// Failures loading `BrokerConfig` from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("missing required environment variable {0}")]
	Missing(&'static str),
	#[error("environment variable {0} could not be parsed: {1}")]
	Invalid(&'static str, String),
}

/// Failures from the Auth Manager (C3) while acquiring a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
	#[error("login request failed: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("login endpoint returned status {0}")]
	LoginRejected(u16),
	#[error("login response missing or malformed field `{0}`")]
	MalformedResponse(&'static str),
}

/// Failures from the Reddit Client Facade (C2) while making an API call.
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("request to reddit failed: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("response body was not valid JSON: {0}")]
	Decode(#[from] serde_json::Error),
}

/// Structural/semantic rejection of an inbound packet (C4).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("body is not a JSON object")]
	NotAnObject,
	#[error("`response_queue` must be a string")]
	BadResponseQueue,
	#[error("`version_utc_seconds` must be numeric")]
	BadVersion,
	#[error("`{field}` has the wrong type")]
	BadField { field: &'static str },
	#[error("`style` key `{0}` is not a class wildcard or a 3-digit status in [200,599]")]
	BadStyleKey(String),
	#[error("`style[{0}]` is not an object")]
	BadStyleEntry(String),
	#[error("`style[{0}].operation` must be one of copy,success,failure,retry")]
	BadOperation(String),
	#[error("`style[{0}].log_level` is not a recognized severity or NONE")]
	BadLogLevel(String),
	#[error("`style[{0}].ignore_version` must be a boolean")]
	BadIgnoreVersion(String),
}

/// Queue transport failures. Per spec.md §7 these are fatal: the dispatch
/// loop aborts and an outer process supervisor is expected to restart it.
#[derive(Debug, Error)]
pub enum QueueError {
	#[error("amqp connection error: {0}")]
	Connection(String),
	#[error("amqp channel error: {0}")]
	Channel(String),
}

/// Anything that can go wrong inside a handler invocation (C1). The
/// dispatch loop maps any of these onto `(failure, null)` with a WARN
/// exception-level log line (spec.md §4.6g), same as handling a raised
/// exception in the original implementation.
#[derive(Debug, Error)]
pub enum HandlerError {
	#[error(transparent)]
	Client(#[from] ClientError),
	#[error("args missing required field `{0}`")]
	MissingArg(&'static str),
	#[error("upstream response had an unexpected shape: {0}")]
	UnexpectedShape(&'static str),
}
