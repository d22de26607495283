#![forbid(unsafe_code)]

use std::process::ExitCode;

use log::{error, info};
use reddit_broker::auth::AuthManager;
use reddit_broker::client::RedditClient;
use reddit_broker::config::BrokerConfig;
use reddit_broker::dispatch::Dispatcher;
use reddit_broker::handlers::HandlerRegistry;
use reddit_broker::queue::{connect_with_retry, AmqpQueue};

const MAX_CONNECT_ATTEMPTS: u32 = 8;

#[tokio::main]
async fn main() -> ExitCode {
	if dotenvy::dotenv().is_err() {
		eprintln!("no .env file found, continuing with process environment only");
	}
	pretty_env_logger::init();

	let config = match BrokerConfig::load() {
		Ok(config) => config,
		Err(err) => {
			error!("failed to load configuration: {err}");
			return ExitCode::FAILURE;
		}
	};

	info!("starting {} against amqp://{}:{}{}", config.app_name, config.amqp_host, config.amqp_port, config.amqp_vhost);

	let amqp_uri = format!(
		"amqp://{}:{}@{}:{}{}",
		config.amqp_username, config.amqp_password, config.amqp_host, config.amqp_port, config.amqp_vhost
	);
	let connection = match connect_with_retry(&amqp_uri, MAX_CONNECT_ATTEMPTS).await {
		Ok(connection) => connection,
		Err(err) => {
			error!("could not establish an amqp connection after {MAX_CONNECT_ATTEMPTS} attempts: {err}");
			return ExitCode::FAILURE;
		}
	};

	let mut queue = match AmqpQueue::connect(&connection, config.amqp_queue.clone()).await {
		Ok(queue) => queue,
		Err(err) => {
			error!("failed to open amqp channel: {err}");
			return ExitCode::FAILURE;
		}
	};

	let http = reqwest::Client::builder().user_agent(config.user_agent.clone()).build().expect("static client config is always valid");

	let auth = AuthManager::new(
		http.clone(),
		config.user_agent.clone(),
		config.reddit_username.clone(),
		config.reddit_password.clone(),
		config.reddit_client_id.clone(),
		config.reddit_client_secret.clone(),
	);
	let reddit = RedditClient::new(http, config.user_agent.clone());
	let mut dispatcher = Dispatcher::new(auth, reddit, HandlerRegistry::new(), config.min_time_between_requests, config.amqp_queue.clone());

	let result = tokio::select! {
		result = dispatcher.run(&mut queue) => result,
		_ = shutdown_signal() => {
			info!("shutdown signal received, stopping after the in-flight delivery");
			Ok(())
		}
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!("dispatch loop aborted on a fatal queue error: {err}");
			ExitCode::FAILURE
		}
	}
}

/// Waits for either SIGINT or SIGTERM. On platforms without Unix signal
/// support (effectively: anywhere but what this broker ships to) only
/// Ctrl+C is observed.
async fn shutdown_signal() {
	#[cfg(unix)]
	{
		use tokio::signal::unix::{signal, SignalKind};
		let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
		tokio::select! {
			_ = tokio::signal::ctrl_c() => {}
			_ = sigterm.recv() => {}
		}
	}
	#[cfg(not(unix))]
	{
		let _ = tokio::signal::ctrl_c().await;
	}
}
