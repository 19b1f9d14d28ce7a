#[macro_use]
extern crate tracing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pinqueue::{AppState, Config, routes};
use reservation::PgStore;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tracing_subscriber::EnvFilter;

/// How often idle rate limiter buckets are dropped
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
	// Set up the tracing subscriber.
	// This will print out all logs to the console.
	tracing_subscriber::fmt()
		.pretty()
		.with_thread_names(true)
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	// Load the configuration from the environment,
	// and create a database pool.
	let config = Config::from_env();
	let database_pool = config.create_database_pool();
	let bind_address = config.bind_address;

	let state = AppState::new(config, Arc::new(PgStore::new(database_pool)));

	spawn_limiter_cleanup(&state);

	// Create the app router and listener.
	let router = routes::get_app_router(state);

	let listener = TcpListener::bind(bind_address).await.unwrap();

	// Start the server.
	info!("listening on {}", listener.local_addr().unwrap());
	axum::serve(
		listener,
		router.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.with_graceful_shutdown(shutdown_handler())
	.await
	.unwrap();
}

/// Periodically forget rate limiter buckets that are full again
fn spawn_limiter_cleanup(state: &AppState) {
	let limiters = [state.global_limiter.clone(), state.confirm_limiter.clone()];

	tokio::spawn(async move {
		let mut interval = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);

		loop {
			interval.tick().await;

			for limiter in &limiters {
				limiter.retain_recent();
				limiter.shrink_to_fit();
			}

			debug!("cleaned up rate limiter buckets");
		}
	});
}

/// Gracefully shutdown the server on SIGINT or SIGTERM.
async fn shutdown_handler() {
	let ctrl_c = async {
		signal::ctrl_c().await.expect("COULD NOT INSTALL CTRL+C HANDLER");
	};

	let terminate = async {
		signal::unix::signal(SignalKind::terminate())
			.expect("COULD NOT INSTALL TERMINATE SIGNAL HANDLER")
			.recv()
			.await;
	};

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
}
