use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use pin::PinSecret;
use pinqueue::{AppState, Config, RateLimit, routes};
use reservation::{MemoryStore, PgStore, ReservationConfig, SharedStore};

mod mock_db;

use mock_db::{DATABASE_PROVIDER, DatabaseGuard};

#[allow(dead_code)]
pub struct TestEnv {
	pub app:      TestServer,
	pub config:   Config,
	pub store:    SharedStore,
	pub db_guard: Option<DatabaseGuard>,
}

/// A configuration that does not depend on the environment
#[must_use]
pub fn test_config() -> Config {
	Config {
		database_url:       String::new(),
		bind_address:       SocketAddr::from(([127, 0, 0, 1], 0)),
		cors_origins:       vec!["http://localhost:5173".to_string()],
		cors_credentials:   false,
		global_rate_limit:  RateLimit {
			attempts: NonZeroU32::new(10_000).unwrap(),
			period:   Duration::from_secs(60),
		},
		confirm_rate_limit: RateLimit {
			attempts: NonZeroU32::new(10).unwrap(),
			period:   Duration::from_secs(300),
		},
		reservation:        ReservationConfig::new(PinSecret::new(
			"integration-test-secret",
		)),
	}
}

impl TestEnv {
	/// Get a test environment backed by an in-memory store
	///
	/// # Panics
	/// Panics if building the test server fails
	#[must_use]
	pub fn new() -> Self { Self::with_config(test_config()) }

	/// Get an in-memory test environment with a custom configuration
	///
	/// # Panics
	/// Panics if building the test server fails
	#[must_use]
	pub fn with_config(config: Config) -> Self {
		Self::with_store(config, Arc::new(MemoryStore::new()), None)
	}

	/// Get a test environment backed by a fresh Postgres database
	///
	/// # Panics
	/// Panics if the database cannot be set up
	#[allow(dead_code)]
	pub async fn postgres() -> Self {
		let db_guard = DATABASE_PROVIDER.acquire().await;
		let store = Arc::new(PgStore::new(db_guard.pool()));

		Self::with_store(test_config(), store, Some(db_guard))
	}

	/// Get a test environment around any store
	///
	/// # Panics
	/// Panics if building the test server fails
	#[must_use]
	pub fn with_store(
		config: Config,
		store: SharedStore,
		db_guard: Option<DatabaseGuard>,
	) -> Self {
		let state = AppState::new(config.clone(), store.clone());
		let app = routes::get_app_router(state);

		let test_server = TestServer::new(app).unwrap();

		TestEnv { app: test_server, config, store, db_guard }
	}
}
