//! # PIN-gated reservation service

#[macro_use]
extern crate tracing;

use axum::extract::FromRef;
use reservation::{ReservationConfig, SharedStore};

mod config;

pub mod controllers;
pub mod middleware;
pub mod routes;
pub mod schemas;

pub use config::*;
use middleware::KeyedLimiter;

/// Common state of the app
#[derive(Clone)]
pub struct AppState {
	pub config:          Config,
	pub store:           SharedStore,
	pub global_limiter:  KeyedLimiter,
	pub confirm_limiter: KeyedLimiter,
}

impl AppState {
	/// Create the app state, building the rate limiters from the config
	#[must_use]
	pub fn new(config: Config, store: SharedStore) -> Self {
		let global_limiter = middleware::keyed_limiter(config.global_rate_limit);
		let confirm_limiter =
			middleware::keyed_limiter(config.confirm_rate_limit);

		Self { config, store, global_limiter, confirm_limiter }
	}
}

impl FromRef<AppState> for Config {
	fn from_ref(input: &AppState) -> Self { input.config.clone() }
}

impl FromRef<AppState> for ReservationConfig {
	fn from_ref(input: &AppState) -> Self { input.config.reservation.clone() }
}

impl FromRef<AppState> for SharedStore {
	fn from_ref(input: &AppState) -> Self { input.store.clone() }
}
