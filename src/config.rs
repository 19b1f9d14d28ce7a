use std::fmt::Debug;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, TimeDelta};
use deadpool_diesel::postgres::{Manager, Pool};
use pin::PinSecret;
use queue::WindowPolicy;
use reservation::ReservationConfig;

/// How many requests a single bucket may make per period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
	pub attempts: NonZeroU32,
	pub period:   Duration,
}

#[derive(Clone, Debug)]
pub struct Config {
	pub database_url: String,
	pub bind_address: SocketAddr,

	pub cors_origins:     Vec<String>,
	pub cors_credentials: bool,

	pub global_rate_limit:  RateLimit,
	pub confirm_rate_limit: RateLimit,

	pub reservation: ReservationConfig,
}

impl Config {
	fn get_env_var(var: &str) -> String {
		std::env::var(var).unwrap_or_else(|_| panic!("{var} must be set"))
	}

	fn get_env_or<T>(var: &str, default: T) -> T
	where
		T: FromStr,
		T::Err: Debug,
	{
		match std::env::var(var) {
			Ok(value) => {
				value
					.trim()
					.parse::<T>()
					.unwrap_or_else(|e| panic!("{var} is invalid -- {e:?}"))
			},
			Err(_) => default,
		}
	}

	fn get_minutes_or(var: &str, default: i64) -> TimeDelta {
		TimeDelta::minutes(Self::get_env_or(var, default))
	}

	/// Create a new [`Config`] from environment variables
	///
	/// # Panics
	/// Panics if a required environment variable is missing or if any
	/// variable holds an invalid value
	#[must_use]
	pub fn from_env() -> Self {
		let database_url = Self::get_env_var("DATABASE_URL");
		let pin_secret = PinSecret::new(Self::get_env_var("PIN_SECRET"));

		let bind_address = Self::get_env_or(
			"BIND_ADDRESS",
			SocketAddr::from(([0, 0, 0, 0], 4000)),
		);

		let cors_origins = Self::get_env_or(
			"CORS_ORIGINS",
			"http://localhost:5173".to_string(),
		)
		.split(',')
		.map(str::trim)
		.filter(|o| !o.is_empty())
		.map(ToString::to_string)
		.collect();
		let cors_credentials = Self::get_env_or("CORS_CREDENTIALS", false);

		let global_rate_limit = RateLimit {
			attempts: Self::get_env_or(
				"GLOBAL_RATE_LIMIT",
				NonZeroU32::new(120).unwrap_or(NonZeroU32::MIN),
			),
			period:   Duration::from_secs(60),
		};
		let confirm_rate_limit = RateLimit {
			attempts: Self::get_env_or(
				"CONFIRM_RATE_LIMIT",
				NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN),
			),
			period:   Duration::from_secs(Self::get_env_or(
				"CONFIRM_RATE_PERIOD_SECONDS",
				300,
			)),
		};

		let window = WindowPolicy {
			pre_activation:   Self::get_minutes_or(
				"PIN_PRE_ACTIVATION_MINUTES",
				15,
			),
			nominal_validity: Self::get_minutes_or("PIN_VALID_MINUTES", 15),
			extra_time:       Self::get_minutes_or("EXTRA_TIME_MINUTES", 10),
			max_extension:    Self::get_minutes_or("MAX_EXTENSION_MINUTES", 60),
		};

		let day_offset_minutes: i32 = Self::get_env_or("DAY_OFFSET_MINUTES", 0);
		let day_offset = FixedOffset::east_opt(day_offset_minutes * 60)
			.unwrap_or_else(|| {
				panic!("DAY_OFFSET_MINUTES is out of range -- {day_offset_minutes}")
			});

		let reservation = ReservationConfig {
			pin_secret,
			service_duration: Self::get_minutes_or("SERVICE_TIME_MINUTES", 5),
			window,
			day_offset,
		};

		Self {
			database_url,
			bind_address,
			cors_origins,
			cors_credentials,
			global_rate_limit,
			confirm_rate_limit,
			reservation,
		}
	}

	/// Create a database pool for the given config
	///
	/// # Panics
	/// Panics if creating the pool fails
	#[must_use]
	pub fn create_database_pool(&self) -> Pool {
		let manager = Manager::new(
			self.database_url.to_string(),
			deadpool_diesel::Runtime::Tokio1,
		);

		Pool::builder(manager).build().unwrap()
	}
}
