use chrono::{FixedOffset, Offset, TimeDelta, Utc};
use pin::PinSecret;
use queue::WindowPolicy;

/// Everything the reservation lifecycle needs to know about its
/// environment, loaded once at startup
#[derive(Clone, Debug)]
pub struct ReservationConfig {
	pub pin_secret:       PinSecret,
	/// Average time it takes to serve a single reservation
	pub service_duration: TimeDelta,
	pub window:           WindowPolicy,
	/// Offset in which calendar days start for the queue simulation
	pub day_offset:       FixedOffset,
}

impl ReservationConfig {
	/// A configuration with the default durations and UTC day boundaries
	#[must_use]
	pub fn new(pin_secret: PinSecret) -> Self {
		Self {
			pin_secret,
			service_duration: TimeDelta::minutes(5),
			window: WindowPolicy::default(),
			day_offset: Utc.fix(),
		}
	}
}
