use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// The configured durations that shape a validity window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPolicy {
	/// How long before the scheduled time a PIN becomes usable
	pub pre_activation:   TimeDelta,
	/// How long after the scheduled time a PIN stays valid without a queue
	pub nominal_validity: TimeDelta,
	/// Allowance past the expected start when the queue runs late
	pub extra_time:       TimeDelta,
	/// Absolute limit past the scheduled time, regardless of the queue
	pub max_extension:    TimeDelta,
}

impl Default for WindowPolicy {
	fn default() -> Self {
		Self {
			pre_activation:   TimeDelta::minutes(15),
			nominal_validity: TimeDelta::minutes(15),
			extra_time:       TimeDelta::minutes(10),
			max_extension:    TimeDelta::minutes(60),
		}
	}
}

/// The interval in which a PIN can be used
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
	pub valid_from:    DateTime<Utc>,
	pub nominal_until: DateTime<Utc>,
	pub queue_until:   DateTime<Utc>,
	pub hard_cap:      DateTime<Utc>,
	pub valid_until:   DateTime<Utc>,
}

/// Where a moment falls relative to a [`ValidityWindow`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowState {
	NotYetActive { activates_at: DateTime<Utc> },
	Active,
	Expired { expired_at: DateTime<Utc> },
}

impl ValidityWindow {
	/// Stretch the nominal window when the queue runs late, but never past
	/// the hard cap
	///
	/// Returns `None` if a bound derived from `scheduled_at` falls outside
	/// the representable time range. A late queue only saturates, since the
	/// hard cap bounds it anyway.
	#[must_use]
	pub fn compute(
		policy: &WindowPolicy,
		scheduled_at: DateTime<Utc>,
		expected_start: DateTime<Utc>,
	) -> Option<Self> {
		let valid_from = scheduled_at.checked_sub_signed(policy.pre_activation)?;
		let nominal_until =
			scheduled_at.checked_add_signed(policy.nominal_validity)?;
		let hard_cap = scheduled_at.checked_add_signed(policy.max_extension)?;
		let queue_until = expected_start
			.checked_add_signed(policy.extra_time)
			.unwrap_or(DateTime::<Utc>::MAX_UTC);

		let valid_until = nominal_until.max(queue_until).min(hard_cap);

		Some(Self { valid_from, nominal_until, queue_until, hard_cap, valid_until })
	}

	/// Classify `now`, both bounds are inclusive
	#[must_use]
	pub fn check(&self, now: DateTime<Utc>) -> WindowState {
		if now < self.valid_from {
			WindowState::NotYetActive { activates_at: self.valid_from }
		} else if now > self.valid_until {
			WindowState::Expired { expired_at: self.valid_until }
		} else {
			WindowState::Active
		}
	}
}
