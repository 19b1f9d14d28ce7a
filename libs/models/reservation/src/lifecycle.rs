//! Creation, confirmation and listing of reservations
//!
//! Every function takes the store, the configuration and the current time
//! explicitly and returns a [`Result`], storage failures surface as the
//! opaque [`Error::InternalServerError`].

use chrono::{DateTime, Utc};
use common::Error;
use db::ReservationStatus;
use pin::{PIN_LENGTH, has_valid_checksum};
use primitive_reservation::{
	NewReservation,
	PinIssuer,
	PrimitiveReservation,
	SortOrder,
};
use queue::{QueueEntry, ValidityWindow, WindowState, day_bounds, expected_starts};
use serde::{Deserialize, Serialize};

use crate::{ReservationConfig, ReservationStore, find_by_pin};

/// Character replacing the hidden part of a phone number
pub const PHONE_MASK: char = '•';

/// Amount of trailing phone characters left visible
const VISIBLE_PHONE_CHARS: usize = 4;

#[derive(Clone, Debug)]
pub struct CreateReservation {
	pub first_name:   String,
	pub last_name:    String,
	pub phone:        String,
	pub scheduled_at: DateTime<Utc>,
}

/// A created reservation together with its raw PIN
///
/// This is the only place the raw PIN is ever available.
#[derive(Clone)]
pub struct CreatedReservation {
	pub id:             i64,
	pub pin:            String,
	pub scheduled_at:   DateTime<Utc>,
	pub active_from:    DateTime<Utc>,
	pub nominal_expiry: DateTime<Utc>,
}

impl std::fmt::Debug for CreatedReservation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CreatedReservation")
			.field("id", &self.id)
			.field("scheduled_at", &self.scheduled_at)
			.field("active_from", &self.active_from)
			.field("nominal_expiry", &self.nominal_expiry)
			.finish_non_exhaustive()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmedReservation {
	pub id:              i64,
	pub expected_start:  DateTime<Utc>,
	pub window:          ValidityWindow,
	pub confirmed_at:    DateTime<Utc>,
	pub newly_confirmed: bool,
}

/// The publicly listable projection of a reservation
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicReservation {
	pub id:           String,
	pub first_name:   String,
	pub last_name:    String,
	pub phone:        String,
	pub scheduled_at: DateTime<Utc>,
	pub status:       ReservationStatus,
	pub confirmed_at: Option<DateTime<Utc>>,
	pub pin_last4:    String,
	pub created_at:   DateTime<Utc>,
}

impl From<PrimitiveReservation> for PublicReservation {
	fn from(value: PrimitiveReservation) -> Self {
		Self {
			id:           value.id.to_string(),
			first_name:   value.first_name,
			last_name:    value.last_name,
			phone:        mask_phone(&value.phone),
			scheduled_at: value.scheduled_at,
			status:       value.status,
			confirmed_at: value.confirmed_at,
			pin_last4:    value.pin_last4,
			created_at:   value.created_at,
		}
	}
}

/// Replace everything but the last four characters of `phone`
#[must_use]
pub fn mask_phone(phone: &str) -> String {
	let visible_from =
		phone.chars().count().saturating_sub(VISIBLE_PHONE_CHARS);

	phone
		.chars()
		.enumerate()
		.map(|(i, c)| if i < visible_from { PHONE_MASK } else { c })
		.collect()
}

/// Book a reservation and issue its PIN
///
/// # Errors
/// Errors if `scheduled_at` is not after `now`, if its validity window
/// cannot be represented, or if storing fails, in which case nothing is
/// stored
#[instrument(skip_all, fields(scheduled_at = %request.scheduled_at))]
pub async fn create(
	store: &dyn ReservationStore,
	config: &ReservationConfig,
	request: CreateReservation,
	now: DateTime<Utc>,
) -> Result<CreatedReservation, Error> {
	if request.scheduled_at <= now {
		return Err(Error::Validation(
			"scheduledAt must be in the future".to_string(),
		));
	}

	// Rejected before anything is stored
	let Some(window) = ValidityWindow::compute(
		&config.window,
		request.scheduled_at,
		request.scheduled_at,
	) else {
		return Err(Error::Validation("scheduledAt is out of range".to_string()));
	};

	let secret = config.pin_secret.clone();
	let issue: PinIssuer = Box::new(move |id, scheduled_at| {
		pin::generate_for_reservation(id, scheduled_at, &secret)
	});

	let new_reservation = NewReservation::new(
		request.first_name,
		request.last_name,
		request.phone,
		request.scheduled_at,
	);

	let (created, issued) =
		store.insert_with_pin(new_reservation, issue).await?;

	Ok(CreatedReservation {
		id:             created.id,
		pin:            issued.pin,
		scheduled_at:   created.scheduled_at,
		active_from:    window.valid_from,
		nominal_expiry: window.nominal_until,
	})
}

/// Confirm the reservation a raw PIN belongs to
///
/// The PIN is only accepted inside its validity window, which stretches
/// when the queue of the reservation's day runs late. Confirming an already
/// confirmed reservation succeeds without changing it.
///
/// # Errors
/// Errors if the PIN is empty, unknown, not active yet or expired, or if
/// the store fails
#[instrument(skip_all)]
pub async fn confirm(
	store: &dyn ReservationStore,
	config: &ReservationConfig,
	pin: &str,
	now: DateTime<Utc>,
) -> Result<ConfirmedReservation, Error> {
	if pin.is_empty() {
		return Err(Error::PinRequired);
	}

	if pin.len() == PIN_LENGTH && !has_valid_checksum(pin) {
		return Err(Error::InvalidPin);
	}

	let Some(matched) = find_by_pin(store, pin).await? else {
		return Err(Error::InvalidPin);
	};

	let (day_start, day_end) = day_bounds(matched.scheduled_at, config.day_offset);
	let day = store.queue_between(day_start, day_end).await?;

	// The matched reservation is always part of its own day
	let expected_start = expected_starts(&day, config.service_duration)
		.get(&matched.id)
		.copied()
		.unwrap_or(matched.scheduled_at);

	let Some(window) =
		ValidityWindow::compute(&config.window, matched.scheduled_at, expected_start)
	else {
		return Err(Error::Validation("scheduledAt is out of range".to_string()));
	};

	match window.check(now) {
		WindowState::NotYetActive { activates_at } => {
			return Err(Error::NotActiveYet(activates_at));
		},
		WindowState::Expired { expired_at } => {
			return Err(Error::Expired(expired_at));
		},
		WindowState::Active => {},
	}

	let confirmation = store.confirm(matched.id, now).await?;

	Ok(ConfirmedReservation {
		id: matched.id,
		expected_start,
		window,
		confirmed_at: confirmation.confirmed_at,
		newly_confirmed: confirmation.newly_confirmed,
	})
}

/// List every reservation's public projection ordered by creation time
///
/// # Errors
/// Errors if the store fails
#[instrument(skip(store))]
pub async fn list(
	store: &dyn ReservationStore,
	order: SortOrder,
) -> Result<Vec<PublicReservation>, Error> {
	let rows = store.list(order).await?;

	Ok(rows.into_iter().map(Into::into).collect())
}

/// Record when a reservation really ended, later queue simulations use it
/// instead of the average service duration
///
/// # Errors
/// Errors if the reservation does not exist or the store fails
#[instrument(skip(store))]
pub async fn record_actual_end(
	store: &dyn ReservationStore,
	id: i64,
	actual_end: DateTime<Utc>,
) -> Result<QueueEntry, Error> {
	let row = store.set_actual_end(id, actual_end).await?;

	Ok(QueueEntry::from(&row))
}
