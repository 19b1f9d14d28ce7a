use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use primitive_reservation::SortOrder;
use regex::Regex;
use reservation::{
	ConfirmedReservation,
	CreateReservation,
	CreatedReservation,
};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use validator_derive::Validate;

static PIN_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\d{4,9}$").unwrap());

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
	#[validate(length(min = 1, message = "firstName is required"))]
	pub first_name:   String,
	#[validate(length(min = 1, message = "lastName is required"))]
	pub last_name:    String,
	#[validate(length(
		min = 7,
		max = 20,
		message = "phone must be between 7 and 20 characters long",
		code = "phone-length"
	))]
	pub phone:        String,
	pub scheduled_at: DateTime<Utc>,
}

impl CreateReservationRequest {
	/// Strip surrounding whitespace from every text field
	#[must_use]
	pub fn trimmed(self) -> Self {
		Self {
			first_name:   self.first_name.trim().to_string(),
			last_name:    self.last_name.trim().to_string(),
			phone:        self.phone.trim().to_string(),
			scheduled_at: self.scheduled_at,
		}
	}
}

impl From<CreateReservationRequest> for CreateReservation {
	fn from(value: CreateReservationRequest) -> Self {
		Self {
			first_name:   value.first_name,
			last_name:    value.last_name,
			phone:        value.phone,
			scheduled_at: value.scheduled_at,
		}
	}
}

/// The data returned when making a new reservation, the only response
/// that ever contains a raw PIN
#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationResponse {
	pub ok:             bool,
	#[serde_as(as = "DisplayFromStr")]
	pub id:             i64,
	pub pin:            String,
	pub active_from:    DateTime<Utc>,
	pub nominal_expiry: DateTime<Utc>,
}

impl From<CreatedReservation> for CreateReservationResponse {
	fn from(value: CreatedReservation) -> Self {
		Self {
			ok:             true,
			id:             value.id,
			pin:            value.pin,
			active_from:    value.active_from,
			nominal_expiry: value.nominal_expiry,
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct ConfirmReservationRequest {
	#[validate(regex(
		path = *PIN_REGEX,
		message = "pin must be 4-9 digits",
		code = "pin-regex"
	))]
	pub pin: Option<String>,
}

impl ConfirmReservationRequest {
	/// Treat an empty PIN the same as a missing one
	#[must_use]
	pub fn normalized(self) -> Self {
		Self { pin: self.pin.filter(|p| !p.is_empty()) }
	}
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmReservationResponse {
	pub ok:                bool,
	#[serde_as(as = "DisplayFromStr")]
	pub id:                i64,
	pub expected_start:    DateTime<Utc>,
	pub valid_from:        DateTime<Utc>,
	pub valid_until:       DateTime<Utc>,
	pub confirmed_at:      DateTime<Utc>,
	pub already_confirmed: bool,
}

impl From<ConfirmedReservation> for ConfirmReservationResponse {
	fn from(value: ConfirmedReservation) -> Self {
		Self {
			ok:                true,
			id:                value.id,
			expected_start:    value.expected_start,
			valid_from:        value.window.valid_from,
			valid_until:       value.window.valid_until,
			confirmed_at:      value.confirmed_at,
			already_confirmed: !value.newly_confirmed,
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ListReservationsQuery {
	pub sort: Option<String>,
}

impl ListReservationsQuery {
	/// Anything but `asc` lists the newest reservations first
	#[must_use]
	pub fn order(&self) -> SortOrder {
		match self.sort.as_deref() {
			Some("asc") => SortOrder::Asc,
			_ => SortOrder::Desc,
		}
	}
}
