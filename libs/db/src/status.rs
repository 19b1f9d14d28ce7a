use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a reservation
///
/// The only transition is `Booked -> Confirmed`
#[derive(
	Clone, Copy, DbEnum, Debug, Default, Deserialize, PartialEq, Eq, Serialize,
)]
#[ExistingTypePath = "crate::sql_types::ReservationStatus"]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
	#[default]
	Booked,
	Confirmed,
}
