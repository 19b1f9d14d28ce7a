#[macro_use]
extern crate tracing;

use chrono::{DateTime, Utc};
use common::{DbConn, Error, InternalServerError};
use db::{ReservationStatus, reservation};
use diesel::pg::Pg;
use diesel::prelude::*;
use pin::IssuedPin;
use queue::QueueEntry;
use serde::{Deserialize, Serialize};

/// Value of the PIN columns between inserting a row and assigning its PIN
pub const PIN_PLACEHOLDER: &str = "-";

/// Derives the PIN artifacts of a row from its assigned id and stored
/// scheduled time
pub type PinIssuer =
	Box<dyn FnOnce(i64, DateTime<Utc>) -> Result<IssuedPin, Error> + Send>;

/// Listing order by creation time
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
	Asc,
	#[default]
	Desc,
}

#[derive(Clone, Debug, Identifiable, Queryable, Selectable)]
#[diesel(table_name = reservation)]
#[diesel(check_for_backend(Pg))]
pub struct PrimitiveReservation {
	pub id:           i64,
	pub first_name:   String,
	pub last_name:    String,
	pub phone:        String,
	pub scheduled_at: DateTime<Utc>,
	pub status:       ReservationStatus,
	pub confirmed_at: Option<DateTime<Utc>>,
	pub pin_hash:     String,
	pub pin_salt:     String,
	pub pin_last4:    String,
	pub actual_end:   Option<DateTime<Utc>>,
	pub created_at:   DateTime<Utc>,
}

/// The columns needed to check a PIN against a row
#[derive(Clone, Debug, Queryable, Selectable)]
#[diesel(table_name = reservation)]
#[diesel(check_for_backend(Pg))]
pub struct PinCandidate {
	pub id:           i64,
	pub scheduled_at: DateTime<Utc>,
	pub pin_hash:     String,
	pub pin_salt:     String,
}

impl From<&PrimitiveReservation> for PinCandidate {
	fn from(value: &PrimitiveReservation) -> Self {
		Self {
			id:           value.id,
			scheduled_at: value.scheduled_at,
			pin_hash:     value.pin_hash.clone(),
			pin_salt:     value.pin_salt.clone(),
		}
	}
}

impl From<&PrimitiveReservation> for QueueEntry {
	fn from(value: &PrimitiveReservation) -> Self {
		Self {
			id:           value.id,
			scheduled_at: value.scheduled_at,
			actual_end:   value.actual_end,
		}
	}
}

/// Result of a `Booked -> Confirmed` transition attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Confirmation {
	pub confirmed_at:    DateTime<Utc>,
	/// `false` if the reservation was already confirmed, in which case
	/// `confirmed_at` is the original confirmation time
	pub newly_confirmed: bool,
}

impl PrimitiveReservation {
	/// Get the PIN candidates whose stored suffix equals `suffix`, newest
	/// first
	#[instrument(skip(conn))]
	pub async fn candidates_by_last4(
		suffix: String,
		max: i64,
		conn: &DbConn,
	) -> Result<Vec<PinCandidate>, Error> {
		let candidates = conn
			.interact(move |conn| {
				use self::reservation::dsl::*;

				reservation
					.filter(pin_last4.eq(suffix))
					.order((created_at.desc(), id.desc()))
					.limit(max)
					.select(PinCandidate::as_select())
					.get_results(conn)
			})
			.await??;

		Ok(candidates)
	}

	/// Get the queue entries scheduled in `[start, end)`, ordered by
	/// scheduled time and then by id
	#[instrument(skip(conn))]
	pub async fn queue_between(
		start: DateTime<Utc>,
		end: DateTime<Utc>,
		conn: &DbConn,
	) -> Result<Vec<QueueEntry>, Error> {
		let rows: Vec<(i64, DateTime<Utc>, Option<DateTime<Utc>>)> = conn
			.interact(move |conn| {
				use self::reservation::dsl::*;

				reservation
					.filter(scheduled_at.ge(start))
					.filter(scheduled_at.lt(end))
					.order((scheduled_at.asc(), id.asc()))
					.select((id, scheduled_at, actual_end))
					.get_results(conn)
			})
			.await??;

		let entries = rows
			.into_iter()
			.map(|(id, scheduled_at, actual_end)| {
				QueueEntry { id, scheduled_at, actual_end }
			})
			.collect();

		Ok(entries)
	}

	/// Transition a reservation to confirmed
	///
	/// Only rows that are still booked are updated, so concurrent
	/// confirmations of the same reservation cannot both win. Confirming an
	/// already confirmed reservation leaves it untouched.
	#[instrument(skip(conn))]
	pub async fn confirm(
		r_id: i64,
		now: DateTime<Utc>,
		conn: &DbConn,
	) -> Result<Confirmation, Error> {
		let confirmation = conn
			.interact(move |conn| {
				conn.transaction::<_, Error, _>(|conn| {
					use self::reservation::dsl::*;

					let updated = diesel::update(
						reservation
							.filter(id.eq(r_id))
							.filter(status.eq(ReservationStatus::Booked)),
					)
					.set((
						status.eq(ReservationStatus::Confirmed),
						confirmed_at.eq(now),
					))
					.returning(id)
					.get_result::<i64>(conn)
					.optional()?;

					if updated.is_some() {
						return Ok(Confirmation {
							confirmed_at:    now,
							newly_confirmed: true,
						});
					}

					let existing = reservation
						.find(r_id)
						.select(confirmed_at)
						.get_result::<Option<DateTime<Utc>>>(conn)
						.optional()?
						.ok_or_else(|| {
							Error::NotFound(format!("reservation {r_id}"))
						})?
						.ok_or_else(|| {
							InternalServerError::ConstraintError(format!(
								"reservation {r_id} is confirmed without a \
								 confirmation time"
							))
						})?;

					Ok(Confirmation {
						confirmed_at:    existing,
						newly_confirmed: false,
					})
				})
			})
			.await??;

		if confirmation.newly_confirmed {
			info!("confirmed reservation {r_id}");
		} else {
			debug!("reservation {r_id} was already confirmed");
		}

		Ok(confirmation)
	}

	/// Record when a reservation really ended
	#[instrument(skip(conn))]
	pub async fn set_actual_end(
		r_id: i64,
		end: DateTime<Utc>,
		conn: &DbConn,
	) -> Result<Self, Error> {
		let updated = conn
			.interact(move |conn| {
				use self::reservation::dsl::*;

				diesel::update(reservation.find(r_id))
					.set(actual_end.eq(end))
					.returning(Self::as_returning())
					.get_result(conn)
					.optional()
			})
			.await??
			.ok_or_else(|| Error::NotFound(format!("reservation {r_id}")))?;

		info!("recorded actual end {end} for reservation {r_id}");

		Ok(updated)
	}

	/// Get all reservations ordered by creation time
	#[instrument(skip(conn))]
	pub async fn get_all(
		order: SortOrder,
		conn: &DbConn,
	) -> Result<Vec<Self>, Error> {
		let reservations = conn
			.interact(move |conn| {
				use self::reservation::dsl::*;

				let query = reservation.select(Self::as_select());

				match order {
					SortOrder::Asc => {
						query
							.order((created_at.asc(), id.asc()))
							.get_results(conn)
					},
					SortOrder::Desc => {
						query
							.order((created_at.desc(), id.desc()))
							.get_results(conn)
					},
				}
			})
			.await??;

		Ok(reservations)
	}
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = reservation)]
#[diesel(check_for_backend(Pg))]
pub struct NewReservation {
	pub first_name:   String,
	pub last_name:    String,
	pub phone:        String,
	pub scheduled_at: DateTime<Utc>,
	pin_hash:         String,
	pin_salt:         String,
	pin_last4:        String,
}

impl NewReservation {
	#[must_use]
	pub fn new(
		first_name: String,
		last_name: String,
		phone: String,
		scheduled_at: DateTime<Utc>,
	) -> Self {
		Self {
			first_name,
			last_name,
			phone,
			scheduled_at,
			pin_hash: PIN_PLACEHOLDER.to_string(),
			pin_salt: PIN_PLACEHOLDER.to_string(),
			pin_last4: PIN_PLACEHOLDER.to_string(),
		}
	}

	/// Insert this [`NewReservation`] and assign its PIN artifacts in a
	/// single transaction
	///
	/// If `issue` fails the transaction is rolled back and no row remains.
	#[instrument(skip_all)]
	pub async fn insert_with_pin(
		self,
		issue: PinIssuer,
		conn: &DbConn,
	) -> Result<(PrimitiveReservation, IssuedPin), Error> {
		let (created, issued) = conn
			.interact(move |conn| {
				conn.transaction::<_, Error, _>(|conn| {
					use self::reservation::dsl::*;

					let placeholder = diesel::insert_into(reservation)
						.values(&self)
						.returning(PrimitiveReservation::as_returning())
						.get_result(conn)?;

					let issued =
						issue(placeholder.id, placeholder.scheduled_at)?;

					let created = diesel::update(reservation.find(placeholder.id))
						.set((
							pin_hash.eq(&issued.hash),
							pin_salt.eq(&issued.salt),
							pin_last4.eq(issued.last4()),
						))
						.returning(PrimitiveReservation::as_returning())
						.get_result(conn)?;

					Ok((created, issued))
				})
			})
			.await??;

		info!("created reservation {}", created.id);

		Ok((created, issued))
	}
}
