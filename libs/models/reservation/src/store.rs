use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{DbPool, Error};
use diesel::{RunQueryDsl, sql_query};
use pin::IssuedPin;
use primitive_reservation::{
	Confirmation,
	NewReservation,
	PinCandidate,
	PinIssuer,
	PrimitiveReservation,
	SortOrder,
};
use queue::QueueEntry;

/// Storage of reservations
///
/// Implementations must make [`insert_with_pin`](Self::insert_with_pin)
/// atomic and [`confirm`](Self::confirm) a compare-and-set on the status.
#[async_trait]
pub trait ReservationStore: Send + Sync {
	/// Insert a row, derive its PIN artifacts from the assigned id and
	/// stored scheduled time and write them onto the same row, all or
	/// nothing
	async fn insert_with_pin(
		&self,
		new: NewReservation,
		issue: PinIssuer,
	) -> Result<(PrimitiveReservation, IssuedPin), Error>;

	/// Rows whose stored PIN suffix equals `suffix`, newest first, at most
	/// `max`
	async fn candidates_by_last4(
		&self,
		suffix: &str,
		max: i64,
	) -> Result<Vec<PinCandidate>, Error>;

	/// Queue entries scheduled in `[start, end)`
	async fn queue_between(
		&self,
		start: DateTime<Utc>,
		end: DateTime<Utc>,
	) -> Result<Vec<QueueEntry>, Error>;

	/// Move a booked reservation to confirmed, leaving confirmed ones as
	/// they are
	async fn confirm(
		&self,
		id: i64,
		now: DateTime<Utc>,
	) -> Result<Confirmation, Error>;

	/// Record the real completion time of a reservation
	async fn set_actual_end(
		&self,
		id: i64,
		end: DateTime<Utc>,
	) -> Result<PrimitiveReservation, Error>;

	/// Every reservation ordered by creation time
	async fn list(
		&self,
		order: SortOrder,
	) -> Result<Vec<PrimitiveReservation>, Error>;

	/// Check whether the store is reachable
	async fn ping(&self) -> Result<(), Error>;
}

/// A reservation store shared between request handlers
pub type SharedStore = Arc<dyn ReservationStore>;

/// Postgres backed [`ReservationStore`]
#[derive(Clone)]
pub struct PgStore {
	pool: DbPool,
}

impl PgStore {
	#[must_use]
	pub fn new(pool: DbPool) -> Self { Self { pool } }
}

#[async_trait]
impl ReservationStore for PgStore {
	async fn insert_with_pin(
		&self,
		new: NewReservation,
		issue: PinIssuer,
	) -> Result<(PrimitiveReservation, IssuedPin), Error> {
		let conn = self.pool.get().await?;

		new.insert_with_pin(issue, &conn).await
	}

	async fn candidates_by_last4(
		&self,
		suffix: &str,
		max: i64,
	) -> Result<Vec<PinCandidate>, Error> {
		let conn = self.pool.get().await?;

		PrimitiveReservation::candidates_by_last4(suffix.to_string(), max, &conn)
			.await
	}

	async fn queue_between(
		&self,
		start: DateTime<Utc>,
		end: DateTime<Utc>,
	) -> Result<Vec<QueueEntry>, Error> {
		let conn = self.pool.get().await?;

		PrimitiveReservation::queue_between(start, end, &conn).await
	}

	async fn confirm(
		&self,
		id: i64,
		now: DateTime<Utc>,
	) -> Result<Confirmation, Error> {
		let conn = self.pool.get().await?;

		PrimitiveReservation::confirm(id, now, &conn).await
	}

	async fn set_actual_end(
		&self,
		id: i64,
		end: DateTime<Utc>,
	) -> Result<PrimitiveReservation, Error> {
		let conn = self.pool.get().await?;

		PrimitiveReservation::set_actual_end(id, end, &conn).await
	}

	async fn list(
		&self,
		order: SortOrder,
	) -> Result<Vec<PrimitiveReservation>, Error> {
		let conn = self.pool.get().await?;

		PrimitiveReservation::get_all(order, &conn).await
	}

	async fn ping(&self) -> Result<(), Error> {
		let conn = self.pool.get().await?;

		conn.interact(|conn| sql_query("SELECT 1").execute(conn)).await??;

		Ok(())
	}
}
