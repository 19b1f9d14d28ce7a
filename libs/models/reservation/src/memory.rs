use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::Error;
use db::ReservationStatus;
use parking_lot::Mutex;
use pin::IssuedPin;
use primitive_reservation::{
	Confirmation,
	NewReservation,
	PIN_PLACEHOLDER,
	PinCandidate,
	PinIssuer,
	PrimitiveReservation,
	SortOrder,
};
use queue::QueueEntry;

use crate::ReservationStore;

/// In-process [`ReservationStore`]
///
/// Every operation holds a single lock for its whole duration, which gives
/// the same atomicity the Postgres store gets from transactions.
#[derive(Debug, Default)]
pub struct MemoryStore {
	state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
	last_id: i64,
	rows:    Vec<PrimitiveReservation>,
}

impl MemoryState {
	fn find_mut(&mut self, id: i64) -> Result<&mut PrimitiveReservation, Error> {
		self.rows
			.iter_mut()
			.find(|r| r.id == id)
			.ok_or_else(|| Error::NotFound(format!("reservation {id}")))
	}
}

impl MemoryStore {
	#[must_use]
	pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ReservationStore for MemoryStore {
	async fn insert_with_pin(
		&self,
		new: NewReservation,
		issue: PinIssuer,
	) -> Result<(PrimitiveReservation, IssuedPin), Error> {
		let mut state = self.state.lock();

		// Identities are never reused, even when the insert is rolled back
		state.last_id += 1;

		let mut row = PrimitiveReservation {
			id:           state.last_id,
			first_name:   new.first_name,
			last_name:    new.last_name,
			phone:        new.phone,
			scheduled_at: new.scheduled_at,
			status:       ReservationStatus::Booked,
			confirmed_at: None,
			pin_hash:     PIN_PLACEHOLDER.to_string(),
			pin_salt:     PIN_PLACEHOLDER.to_string(),
			pin_last4:    PIN_PLACEHOLDER.to_string(),
			actual_end:   None,
			created_at:   Utc::now(),
		};

		let issued = issue(row.id, row.scheduled_at)?;

		row.pin_hash.clone_from(&issued.hash);
		row.pin_salt.clone_from(&issued.salt);
		row.pin_last4 = issued.last4().to_string();

		state.rows.push(row.clone());

		info!("created reservation {}", row.id);

		Ok((row, issued))
	}

	async fn candidates_by_last4(
		&self,
		suffix: &str,
		max: i64,
	) -> Result<Vec<PinCandidate>, Error> {
		let state = self.state.lock();

		let mut matches: Vec<&PrimitiveReservation> =
			state.rows.iter().filter(|r| r.pin_last4 == suffix).collect();
		matches.sort_by(|a, b| {
			(b.created_at, b.id).cmp(&(a.created_at, a.id))
		});

		let max = usize::try_from(max).unwrap_or(0);

		Ok(matches.into_iter().take(max).map(PinCandidate::from).collect())
	}

	async fn queue_between(
		&self,
		start: DateTime<Utc>,
		end: DateTime<Utc>,
	) -> Result<Vec<QueueEntry>, Error> {
		let state = self.state.lock();

		let mut entries: Vec<QueueEntry> = state
			.rows
			.iter()
			.filter(|r| r.scheduled_at >= start && r.scheduled_at < end)
			.map(QueueEntry::from)
			.collect();
		entries.sort_by_key(|e| (e.scheduled_at, e.id));

		Ok(entries)
	}

	async fn confirm(
		&self,
		id: i64,
		now: DateTime<Utc>,
	) -> Result<Confirmation, Error> {
		let mut state = self.state.lock();
		let row = state.find_mut(id)?;

		match (row.status, row.confirmed_at) {
			(ReservationStatus::Confirmed, Some(confirmed_at)) => {
				debug!("reservation {id} was already confirmed");

				Ok(Confirmation { confirmed_at, newly_confirmed: false })
			},
			_ => {
				row.status = ReservationStatus::Confirmed;
				row.confirmed_at = Some(now);

				info!("confirmed reservation {id}");

				Ok(Confirmation { confirmed_at: now, newly_confirmed: true })
			},
		}
	}

	async fn set_actual_end(
		&self,
		id: i64,
		end: DateTime<Utc>,
	) -> Result<PrimitiveReservation, Error> {
		let mut state = self.state.lock();
		let row = state.find_mut(id)?;

		row.actual_end = Some(end);

		info!("recorded actual end {end} for reservation {id}");

		Ok(row.clone())
	}

	async fn list(
		&self,
		order: SortOrder,
	) -> Result<Vec<PrimitiveReservation>, Error> {
		let mut rows = self.state.lock().rows.clone();

		rows.sort_by_key(|r| (r.created_at, r.id));
		if order == SortOrder::Desc {
			rows.reverse();
		}

		Ok(rows)
	}

	async fn ping(&self) -> Result<(), Error> { Ok(()) }
}
