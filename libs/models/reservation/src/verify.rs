use common::Error;
use primitive_reservation::PinCandidate;

use crate::ReservationStore;

/// Maximum amount of rows checked for a single PIN suffix
pub const PIN_CANDIDATE_LIMIT: i64 = 20;

/// Resolve a raw PIN to the reservation it was issued for
///
/// Rows are narrowed down by the last four digits of `candidate` before
/// every remaining row's salted hash is checked, newest first.
///
/// # Errors
/// Errors if the store fails
#[instrument(skip_all)]
pub async fn find_by_pin(
	store: &dyn ReservationStore,
	candidate: &str,
) -> Result<Option<PinCandidate>, Error> {
	let suffix = pin::last4(candidate);

	let candidates =
		store.candidates_by_last4(suffix, PIN_CANDIDATE_LIMIT).await?;

	debug!("checking {} candidates for PIN suffix {suffix}", candidates.len());

	let matched = candidates
		.into_iter()
		.find(|c| pin::verify(candidate, &c.pin_hash, &c.pin_salt));

	Ok(matched)
}
