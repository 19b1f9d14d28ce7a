use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// The slice of a reservation the queue simulation needs
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
	pub id:           i64,
	pub scheduled_at: DateTime<Utc>,
	/// Known completion time, overrides the average service duration
	pub actual_end:   Option<DateTime<Utc>>,
}

/// Compute the realistic start time of every entry of a single day
///
/// Entries are served one at a time in order of `scheduled_at`, entries with
/// the same scheduled time keep their relative input order. An entry starts
/// at its scheduled time or when the previous one ends, whichever is later.
/// The previous end is its `actual_end` when known and `expected start +
/// service` otherwise.
#[must_use]
pub fn expected_starts(
	entries: &[QueueEntry],
	service: TimeDelta,
) -> HashMap<i64, DateTime<Utc>> {
	let mut sorted: Vec<&QueueEntry> = entries.iter().collect();
	// `sort_by_key` is stable
	sorted.sort_by_key(|entry| entry.scheduled_at);

	let mut starts = HashMap::with_capacity(sorted.len());
	let mut previous_end: Option<DateTime<Utc>> = None;

	for entry in sorted {
		let expected_start = match previous_end {
			Some(end) => entry.scheduled_at.max(end),
			None => entry.scheduled_at,
		};

		starts.insert(entry.id, expected_start);

		let end = entry.actual_end.unwrap_or_else(|| {
			expected_start
				.checked_add_signed(service)
				.unwrap_or(DateTime::<Utc>::MAX_UTC)
		});

		previous_end = Some(end);
	}

	starts
}

/// The half-open `[midnight, next midnight)` interval around `at`, with
/// midnight taken in the given offset
///
/// Both bounds are clamped to the representable time range.
#[must_use]
pub fn day_bounds(
	at: DateTime<Utc>,
	offset: FixedOffset,
) -> (DateTime<Utc>, DateTime<Utc>) {
	let since_midnight = at.with_timezone(&offset).time() - NaiveTime::MIN;
	let start = at
		.checked_sub_signed(since_midnight)
		.unwrap_or(DateTime::<Utc>::MIN_UTC);
	let end = start
		.checked_add_signed(TimeDelta::days(1))
		.unwrap_or(DateTime::<Utc>::MAX_UTC);

	(start, end)
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;

	use super::*;

	fn at(h: u32, m: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2030, 1, 1, h, m, 0).unwrap()
	}

	fn entry(id: i64, scheduled_at: DateTime<Utc>) -> QueueEntry {
		QueueEntry { id, scheduled_at, actual_end: None }
	}

	fn five() -> TimeDelta { TimeDelta::minutes(5) }

	#[test]
	fn empty_day_has_no_starts() {
		assert!(expected_starts(&[], five()).is_empty());
	}

	#[test]
	fn single_entry_starts_on_time() {
		let starts = expected_starts(&[entry(1, at(10, 0))], five());

		assert_eq!(starts[&1], at(10, 0));
	}

	#[test]
	fn spaced_entries_start_on_time() {
		let starts = expected_starts(
			&[entry(1, at(10, 0)), entry(2, at(10, 5)), entry(3, at(10, 10))],
			five(),
		);

		assert_eq!(starts[&1], at(10, 0));
		assert_eq!(starts[&2], at(10, 5));
		assert_eq!(starts[&3], at(10, 10));
	}

	#[test]
	fn tight_entries_cascade() {
		let starts = expected_starts(
			&[entry(1, at(10, 0)), entry(2, at(10, 1)), entry(3, at(10, 2))],
			five(),
		);

		assert_eq!(starts[&1], at(10, 0));
		assert_eq!(starts[&2], at(10, 5));
		assert_eq!(starts[&3], at(10, 10));
	}

	#[test]
	fn actual_end_overrides_the_service_duration() {
		let first = QueueEntry {
			id:           1,
			scheduled_at: at(10, 0),
			actual_end:   Some(at(10, 7)),
		};

		let starts = expected_starts(
			&[first, entry(2, at(10, 5)), entry(3, at(10, 8))],
			five(),
		);

		assert_eq!(starts[&2], at(10, 7));
		assert_eq!(starts[&3], at(10, 12));
	}

	#[test]
	fn early_actual_end_frees_the_queue() {
		let first = QueueEntry {
			id:           1,
			scheduled_at: at(10, 0),
			actual_end:   Some(at(10, 2)),
		};

		let starts = expected_starts(&[first, entry(2, at(10, 3))], five());

		assert_eq!(starts[&2], at(10, 3));
	}

	#[test]
	fn input_order_does_not_matter() {
		let starts = expected_starts(
			&[entry(3, at(10, 10)), entry(1, at(10, 0)), entry(2, at(10, 5))],
			five(),
		);

		assert_eq!(starts[&1], at(10, 0));
		assert_eq!(starts[&2], at(10, 5));
		assert_eq!(starts[&3], at(10, 10));
	}

	#[test]
	fn ties_keep_input_order() {
		let starts = expected_starts(
			&[entry(3, at(10, 0)), entry(1, at(10, 0)), entry(2, at(10, 0))],
			five(),
		);

		assert_eq!(starts[&3], at(10, 0));
		assert_eq!(starts[&1], at(10, 5));
		assert_eq!(starts[&2], at(10, 10));
	}

	#[test]
	fn service_duration_sets_the_spacing() {
		let starts = expected_starts(
			&[entry(1, at(10, 0)), entry(2, at(10, 1)), entry(3, at(10, 2))],
			TimeDelta::minutes(3),
		);

		assert_eq!(starts[&2], at(10, 3));
		assert_eq!(starts[&3], at(10, 6));
	}

	#[test]
	fn simulation_is_repeatable() {
		let entries =
			[entry(1, at(10, 0)), entry(2, at(10, 1)), entry(3, at(10, 2))];

		assert_eq!(
			expected_starts(&entries, five()),
			expected_starts(&entries, five())
		);
	}

	#[test]
	fn day_bounds_in_utc() {
		let (start, end) = day_bounds(at(10, 30), FixedOffset::east_opt(0).unwrap());

		assert_eq!(start, at(0, 0));
		assert_eq!(end, at(0, 0) + TimeDelta::days(1));
	}

	#[test]
	fn day_bounds_follow_the_offset() {
		// 23:30 UTC is already the next day at UTC+2
		let offset = FixedOffset::east_opt(2 * 3600).unwrap();
		let (start, end) = day_bounds(at(23, 30), offset);

		assert_eq!(start, at(22, 0));
		assert_eq!(end, at(22, 0) + TimeDelta::days(1));
	}

	#[test]
	fn service_past_the_time_range_saturates() {
		let last = DateTime::<Utc>::MAX_UTC - TimeDelta::minutes(1);

		let starts = expected_starts(&[entry(1, last), entry(2, last)], five());

		assert_eq!(starts[&1], last);
		assert_eq!(starts[&2], DateTime::<Utc>::MAX_UTC);
	}

	#[test]
	fn day_bounds_at_the_time_range_end() {
		let (start, end) =
			day_bounds(DateTime::<Utc>::MAX_UTC, FixedOffset::east_opt(0).unwrap());

		assert!(start <= DateTime::<Utc>::MAX_UTC);
		assert_eq!(end, DateTime::<Utc>::MAX_UTC);
	}
}
