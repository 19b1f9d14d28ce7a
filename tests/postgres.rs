use ::common::Error;
use axum::http::StatusCode;
use chrono::{DateTime, TimeDelta, TimeZone, Timelike, Utc};
use db::ReservationStatus;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use pin::IssuedPin;
use pinqueue::schemas::reservation::{
	ConfirmReservationResponse,
	CreateReservationResponse,
};
use primitive_reservation::{NewReservation, PinIssuer, SortOrder};
use reservation::{PublicReservation, ReservationStore};
use serde_json::json;

mod common;

use self::common::TestEnv;

fn at(h: u32, m: u32) -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2030, 1, 1, h, m, 0).unwrap()
}

fn new_reservation(scheduled_at: DateTime<Utc>) -> NewReservation {
	NewReservation::new(
		"Bob".to_string(),
		"Builder".to_string(),
		"+32470123456".to_string(),
		scheduled_at,
	)
}

/// Issue the same fixed PIN artifacts for every row
fn fixed_pin(pin: &'static str) -> PinIssuer {
	Box::new(move |_, _| {
		Ok(IssuedPin {
			pin:  pin.to_string(),
			salt: "salt".to_string(),
			hash: "hash".to_string(),
		})
	})
}

async fn insert(env: &TestEnv, scheduled_at: DateTime<Utc>) -> i64 {
	let (created, _) = env
		.store
		.insert_with_pin(new_reservation(scheduled_at), fixed_pin("000001234"))
		.await
		.unwrap();

	created.id
}

#[tokio::test(flavor = "multi_thread")]
async fn test_insert_with_pin_stores_the_issued_artifacts() {
	let env = TestEnv::postgres().await;

	let (created, issued) = env
		.store
		.insert_with_pin(new_reservation(at(10, 0)), fixed_pin("987654321"))
		.await
		.unwrap();

	assert_eq!(issued.pin, "987654321");
	assert_eq!(created.pin_last4, "4321");
	assert_eq!(created.pin_hash, "hash");
	assert_eq!(created.pin_salt, "salt");
	assert_eq!(created.status, ReservationStatus::Booked);
	assert_eq!(created.confirmed_at, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_insert_with_pin_rolls_back_when_issuing_fails() {
	let env = TestEnv::postgres().await;

	let failing: PinIssuer = Box::new(|_, _| Err(Error::InternalServerError));

	let result = env
		.store
		.insert_with_pin(new_reservation(at(10, 0)), failing)
		.await;

	assert!(matches!(result, Err(Error::InternalServerError)));
	assert!(env.store.list(SortOrder::Asc).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_confirm_is_a_compare_and_set() {
	let env = TestEnv::postgres().await;
	let id = insert(&env, at(10, 0)).await;

	let first = env.store.confirm(id, at(9, 50)).await.unwrap();

	assert!(first.newly_confirmed);
	assert_eq!(first.confirmed_at, at(9, 50));

	let second = env.store.confirm(id, at(9, 55)).await.unwrap();

	assert!(!second.newly_confirmed);
	assert_eq!(second.confirmed_at, at(9, 50));

	let rows = env.store.list(SortOrder::Asc).await.unwrap();
	assert_eq!(rows[0].status, ReservationStatus::Confirmed);
	assert_eq!(rows[0].confirmed_at, Some(at(9, 50)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_confirmations_have_one_winner() {
	let env = TestEnv::postgres().await;
	let id = insert(&env, at(10, 0)).await;

	let (left, right) = tokio::join!(
		env.store.confirm(id, at(9, 50)),
		env.store.confirm(id, at(9, 51)),
	);

	let (left, right) = (left.unwrap(), right.unwrap());

	assert!(left.newly_confirmed ^ right.newly_confirmed);
	assert_eq!(left.confirmed_at, right.confirmed_at);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_confirm_unknown_reservation() {
	let env = TestEnv::postgres().await;

	let result = env.store.confirm(42, at(10, 0)).await;

	assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_queue_between_is_half_open() {
	let env = TestEnv::postgres().await;

	let day_start = at(0, 0);
	let day_end = day_start + TimeDelta::days(1);

	let before = insert(&env, day_start - TimeDelta::seconds(1)).await;
	let late = insert(&env, at(23, 59)).await;
	let first = insert(&env, day_start).await;
	let tied = insert(&env, at(23, 59)).await;
	let next_day = insert(&env, day_end).await;

	let entries = env.store.queue_between(day_start, day_end).await.unwrap();
	let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();

	assert_eq!(ids, vec![first, late, tied]);
	assert!(!ids.contains(&before));
	assert!(!ids.contains(&next_day));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_candidates_are_capped_newest_first() {
	let env = TestEnv::postgres().await;

	let _oldest = insert(&env, at(10, 0)).await;
	let middle = insert(&env, at(11, 0)).await;
	let newest = insert(&env, at(12, 0)).await;

	let candidates = env.store.candidates_by_last4("1234", 2).await.unwrap();
	let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();

	assert_eq!(ids, vec![newest, middle]);
	assert!(env.store.candidates_by_last4("9999", 2).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_actual_end() {
	let env = TestEnv::postgres().await;
	let id = insert(&env, at(10, 0)).await;

	let updated = env.store.set_actual_end(id, at(10, 7)).await.unwrap();
	assert_eq!(updated.actual_end, Some(at(10, 7)));

	let missing = env.store.set_actual_end(id + 1, at(10, 7)).await;
	assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_confirmed_rows_need_a_confirmation_time() {
	let env = TestEnv::postgres().await;
	let r_id = insert(&env, at(10, 0)).await;

	let pool = env.db_guard.as_ref().unwrap().pool();
	let conn = pool.get().await.unwrap();

	let result = conn
		.interact(move |conn| {
			use db::reservation::dsl::*;

			diesel::update(reservation.find(r_id))
				.set(status.eq(ReservationStatus::Confirmed))
				.execute(conn)
		})
		.await
		.unwrap();

	assert!(matches!(
		result,
		Err(DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, _))
	));

	let rows = env.store.list(SortOrder::Asc).await.unwrap();
	assert_eq!(rows[0].status, ReservationStatus::Booked);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reservation_lifecycle() {
	let env = TestEnv::postgres().await;

	let health = env.app.get("/api/health").await;
	assert_eq!(health.status_code(), StatusCode::OK);

	let scheduled_at =
		Utc::now().with_nanosecond(0).unwrap() + TimeDelta::minutes(5);

	let created = env
		.app
		.post("/api/reservations")
		.json(&json!({
			"firstName": "Bob",
			"lastName": "Builder",
			"phone": "+32470123456",
			"scheduledAt": scheduled_at,
		}))
		.await;
	assert_eq!(created.status_code(), StatusCode::CREATED);

	let created = created.json::<CreateReservationResponse>();

	let confirmed = env
		.app
		.post("/api/reservations/confirm")
		.json(&json!({ "pin": created.pin }))
		.await;
	assert_eq!(confirmed.status_code(), StatusCode::OK);

	let confirmed = confirmed.json::<ConfirmReservationResponse>();
	assert!(!confirmed.already_confirmed);
	assert_eq!(confirmed.expected_start, scheduled_at);

	let again = env
		.app
		.post("/api/reservations/confirm")
		.json(&json!({ "pin": created.pin }))
		.await
		.json::<ConfirmReservationResponse>();
	assert!(again.already_confirmed);
	assert_eq!(again.confirmed_at, confirmed.confirmed_at);

	let list = env
		.app
		.get("/api/reservations")
		.await
		.json::<Vec<PublicReservation>>();
	assert_eq!(list.len(), 1);
	assert_eq!(list[0].status, ReservationStatus::Confirmed);
	assert_eq!(list[0].phone, "••••••••3456");
}
