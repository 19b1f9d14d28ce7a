//! Controllers for reservations

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::WithRejection;
use chrono::Utc;
use common::Error;
use reservation::{ReservationConfig, SharedStore};
use validator::Validate;

use crate::schemas::reservation::{
	ConfirmReservationRequest,
	ConfirmReservationResponse,
	CreateReservationRequest,
	CreateReservationResponse,
	ListReservationsQuery,
};

/// List all reservations with masked phone numbers
#[instrument(skip_all)]
pub(crate) async fn get_reservations(
	State(store): State<SharedStore>,
	WithRejection(Query(query), _): WithRejection<
		Query<ListReservationsQuery>,
		Error,
	>,
) -> Result<impl IntoResponse, Error> {
	let reservations = reservation::list(store.as_ref(), query.order()).await?;

	Ok((StatusCode::OK, Json(reservations)))
}

/// Book a reservation and hand out its PIN
#[instrument(skip_all)]
pub(crate) async fn create_reservation(
	State(store): State<SharedStore>,
	State(config): State<ReservationConfig>,
	WithRejection(Json(request), _): WithRejection<
		Json<CreateReservationRequest>,
		Error,
	>,
) -> Result<impl IntoResponse, Error> {
	let request = request.trimmed();
	request.validate()?;

	let created =
		reservation::create(store.as_ref(), &config, request.into(), Utc::now())
			.await?;

	let response = CreateReservationResponse::from(created);

	Ok((StatusCode::CREATED, Json(response)))
}

/// Confirm a reservation by its PIN
#[instrument(skip_all)]
pub(crate) async fn confirm_reservation(
	State(store): State<SharedStore>,
	State(config): State<ReservationConfig>,
	WithRejection(Json(request), _): WithRejection<
		Json<ConfirmReservationRequest>,
		Error,
	>,
) -> Result<impl IntoResponse, Error> {
	let request = request.normalized();
	request.validate()?;

	let pin = request.pin.unwrap_or_default();

	let confirmed =
		reservation::confirm(store.as_ref(), &config, &pin, Utc::now()).await?;

	let response = ConfirmReservationResponse::from(confirmed);

	Ok((StatusCode::OK, Json(response)))
}
