//! Defines controller functions that correspond to individual routes

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::Error;
use ::reservation::SharedStore;
use serde_json::{Value, json};

pub mod reservation;

/// Check if the storage connection and webserver are functional
pub(crate) async fn healthcheck(
	State(store): State<SharedStore>,
) -> Result<(StatusCode, Json<Value>), Error> {
	store.ping().await?;

	Ok((StatusCode::OK, Json(json!({ "ok": true }))))
}
