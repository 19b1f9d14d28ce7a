use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::controllers::healthcheck;
use crate::controllers::reservation::{
	confirm_reservation,
	create_reservation,
	get_reservations,
};
use crate::middleware::RateLimitLayer;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Get the app router
pub fn get_app_router(state: AppState) -> Router {
	let api_routes = Router::new()
		.route("/health", get(healthcheck))
		.nest("/reservations", reservation_routes(&state));

	Router::new()
		.nest("/api", api_routes)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(&state))
				.layer(TimeoutLayer::new(Duration::from_secs(10)))
				.layer(RateLimitLayer::global(&state))
				.layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
		)
		.with_state(state)
}

/// Reservation routes
fn reservation_routes(state: &AppState) -> Router<AppState> {
	Router::new()
		.route("/", get(get_reservations).post(create_reservation))
		.route(
			"/confirm",
			post(confirm_reservation)
				.route_layer(RateLimitLayer::confirm(state)),
		)
}

/// Allow the configured browser origins, requests without an `Origin`
/// header are not affected
fn cors_layer(state: &AppState) -> CorsLayer {
	let origins = state
		.config
		.cors_origins
		.iter()
		.filter_map(|o| {
			HeaderValue::from_str(o)
				.inspect_err(|e| warn!("ignoring invalid CORS origin {o} -- {e}"))
				.ok()
		})
		.collect::<Vec<_>>();

	CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
		.allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
		.allow_credentials(state.config.cors_credentials)
}
