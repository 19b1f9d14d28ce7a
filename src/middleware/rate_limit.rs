//! Middleware to throttle requests per client bucket

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request};
use axum::http::Response;
use axum::response::IntoResponse;
use common::Error;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tower::{Layer, Service};

use crate::routes::MAX_BODY_BYTES;
use crate::{AppState, RateLimit};

/// A rate limiter holding one bucket per key
pub type KeyedLimiter = Arc<DefaultKeyedRateLimiter<String>>;

/// Bucket of requests without a usable PIN
const NO_PIN_PREFIX: &str = "nopin";

/// Create a [`KeyedLimiter`] allowing `limit.attempts` requests per
/// `limit.period`, all of which may be spent at once
#[must_use]
pub fn keyed_limiter(limit: RateLimit) -> KeyedLimiter {
	let replenish_interval = limit.period / limit.attempts.get();

	let quota = Quota::with_period(replenish_interval)
		.unwrap_or_else(|| Quota::per_second(limit.attempts))
		.allow_burst(limit.attempts);

	Arc::new(RateLimiter::keyed(quota))
}

/// How requests are grouped into buckets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bucket {
	/// One bucket per client address
	Client,
	/// One bucket per client address and first four PIN characters, so
	/// clients behind the same NAT do not block each other
	ClientAndPinPrefix,
}

/// Middleware layer that rejects requests once their bucket is exhausted
///
/// Rejected requests get a `429` with a `Retry-After` header and never
/// reach the inner service.
#[derive(Clone)]
pub struct RateLimitLayer {
	limiter: KeyedLimiter,
	bucket:  Bucket,
}

impl RateLimitLayer {
	/// Throttle every request per client address
	#[must_use]
	pub fn global(state: &AppState) -> Self {
		Self { limiter: state.global_limiter.clone(), bucket: Bucket::Client }
	}

	/// Throttle PIN confirmations per client address and PIN prefix
	#[must_use]
	pub fn confirm(state: &AppState) -> Self {
		Self {
			limiter: state.confirm_limiter.clone(),
			bucket:  Bucket::ClientAndPinPrefix,
		}
	}
}

impl<S> Layer<S> for RateLimitLayer {
	type Service = RateLimitMiddleware<S>;

	fn layer(&self, inner: S) -> Self::Service {
		RateLimitMiddleware {
			inner,
			limiter: self.limiter.clone(),
			bucket: self.bucket,
		}
	}
}

#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
	inner:   S,
	limiter: KeyedLimiter,
	bucket:  Bucket,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
where
	S: Service<Request, Response = Response<Body>> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Error = S::Error;
	type Future = Pin<
		Box<
			dyn Future<Output = Result<Self::Response, Self::Error>>
				+ Send
				+ 'static,
		>,
	>;
	type Response = S::Response;

	fn poll_ready(
		&mut self,
		cx: &mut Context<'_>,
	) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	#[instrument(skip_all)]
	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let cloned_inner = self.inner.clone();
		let mut inner = std::mem::replace(&mut self.inner, cloned_inner);

		let limiter = self.limiter.clone();
		let bucket = self.bucket;

		Box::pin(async move {
			let client = client_address(&req);

			let (req, key) = match bucket {
				Bucket::Client => (req, client),
				Bucket::ClientAndPinPrefix => {
					let (parts, body) = req.into_parts();

					let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES)
						.await
					{
						Ok(b) => b,
						Err(e) => {
							return Ok(
								Error::Validation(e.to_string()).into_response()
							);
						},
					};

					let key = format!("{client}:{}", pin_prefix(&bytes));

					(Request::from_parts(parts, Body::from(bytes)), key)
				},
			};

			if let Err(not_until) = limiter.check_key(&key) {
				let wait = not_until.wait_time_from(DefaultClock::default().now());

				warn!("rate limited bucket {key} for {}s", wait.as_secs());

				return Ok(
					Error::TooManyRequests(wait.as_secs().max(1)).into_response()
				);
			}

			inner.call(req).await
		})
	}
}

/// Get the address of the client that sent a request
///
/// A single reverse proxy is trusted, so the last `X-Forwarded-For` entry
/// wins over the peer address of the connection.
fn client_address(req: &Request) -> String {
	let forwarded = req
		.headers()
		.get("x-forwarded-for")
		.and_then(|h| h.to_str().ok())
		.and_then(|h| h.rsplit(',').next())
		.map(str::trim)
		.filter(|ip| !ip.is_empty());

	if let Some(ip) = forwarded {
		return ip.to_string();
	}

	req.extensions().get::<ConnectInfo<SocketAddr>>().map_or_else(
		|| "unknown".to_string(),
		|ConnectInfo(addr)| addr.ip().to_string(),
	)
}

/// Get the first four characters of the `pin` field of a JSON body
fn pin_prefix(body: &Bytes) -> String {
	serde_json::from_slice::<serde_json::Value>(body)
		.ok()
		.and_then(|v| v.get("pin")?.as_str().map(|p| p.chars().take(4).collect()))
		.unwrap_or_else(|| NO_PIN_PREFIX.to_string())
}
