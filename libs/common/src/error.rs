//! Library-wide error types and [`From`] impls

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Top level application error, can be converted into a [`Response`]
#[derive(Debug, Error)]
pub enum Error {
	/// Malformed or out-of-range input
	#[error("{0}")]
	Validation(String),
	/// An empty PIN was submitted for confirmation
	#[error("PIN required")]
	PinRequired,
	/// No reservation matches the submitted PIN
	#[error("invalid PIN")]
	InvalidPin,
	/// The PIN only becomes valid at the contained time
	#[error("PIN not active yet")]
	NotActiveYet(DateTime<Utc>),
	/// The PIN stopped being valid at the contained time
	#[error("PIN expired")]
	Expired(DateTime<Utc>),
	/// Resource not found
	#[error("not found - {0}")]
	NotFound(String),
	/// Too many attempts from the same bucket, retry after the given amount
	/// of seconds
	#[error("too many requests, please try again later")]
	TooManyRequests(u64),
	/// Opaque storage or internal failure
	#[error("internal server error")]
	InternalServerError,
}

impl Error {
	/// Return the stable, machine readable code of this error
	///
	/// These codes are part of the public API and must never be renamed
	#[must_use]
	pub fn code(&self) -> &'static str {
		match self {
			Self::Validation(_) => "VALIDATION",
			Self::PinRequired => "PIN_REQUIRED",
			Self::InvalidPin => "INVALID_PIN",
			Self::NotActiveYet(_) => "NOT_ACTIVE_YET",
			Self::Expired(_) => "EXPIRED",
			Self::NotFound(_) => "NOT_FOUND",
			Self::TooManyRequests(_) => "RATE_LIMITED",
			Self::InternalServerError => "DB_ERROR",
		}
	}

	/// The HTTP status class of this error
	#[must_use]
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(_)
			| Self::PinRequired
			| Self::InvalidPin
			| Self::NotActiveYet(_) => StatusCode::BAD_REQUEST,
			Self::Expired(_) => StatusCode::GONE,
			Self::NotFound(_) => StatusCode::NOT_FOUND,
			Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
			Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

/// Convert an error into a [`Response`]
impl IntoResponse for Error {
	fn into_response(self) -> Response {
		debug!("{self:?}");

		let message = self.to_string();
		let mut data = serde_json::json!({
			"ok": false,
			"code": self.code(),
			"message": message,
			"error": message,
		});

		match self {
			Self::NotActiveYet(at) => {
				data["activatesAt"] = serde_json::json!(at);
			},
			Self::Expired(at) => {
				data["expiredAt"] = serde_json::json!(at);
			},
			_ => {},
		}

		let mut response = (self.status(), axum::Json(data)).into_response();

		if let Self::TooManyRequests(seconds) = self {
			response
				.headers_mut()
				.insert(RETRY_AFTER, HeaderValue::from(seconds));
		}

		response
	}
}

/// A list of possible internal errors
///
/// API end users should never see these details
#[derive(Debug, Error)]
pub enum InternalServerError {
	/// A row violated an invariant the schema is supposed to enforce
	#[error("constraint error -- {0:?}")]
	ConstraintError(String),
	/// Error executing some database operation
	#[error("database error -- {0:?}")]
	DatabaseError(diesel::result::Error),
	/// Error interacting with a database connection
	#[error("database interaction error -- {0:?}")]
	DatabaseInteractionError(deadpool_diesel::InteractError),
	/// Error acquiring database pool connection
	#[error("database pool error -- {0:?}")]
	PoolError(deadpool_diesel::PoolError),
	/// The PIN derivation key was rejected by the MAC
	#[error("invalid PIN secret -- {0:?}")]
	InvalidSecret(hmac::digest::InvalidLength),
}

// Map internal server errors to application errors
impl From<InternalServerError> for Error {
	fn from(value: InternalServerError) -> Self {
		error!("internal server error -- {value}");

		Self::InternalServerError
	}
}

/// Map validation errors to application errors
impl From<validator::ValidationErrors> for Error {
	fn from(err: validator::ValidationErrors) -> Self {
		let errs = err.field_errors();
		let mut repr = errs
			.values()
			.map(|v| {
				v.iter()
					.map(ToString::to_string)
					.collect::<Vec<String>>()
					.join("\n")
			})
			.collect::<Vec<String>>();

		repr.sort();

		Self::Validation(repr.join("\n"))
	}
}

impl From<JsonRejection> for Error {
	fn from(rejection: JsonRejection) -> Self {
		Self::Validation(rejection.body_text())
	}
}

impl From<QueryRejection> for Error {
	fn from(rejection: QueryRejection) -> Self {
		Self::Validation(rejection.body_text())
	}
}

/// Map database interaction errors to application errors
impl From<deadpool_diesel::InteractError> for Error {
	fn from(value: deadpool_diesel::InteractError) -> Self {
		InternalServerError::DatabaseInteractionError(value).into()
	}
}

/// Map database result errors to application errors
impl From<diesel::result::Error> for Error {
	fn from(err: diesel::result::Error) -> Self {
		match err {
			// No rows returned by query that expected at least one
			diesel::result::Error::NotFound => {
				Self::NotFound("no context provided".to_string())
			},
			_ => InternalServerError::DatabaseError(err).into(),
		}
	}
}

impl From<deadpool_diesel::PoolError> for Error {
	fn from(value: deadpool_diesel::PoolError) -> Self {
		InternalServerError::PoolError(value).into()
	}
}

impl From<hmac::digest::InvalidLength> for Error {
	fn from(value: hmac::digest::InvalidLength) -> Self {
		InternalServerError::InvalidSecret(value).into()
	}
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;

	use super::*;

	#[test]
	fn status_classes_follow_the_error_taxonomy() {
		let at = Utc.with_ymd_and_hms(2030, 1, 1, 10, 0, 0).unwrap();

		assert_eq!(
			Error::Validation(String::new()).status(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(Error::PinRequired.status(), StatusCode::BAD_REQUEST);
		assert_eq!(Error::InvalidPin.status(), StatusCode::BAD_REQUEST);
		assert_eq!(Error::NotActiveYet(at).status(), StatusCode::BAD_REQUEST);
		assert_eq!(Error::Expired(at).status(), StatusCode::GONE);
		assert_eq!(
			Error::InternalServerError.status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[test]
	fn storage_failures_are_opaque() {
		let err: Error = diesel::result::Error::RollbackTransaction.into();

		assert_eq!(err.code(), "DB_ERROR");
		assert_eq!(err.to_string(), "internal server error");
	}

	#[test]
	fn missing_rows_are_not_found() {
		let err: Error = diesel::result::Error::NotFound.into();

		assert!(matches!(err, Error::NotFound(_)));
	}
}
