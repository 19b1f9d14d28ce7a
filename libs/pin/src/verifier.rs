//! Salted hashing of PINs
//!
//! Only the hash, salt and last four digits of a PIN are ever stored.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use chrono::{DateTime, Utc};
use common::Error;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{PinSecret, generate_pin};

/// A freshly issued PIN together with its verification artifacts
///
/// The raw `pin` is handed to the caller exactly once and must not be
/// persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedPin {
	pub pin:  String,
	pub salt: String,
	pub hash: String,
}

impl IssuedPin {
	/// The lookup-narrowing suffix stored next to the hash
	#[must_use]
	pub fn last4(&self) -> &str { last4(&self.pin) }
}

impl std::fmt::Debug for IssuedPin {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IssuedPin")
			.field("last4", &self.last4())
			.finish_non_exhaustive()
	}
}

/// The last four characters of a PIN candidate, or all of them if shorter
#[must_use]
pub fn last4(pin: &str) -> &str {
	let start = pin
		.char_indices()
		.rev()
		.nth(3)
		.map_or(0, |(idx, _)| idx);

	&pin[start..]
}

/// Hex encoded SHA-256 of `pin` followed by `salt`
#[must_use]
pub fn salted_hash(pin: &str, salt: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(pin.as_bytes());
	hasher.update(salt.as_bytes());

	hex::encode(hasher.finalize())
}

/// Derive the PIN of a reservation and hash it with a fresh random salt
///
/// # Errors
/// Errors if the secret is rejected as an HMAC key
pub fn generate_for_reservation(
	id: i64,
	scheduled_at: DateTime<Utc>,
	secret: &PinSecret,
) -> Result<IssuedPin, Error> {
	let pin = generate_pin(id, scheduled_at, secret)?;
	let salt = SaltString::generate(&mut OsRng).as_str().to_string();
	let hash = salted_hash(&pin, &salt);

	Ok(IssuedPin { pin, salt, hash })
}

/// Check a candidate PIN against a stored hash and salt in constant time
#[must_use]
pub fn verify(candidate: &str, stored_hash: &str, stored_salt: &str) -> bool {
	let computed = salted_hash(candidate, stored_salt);

	computed.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}
