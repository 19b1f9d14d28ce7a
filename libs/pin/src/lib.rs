//! PIN derivation and salted verification

use std::fmt;
use std::sync::Arc;

pub mod codec;
pub mod verifier;

pub use codec::{
	BASE_LENGTH,
	PIN_LENGTH,
	derive_base,
	generate_pin,
	has_valid_checksum,
	luhn_check_digit,
};
pub use verifier::{
	IssuedPin,
	generate_for_reservation,
	last4,
	salted_hash,
	verify,
};

/// Process-wide secret every PIN is derived from
///
/// Rotating it invalidates every outstanding PIN.
#[derive(Clone)]
pub struct PinSecret(Arc<str>);

impl PinSecret {
	#[must_use]
	pub fn new(secret: impl AsRef<str>) -> Self { Self(secret.as_ref().into()) }

	pub(crate) fn expose(&self) -> &str { &self.0 }
}

impl fmt::Debug for PinSecret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("PinSecret(<redacted>)")
	}
}
