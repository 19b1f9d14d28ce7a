//! Deterministic, checksum-protected PIN derivation
//!
//! A PIN is 9 decimal digits: an 8-digit base taken from an HMAC over the
//! reservation identity and its scheduled time, followed by a Luhn check
//! digit over that base.

use chrono::{DateTime, SecondsFormat, Utc};
use common::Error;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::PinSecret;

type HmacSha256 = Hmac<Sha256>;

/// Number of digits in a full PIN
pub const PIN_LENGTH: usize = 9;

/// Number of digits in the derived base, the check digit makes up the rest
pub const BASE_LENGTH: usize = PIN_LENGTH - 1;

/// Amount of leading digest bytes interpreted as the base integer
const DIGEST_PREFIX_BYTES: usize = 5;

const BASE_MODULUS: u64 = 100_000_000;

/// The exact message the base is derived from
fn derivation_payload(id: i64, scheduled_at: DateTime<Utc>) -> String {
	format!(
		"{id}|{}",
		scheduled_at.to_rfc3339_opts(SecondsFormat::Millis, true)
	)
}

/// Derive the 8-digit base of a PIN
///
/// # Errors
/// Errors if the secret is rejected as an HMAC key
pub fn derive_base(
	id: i64,
	scheduled_at: DateTime<Utc>,
	secret: &PinSecret,
) -> Result<String, Error> {
	let mut mac = HmacSha256::new_from_slice(secret.expose().as_bytes())?;
	mac.update(derivation_payload(id, scheduled_at).as_bytes());
	let digest = mac.finalize().into_bytes();

	let prefix = digest[..DIGEST_PREFIX_BYTES]
		.iter()
		.fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));

	Ok(format!("{:0width$}", prefix % BASE_MODULUS, width = BASE_LENGTH))
}

/// Compute the Luhn check digit that has to be appended to `digits`
///
/// Positions are counted from the rightmost digit of the finished number,
/// which is the check digit itself, so the rightmost digit of `digits` is
/// doubled. Returns [`None`] if `digits` contains anything but ASCII digits.
#[must_use]
pub fn luhn_check_digit(digits: &str) -> Option<u8> {
	let sum = luhn_sum(digits, true)?;

	Some(((10 - sum % 10) % 10) as u8)
}

/// Check whether `pin` carries a valid trailing Luhn check digit
#[must_use]
pub fn has_valid_checksum(pin: &str) -> bool {
	pin.len() >= 2 && luhn_sum(pin, false).is_some_and(|sum| sum % 10 == 0)
}

/// Sum digits right to left, doubling every other one
fn luhn_sum(digits: &str, double_first: bool) -> Option<u32> {
	let mut sum = 0;
	let mut double = double_first;

	for c in digits.chars().rev() {
		let mut digit = c.to_digit(10)?;

		if double {
			digit *= 2;
			if digit > 9 {
				digit -= 9;
			}
		}

		sum += digit;
		double = !double;
	}

	Some(sum)
}

/// Generate the full 9-digit PIN of a reservation
///
/// The same `(id, scheduled_at, secret)` always produces the same PIN.
///
/// # Errors
/// Errors if the secret is rejected as an HMAC key
pub fn generate_pin(
	id: i64,
	scheduled_at: DateTime<Utc>,
	secret: &PinSecret,
) -> Result<String, Error> {
	let mut pin = derive_base(id, scheduled_at, secret)?;

	// The base is always made of ASCII digits
	let check = luhn_check_digit(&pin).unwrap_or_default();
	pin.push(char::from(b'0' + check));

	Ok(pin)
}
