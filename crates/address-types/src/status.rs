//! Status field vocabulary.
//!
//! The strings produced here are matched verbatim on re-entry to decide
//! whether an order is already settled, so they must not change.

use serde::{Deserialize, Serialize};
use std::fmt;

const VERIFIED: &str = "Verified Address";
const OUTSIDE_US: &str = "Addresses out of the US are not validated";
const VERIFIED_MANUALLY: &str = "Address verified manually";
const NOT_FOUND: &str = "Given Address was not found on UPS database.";
const INVALID_PREFIX: &str = "Invalid address: ";
const ERROR_PREFIX: &str = "ERROR ON THE ADDRESS VERIFICATION: ";

/// A value of the order's address status field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AddressStatus {
	/// The carrier confirmed the address.
	Verified,
	/// Shipping country is not the US.
	OutsideUs,
	/// The manual verification flag is set.
	VerifiedManually,
	/// The carrier candidate disagrees with the order.
	Invalid(String),
	/// The carrier returned no candidate.
	NotFound,
	/// Anything else went wrong.
	Error(String),
}

impl AddressStatus {
	/// Returns the exact text written into the status field.
	pub fn to_field_value(&self) -> String {
		match self {
			Self::Verified => VERIFIED.to_string(),
			Self::OutsideUs => OUTSIDE_US.to_string(),
			Self::VerifiedManually => VERIFIED_MANUALLY.to_string(),
			Self::Invalid(message) => format!("{}{}", INVALID_PREFIX, message),
			Self::NotFound => NOT_FOUND.to_string(),
			Self::Error(details) => format!("{}{}", ERROR_PREFIX, details),
		}
	}

	/// Returns true when a stored field value means the order needs no further work.
	pub fn is_settled(field_value: &str) -> bool {
		matches!(field_value, VERIFIED | OUTSIDE_US | VERIFIED_MANUALLY)
	}
}

impl fmt::Display for AddressStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_field_value())
	}
}
