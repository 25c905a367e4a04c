//! Sales order fields read from the host record store.

use serde::{Deserialize, Serialize};

/// The subset of a sales order the validation workflow works with.
///
/// Only `address_status` is ever written back; everything else is read-only
/// from the workflow's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
	/// Host record identifier.
	pub id: String,
	/// Shipping country code (`shipcountry`).
	pub ship_country: String,
	/// Shipping state (`shipstate`).
	#[serde(default)]
	pub ship_state: String,
	/// Shipping postal code (`shipzip`).
	#[serde(default)]
	pub ship_zip: String,
	/// Shipping city.
	#[serde(default)]
	pub ship_city: String,
	/// Shipping street lines.
	#[serde(default)]
	pub ship_address_lines: Vec<String>,
	/// Set when someone has confirmed the address by hand.
	#[serde(default)]
	pub manually_verified: bool,
	/// The status text field, used both as output and as the re-entry guard.
	#[serde(default)]
	pub address_status: Option<String>,
}

impl SalesOrder {
	/// Returns true when the order ships to the given country.
	pub fn ships_to(&self, country_code: &str) -> bool {
		self.ship_country.trim() == country_code
	}
}
