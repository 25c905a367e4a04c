//! Carrier address format.
//!
//! `Address` serializes to the carrier's `AddressKeyFormat` object. It is
//! always built from a [`SalesOrder`] so that postal code normalization
//! happens before any request is constructed.

use crate::SalesOrder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Country code for which validation is performed.
pub const US_COUNTRY_CODE: &str = "US";

/// Five ASCII digits, optionally followed by four more with or without a hyphen.
const POSTAL_CODE_PATTERN: &str = r"^([0-9]{5})(?:-?([0-9]{4}))?$";

/// Errors that can occur while building a carrier address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
	/// The order's postal code cannot yield a 5 character primary code.
	#[error("Invalid postal code '{0}'")]
	InvalidPostalCode(String),
}

/// Address in the carrier's `AddressKeyFormat` layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
	/// Street lines, in order.
	pub address_line: Vec<String>,
	/// `<city>,<state>,<zip5>`.
	pub region: String,
	/// City.
	pub political_division2: String,
	/// State or region code.
	pub political_division1: String,
	/// Five digit postal code.
	pub postcode_primary_low: String,
	/// Trailing four digits of a ZIP+4 code.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub postcode_extended_low: Option<String>,
	/// ISO country code.
	pub country_code: String,
}

impl Address {
	/// Builds the request address from the order's shipping fields.
	///
	/// A five digit postal code is used verbatim. A ZIP+4 code, written as
	/// `123456789` or `12345-6789`, is split into its primary and extended
	/// parts. Any other form is rejected.
	pub fn from_order(order: &SalesOrder) -> Result<Self, AddressError> {
		let zip = order.ship_zip.trim();
		let (primary, extended) = split_postal_code(zip)?;

		let address_line = order
			.ship_address_lines
			.iter()
			.map(|line| line.trim())
			.filter(|line| !line.is_empty())
			.map(str::to_string)
			.collect();

		Ok(Self {
			address_line,
			region: format!("{},{},{}", order.ship_city, order.ship_state, primary),
			political_division2: order.ship_city.clone(),
			political_division1: order.ship_state.clone(),
			postcode_primary_low: primary,
			postcode_extended_low: extended,
			country_code: order.ship_country.clone(),
		})
	}

	/// Returns the city used for candidate comparison.
	pub fn city(&self) -> &str {
		&self.political_division2
	}
}

/// Splits a postal code into its primary and optional extended parts.
///
/// Accepts `12345`, `123456789` and `12345-6789` only.
fn split_postal_code(zip: &str) -> Result<(String, Option<String>), AddressError> {
	let invalid = || AddressError::InvalidPostalCode(zip.to_string());

	let re = Regex::new(POSTAL_CODE_PATTERN).map_err(|_| invalid())?;
	let caps = re.captures(zip).ok_or_else(invalid)?;

	let primary = caps.get(1).ok_or_else(invalid)?.as_str().to_string();
	let extended = caps.get(2).map(|m| m.as_str().to_string());
	Ok((primary, extended))
}
