//! Carrier address validation (XAV) wire format and verdict logic.
//!
//! With `maximumcandidatelistsize=1` the carrier normally returns
//! `Candidate` as a single object, but it may still send a list; both are
//! accepted and the first entry wins.

use crate::ValidationError;
use address_types::{Address, AddressClassification, CarrierFault, ValidationVerdict};
use serde::{Deserialize, Serialize};

/// Request envelope: `{"XAVRequest":{"AddressKeyFormat": ...}}`.
#[derive(Debug, Serialize)]
pub struct XavRequest<'a> {
	#[serde(rename = "XAVRequest")]
	pub request: AddressKeyFormat<'a>,
}

#[derive(Debug, Serialize)]
pub struct AddressKeyFormat<'a> {
	#[serde(rename = "AddressKeyFormat")]
	pub address: &'a Address,
}

impl<'a> XavRequest<'a> {
	pub fn new(address: &'a Address) -> Self {
		Self {
			request: AddressKeyFormat { address },
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct XavEnvelope {
	#[serde(rename = "XAVResponse", default)]
	pub response: Option<XavResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XavResponse {
	#[serde(default)]
	pub candidate: Option<OneOrMany<Candidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
	// Tried first: a derived struct also accepts a JSON array.
	Many(Vec<T>),
	One(T),
}

impl<T> OneOrMany<T> {
	fn first(&self) -> Option<&T> {
		match self {
			OneOrMany::One(item) => Some(item),
			OneOrMany::Many(items) => items.first(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Candidate {
	#[serde(default)]
	pub address_classification: Option<Classification>,
	#[serde(default)]
	pub address_key_format: Option<CandidateAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Classification {
	#[serde(default)]
	pub code: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

/// The parts of the candidate address the verdict depends on.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CandidateAddress {
	#[serde(default)]
	pub political_division2: Option<String>,
	#[serde(default)]
	pub postcode_primary_low: Option<String>,
	#[serde(default)]
	pub postcode_extended_low: Option<String>,
}

/// Compares the candidate with the submitted address.
///
/// A postal code or case-insensitive city mismatch yields an invalid verdict
/// that echoes what the carrier expected; otherwise the classification code
/// decides residential, commercial or unknown.
pub fn evaluate_candidate(
	request: &Address,
	candidate: &CandidateAddress,
	classification_code: Option<&str>,
) -> ValidationVerdict {
	let city = candidate.political_division2.as_deref().unwrap_or("").trim();
	let postcode = candidate.postcode_primary_low.as_deref().unwrap_or("").trim();

	let postcode_matches = postcode == request.postcode_primary_low.trim();
	let city_matches = city.to_uppercase() == request.city().trim().to_uppercase();

	if !postcode_matches || !city_matches {
		let mut expected = format!("{}, {}", city, postcode);
		if let Some(extended) = candidate
			.postcode_extended_low
			.as_deref()
			.map(str::trim)
			.filter(|e| !e.is_empty())
		{
			expected.push('-');
			expected.push_str(extended);
		}
		return ValidationVerdict::Invalid {
			error_message: format!(
				"Based on the address given City or Zip Code is incorrect. Expected: {}",
				expected
			),
		};
	}

	ValidationVerdict::Valid {
		classification: AddressClassification::from_code(classification_code),
	}
}

/// Interprets a successful response body.
pub fn interpret_response(
	request: &Address,
	body: &str,
) -> Result<ValidationVerdict, ValidationError> {
	let envelope: XavEnvelope = serde_json::from_str(body)
		.map_err(|e| ValidationError::InvalidResponse(format!("malformed JSON: {}", e)))?;

	let response = envelope.response.ok_or_else(|| {
		ValidationError::InvalidResponse(
			CarrierFault::summarize_body(body).unwrap_or_else(|| "missing XAVResponse".to_string()),
		)
	})?;

	let candidate = response
		.candidate
		.as_ref()
		.and_then(OneOrMany::first)
		.ok_or(ValidationError::NotFound)?;

	let address = candidate.address_key_format.as_ref().ok_or_else(|| {
		ValidationError::InvalidResponse("candidate has no AddressKeyFormat".to_string())
	})?;

	let classification = candidate.address_classification.as_ref();
	let code = classification.and_then(|c| c.code.as_deref());
	tracing::debug!(
		code = code.unwrap_or(""),
		description = classification
			.and_then(|c| c.description.as_deref())
			.unwrap_or(""),
		"Candidate classification"
	);

	Ok(evaluate_candidate(request, address, code))
}
